use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "fitlink-realtime", about = "Realtime broadcast server for community posts and challenges")]
pub struct Config {
    /// Address to bind, e.g. 0.0.0.0
    #[arg(long, env = "FITLINK_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "FITLINK_PORT", default_value_t = 2052)]
    pub port: u16,

    /// Directory served for every path not handled by the API
    #[arg(long, env = "FITLINK_STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    #[arg(long, env = "FITLINK_TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    #[arg(long, env = "FITLINK_TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Certificate and key paths, when both are configured and present on disk.
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) if cert.is_file() && key.is_file() => Some((cert.clone(), key.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["fitlink-realtime"]);
        assert_eq!(config.addr(), "0.0.0.0:2052".parse().unwrap());
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert!(config.tls_paths().is_none());
    }

    #[test]
    fn tls_needs_both_paths() {
        assert!(Config::try_parse_from(["fitlink-realtime", "--tls-cert", "cert.pem"]).is_err());
        let config = Config::parse_from([
            "fitlink-realtime",
            "--tls-cert",
            "/nonexistent/cert.pem",
            "--tls-key",
            "/nonexistent/key.pem",
        ]);
        assert!(config.tls_paths().is_none());
    }
}
