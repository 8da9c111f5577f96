use std::sync::Arc;
use clap::Parser;
use log::{info, warn};

use fitlink_realtime::config::Config;
use fitlink_realtime::routes::routes;
use fitlink_realtime::server::Server;
use fitlink_realtime::store::InMemoryStore;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let server = Server::new(Arc::new(InMemoryStore::new()));
    let routes = routes(server, config.static_dir.clone());
    let addr = config.addr();

    match config.tls_paths() {
        Some((cert, key)) => {
            info!("Starting secure server (HTTPS/WSS) on {addr}");
            warp::serve(routes).tls().cert_path(cert).key_path(key).run(addr).await;
        }
        None => {
            if config.tls_cert.is_some() {
                warn!("TLS certificate or key not found, falling back to HTTP/WS");
            }
            info!("Starting server (HTTP/WS) on {addr}");
            warp::serve(routes).run(addr).await;
        }
    }
}
