use std::convert::Infallible;
use std::path::PathBuf;
use log::warn;
use serde::Serialize;
use serde_json::json;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::RealtimeError;
use crate::models::{JoinChallenge, NewChallenge, NewComment, NewPost};
use crate::server::Server;

/// Everything the binary serves: socket, REST, health, then static files.
pub fn routes(
    server: Server,
    static_dir: PathBuf,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    endpoints(server)
        .or(warp::fs::dir(static_dir))
        .with(warp::cors().allow_any_origin())
        .with(warp::log("fitlink_realtime::http"))
        .recover(handle_rejection)
}

pub fn endpoints(server: Server) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let ws = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_server(server.clone()))
        .map(|ws: warp::ws::Ws, server: Server| {
            ws.on_upgrade(move |socket| async move {
                server.handle_connection(socket).await;
            })
        });

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_server(server.clone()))
        .and_then(health_check);

    ws.or(health).or(posts(server.clone())).or(challenges(server))
}

fn posts(server: Server) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("api" / "posts")
        .and(warp::get())
        .and(with_server(server.clone()))
        .and_then(list_posts);

    let create = warp::path!("api" / "posts")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_server(server.clone()))
        .and_then(create_post);

    let like = warp::path!("api" / "posts" / String / "like")
        .and(warp::post())
        .and(with_server(server.clone()))
        .and_then(like_post);

    let comment = warp::path!("api" / "posts" / String / "comments")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_server(server))
        .and_then(add_comment);

    list.or(create).or(like).or(comment)
}

fn challenges(server: Server) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("api" / "challenges")
        .and(warp::get())
        .and(with_server(server.clone()))
        .and_then(list_challenges);

    let create = warp::path!("api" / "challenges")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_server(server.clone()))
        .and_then(create_challenge);

    let join = warp::path!("api" / "challenges" / String / "join")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_server(server))
        .and_then(join_challenge);

    list.or(create).or(join)
}

fn with_server(server: Server) -> impl Filter<Extract = (Server,), Error = Infallible> + Clone {
    warp::any().map(move || server.clone())
}

async fn health_check(server: Server) -> Result<Response, Infallible> {
    let sessions = server.router().sessions().len().await;
    Ok(warp::reply::json(&json!({ "status": "ok", "sessions": sessions })).into_response())
}

async fn list_posts(server: Server) -> Result<Response, Infallible> {
    Ok(warp::reply::json(&server.router().posts().await).into_response())
}

async fn create_post(body: NewPost, server: Server) -> Result<Response, Infallible> {
    Ok(respond(server.router().create_post(body).await, StatusCode::CREATED))
}

async fn like_post(post_id: String, server: Server) -> Result<Response, Infallible> {
    Ok(respond(server.router().like_post(&post_id).await, StatusCode::OK))
}

async fn add_comment(post_id: String, body: NewComment, server: Server) -> Result<Response, Infallible> {
    Ok(respond(server.router().add_comment(&post_id, body).await, StatusCode::CREATED))
}

async fn list_challenges(server: Server) -> Result<Response, Infallible> {
    Ok(warp::reply::json(&server.router().challenges().await).into_response())
}

async fn create_challenge(body: NewChallenge, server: Server) -> Result<Response, Infallible> {
    Ok(respond(server.router().create_challenge(body).await, StatusCode::CREATED))
}

async fn join_challenge(challenge_id: String, body: JoinChallenge, server: Server) -> Result<Response, Infallible> {
    Ok(respond(server.router().join_challenge(&challenge_id, body).await, StatusCode::OK))
}

fn respond<T: Serialize>(result: Result<T, RealtimeError>, status: StatusCode) -> Response {
    match result {
        Ok(value) => warp::reply::with_status(warp::reply::json(&value), status).into_response(),
        Err(e) => error_reply(e.status(), e.kind(), &e.to_string()),
    }
}

fn error_reply(status: StatusCode, kind: &str, message: &str) -> Response {
    let body = warp::reply::json(&json!({ "error": kind, "message": message }));
    warp::reply::with_status(body, status).into_response()
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let reply = if err.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "not_found", "no such route")
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        error_reply(StatusCode::BAD_REQUEST, "validation_error", &e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", "method not allowed")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        error_reply(StatusCode::UNSUPPORTED_MEDIA_TYPE, "validation_error", "expected a JSON body")
    } else if let Some(e) = err.find::<warp::reject::MissingHeader>() {
        error_reply(StatusCode::BAD_REQUEST, "validation_error", &e.to_string())
    } else {
        warn!("Unhandled rejection: {err:?}");
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
    };
    Ok(reply)
}
