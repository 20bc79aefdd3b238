use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn devices() -> Router<AppState> {
    Router::new().route("/devices/register", post(handlers::register_device))
}

pub fn notifications() -> Router<AppState> {
    Router::new().route("/notifications/send", post(handlers::send_notification))
}
