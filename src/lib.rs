//! REST proxy forwarding CRUD requests to MongoDB.
//!
//! Each POST body names the connection string, database and collection to
//! use. The proxy opens a client per request, runs one driver operation,
//! shuts the client down and answers with JSON.

pub mod config;
pub mod convert;
pub mod db;
pub mod error;
pub mod handler;
pub mod logger;
pub mod net;
pub mod request;
pub mod response;
pub mod samples;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::trace::TraceLayer;

pub use config::{ConnectSettings, ProxyConfig};
pub use error::ProxyError;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub connect: Arc<ConnectSettings>,
}

impl AppState {
    pub fn new(connect: ConnectSettings) -> Self {
        Self {
            connect: Arc::new(connect),
        }
    }
}

pub fn router(config: &ProxyConfig) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/ping", get(samples::ping).post(handler::ping))
        .route("/find", get(samples::find).post(handler::find))
        .route("/insert", get(samples::insert).post(handler::insert))
        .route(
            "/insertTimeSeries",
            get(samples::insert_time_series).post(handler::insert_time_series),
        )
        .route("/update", get(samples::update).post(handler::update))
        .route("/delete", get(samples::delete).post(handler::delete))
        .with_state(AppState::new(config.connect_settings()))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.body_limit))
}
