use std::sync::Arc;

use axum::{Router, response::Json as ResponseJson, routing::get};
use db::DBService;
use secrecy::ExposeSecret;
use tower_http::trace::TraceLayer;
use utils::response::ApiResponse;

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use auth::SessionVerifier;
use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub sessions: Arc<SessionVerifier>,
}

impl AppState {
    pub fn new(db: DBService, config: &ServerConfig) -> Self {
        Self::with_secret(db, config.jwt_secret.expose_secret().as_bytes())
    }

    pub fn with_secret(db: DBService, secret: &[u8]) -> Self {
        Self {
            db,
            sessions: Arc::new(SessionVerifier::new(secret)),
        }
    }
}

async fn health() -> ResponseJson<ApiResponse<&'static str>> {
    ResponseJson(ApiResponse::success("ok"))
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .merge(routes::connectors::router(&state))
        .merge(routes::admin::router(&state));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
