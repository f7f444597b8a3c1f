use crate::config::environment::AppConfig;
use crate::infra::InfraClients;
use crate::module::wallet::crud::WalletStore;
use crate::module::wallet::route::register_routes;
use axum::Router;
use axum::http::{HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<WalletStore>,
    pub infra: Option<InfraClients>,
}

impl AppState {
    pub fn new(config: AppConfig, infra: Option<InfraClients>) -> Self {
        Self {
            config,
            store: Arc::new(WalletStore::default()),
            infra,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut origins: Vec<HeaderValue> = Vec::new();
    for origin in &state.config.cors_allowed_origins {
        match origin.parse::<HeaderValue>() {
            Ok(v) => origins.push(v),
            Err(e) => warn!(origin = %origin, error = %e, "skipping invalid cors origin"),
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    register_routes(state).layer(cors)
}
