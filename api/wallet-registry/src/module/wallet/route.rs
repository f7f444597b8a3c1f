use super::controller;
use crate::app::AppState;
use axum::Router;
use axum::routing::{get, post};

pub fn register_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/wallets",
            get(controller::list_wallets).post(controller::create_wallet),
        )
        .route("/wallets/health", get(controller::health))
        .route(
            "/wallets/:address",
            get(controller::get_wallet).put(controller::update_wallet),
        )
        .route("/init-db", post(controller::init_db))
        .with_state(state)
}
