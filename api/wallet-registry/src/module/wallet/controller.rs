use super::crud;
use super::error::AppError;
use super::schema::{
    CreateWalletRequest, ErrorBody, HealthResponse, InitDbResponse, UpdateWalletRequest,
};
use crate::app::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, info};

pub async fn list_wallets(State(state): State<AppState>) -> Response {
    match crud::list_wallets(&state).await {
        Ok(wallets) => (StatusCode::OK, Json(wallets)).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn get_wallet(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Response {
    match crud::get_wallet(&state, &address).await {
        Ok(wallet) => (StatusCode::OK, Json(wallet)).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn create_wallet(
    State(state): State<AppState>,
    Json(req): Json<CreateWalletRequest>,
) -> Response {
    match crud::create_wallet(&state, req).await {
        Ok(wallet) => {
            info!(address = %wallet.address, label = %wallet.label, "wallet registered");
            (StatusCode::OK, Json(wallet)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn update_wallet(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(req): Json<UpdateWalletRequest>,
) -> Response {
    match crud::update_wallet(&state, &address, req).await {
        Ok(wallet) => {
            info!(address = %wallet.address, "wallet updated");
            (StatusCode::OK, Json(wallet)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn init_db(State(state): State<AppState>) -> Response {
    match crud::init_db(&state).await {
        Ok(()) => (
            StatusCode::OK,
            Json(InitDbResponse {
                message: "database initialized successfully".to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn health(State(state): State<AppState>) -> Response {
    match crud::wallet_count(&state).await {
        Ok(wallet_count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                wallet_count,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: AppError) -> Response {
    if err.status.is_server_error() {
        error!(code = %err.code, message = %err.message, "wallet request failed");
    } else {
        info!(code = %err.code, message = %err.message, "wallet request rejected");
    }
    (
        err.status,
        Json(ErrorBody {
            error_code: err.code.to_string(),
            message: err.message,
        }),
    )
        .into_response()
}
