use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("token count query failed: {0}")]
    CountQuery(String),

    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    #[error("onchain integration error: {0}")]
    Onchain(String),
}
