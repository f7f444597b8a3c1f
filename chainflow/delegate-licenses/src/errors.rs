use thiserror::Error;

#[derive(Debug, Error)]
pub enum DelegationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("wrong network: {0}")]
    WrongNetwork(String),

    #[error("connected wallet {connected} does not own these licenses (expected {expected})")]
    WrongWallet { expected: String, connected: String },

    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    #[error("onchain integration error: {0}")]
    Onchain(String),
}
