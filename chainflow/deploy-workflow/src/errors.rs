use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid transition from step {from} to step {to}")]
    InvalidTransition { from: u8, to: u8 },

    #[error("no wallet selected")]
    NoWalletSelected,

    #[error("no licenses selected")]
    EmptySelection,

    #[error("selected license {0} is not in the fetched inventory")]
    SelectionNotInInventory(String),

    #[error("delegation in progress, transition refused")]
    MidDelegation,

    #[error("not every selected license has a delegation result")]
    IncompleteResults,

    #[error("state storage error: {0}")]
    Storage(String),
}
