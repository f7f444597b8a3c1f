use serde::{Deserialize, Serialize};

/// The four wizard stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStep {
    ChoosingWallet,
    ChoosingLicenses,
    Delegating,
    Complete,
}

impl DeployStep {
    pub fn as_index(&self) -> u8 {
        match self {
            Self::ChoosingWallet => 0,
            Self::ChoosingLicenses => 1,
            Self::Delegating => 2,
            Self::Complete => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub address: String,
    pub label: String,
}

/// The persisted wizard state; survives reloads via `WorkflowStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub selected_wallet: Option<WalletSummary>,
    pub selected_licenses: Vec<String>,
    pub current_step: DeployStep,
    pub connected_address: Option<String>,
    pub delegating: bool,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            selected_wallet: None,
            selected_licenses: Vec::new(),
            current_step: DeployStep::ChoosingWallet,
            connected_address: None,
            delegating: false,
        }
    }
}
