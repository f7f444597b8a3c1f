use crate::errors::WorkflowError;
use crate::models::{DeployStep, WalletSummary, WorkflowState};
use delegate_licenses::models::DelegationResult;
use license_inventory::models::LicenseToken;
use std::collections::HashSet;
use tracing::{debug, info};

/// Steps only move along edges this table allows; forward edges carry
/// their own preconditions in the operations below.
pub fn is_valid_transition(from: DeployStep, to: DeployStep) -> bool {
    use DeployStep::*;
    matches!(
        (from, to),
        (ChoosingWallet, ChoosingLicenses)
            | (ChoosingLicenses, Delegating)
            | (Delegating, Complete)
            | (Delegating, ChoosingLicenses)
            | (ChoosingLicenses, ChoosingWallet)
    )
}

#[derive(Debug, Default)]
pub struct DeployWorkflow {
    state: WorkflowState,
}

impl DeployWorkflow {
    pub fn new(state: WorkflowState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn into_state(self) -> WorkflowState {
        self.state
    }

    pub fn current_step(&self) -> DeployStep {
        self.state.current_step
    }

    pub fn connect(&mut self, address: &str) {
        self.state.connected_address = Some(address.trim().to_lowercase());
    }

    /// Losing the wallet connection forces a full reset.
    pub fn disconnect(&mut self) {
        info!("wallet disconnected, resetting workflow");
        self.state = WorkflowState::default();
    }

    /// Selecting a wallet advances 0 -> 1; selecting a *different*
    /// wallet at any step clears the license selection and returns to
    /// step 1. Deselecting resets to step 0.
    pub fn select_wallet(&mut self, wallet: Option<WalletSummary>) -> Result<(), WorkflowError> {
        self.refuse_mid_delegation()?;
        match wallet {
            None => {
                let connected = self.state.connected_address.clone();
                self.state = WorkflowState {
                    connected_address: connected,
                    ..WorkflowState::default()
                };
            }
            Some(wallet) => {
                let same = self
                    .state
                    .selected_wallet
                    .as_ref()
                    .is_some_and(|w| w.address.eq_ignore_ascii_case(&wallet.address));
                if same {
                    return Ok(());
                }
                debug!(address = %wallet.address, "wallet selected");
                self.state.selected_wallet = Some(WalletSummary {
                    address: wallet.address.to_lowercase(),
                    label: wallet.label,
                });
                self.state.selected_licenses.clear();
                self.state.current_step = DeployStep::ChoosingLicenses;
            }
        }
        Ok(())
    }

    /// The selection must stay a subset of the inventory fetched for the
    /// selected wallet. A non-empty selection advances 1 -> 2; emptying
    /// the selection at step 2 falls back to step 1.
    pub fn select_licenses(
        &mut self,
        token_ids: &[String],
        inventory: &[LicenseToken],
    ) -> Result<(), WorkflowError> {
        self.refuse_mid_delegation()?;
        if self.state.selected_wallet.is_none() {
            return Err(WorkflowError::NoWalletSelected);
        }

        let known: HashSet<&str> = inventory.iter().map(|t| t.token_id.as_str()).collect();
        for token_id in token_ids {
            if !known.contains(token_id.as_str()) {
                return Err(WorkflowError::SelectionNotInInventory(token_id.clone()));
            }
        }

        self.state.selected_licenses = token_ids.to_vec();
        match self.state.current_step {
            DeployStep::ChoosingLicenses if !token_ids.is_empty() => {
                self.advance(DeployStep::Delegating)?;
            }
            DeployStep::Delegating if token_ids.is_empty() => {
                self.advance(DeployStep::ChoosingLicenses)?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn begin_delegation(&mut self) -> Result<(), WorkflowError> {
        if self.state.current_step != DeployStep::Delegating {
            return Err(WorkflowError::InvalidTransition {
                from: self.state.current_step.as_index(),
                to: DeployStep::Delegating.as_index(),
            });
        }
        if self.state.selected_licenses.is_empty() {
            return Err(WorkflowError::EmptySelection);
        }
        self.state.delegating = true;
        Ok(())
    }

    /// Completes 2 -> 3 once every selected token has an outcome,
    /// success or failure.
    pub fn finish_delegation(
        &mut self,
        results: &[DelegationResult],
    ) -> Result<(), WorkflowError> {
        if !self.state.delegating {
            return Err(WorkflowError::InvalidTransition {
                from: self.state.current_step.as_index(),
                to: DeployStep::Complete.as_index(),
            });
        }
        let resolved: HashSet<&str> = results.iter().map(|r| r.token_id.as_str()).collect();
        for token_id in &self.state.selected_licenses {
            if !resolved.contains(token_id.as_str()) {
                return Err(WorkflowError::IncompleteResults);
            }
        }
        self.state.delegating = false;
        self.advance(DeployStep::Complete)?;
        info!(results = results.len(), "delegation run complete");
        Ok(())
    }

    /// Explicit "back" navigation; refused mid-delegation.
    pub fn step_back(&mut self) -> Result<(), WorkflowError> {
        self.refuse_mid_delegation()?;
        let target = match self.state.current_step {
            DeployStep::ChoosingLicenses => DeployStep::ChoosingWallet,
            DeployStep::Delegating => DeployStep::ChoosingLicenses,
            step => {
                return Err(WorkflowError::InvalidTransition {
                    from: step.as_index(),
                    to: step.as_index(),
                });
            }
        };
        self.advance(target)
    }

    fn advance(&mut self, to: DeployStep) -> Result<(), WorkflowError> {
        if !is_valid_transition(self.state.current_step, to) {
            return Err(WorkflowError::InvalidTransition {
                from: self.state.current_step.as_index(),
                to: to.as_index(),
            });
        }
        self.state.current_step = to;
        Ok(())
    }

    fn refuse_mid_delegation(&self) -> Result<(), WorkflowError> {
        if self.state.delegating {
            return Err(WorkflowError::MidDelegation);
        }
        Ok(())
    }
}
