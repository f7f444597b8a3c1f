use crate::errors::WorkflowError;
use crate::models::{DeployStep, WorkflowState};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// File-backed persistence for the wizard state, the reload-continuity
/// analogue of the browser's local storage.
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    path: PathBuf,
}

impl WorkflowStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save(&self, state: &WorkflowState) -> Result<(), WorkflowError> {
        let payload = serde_json::to_string_pretty(state)
            .map_err(|e| WorkflowError::Storage(format!("failed encoding state: {e}")))?;
        fs::write(&self.path, payload)
            .map_err(|e| WorkflowError::Storage(format!("failed writing state file: {e}")))
    }

    pub fn load(&self) -> Result<Option<WorkflowState>, WorkflowError> {
        let payload = match fs::read_to_string(&self.path) {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WorkflowError::Storage(format!(
                    "failed reading state file: {e}"
                )));
            }
        };
        let state = serde_json::from_str::<WorkflowState>(&payload)
            .map_err(|e| WorkflowError::Storage(format!("failed decoding state: {e}")))?;
        Ok(Some(state))
    }

    pub fn clear(&self) -> Result<(), WorkflowError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WorkflowError::Storage(format!(
                "failed clearing state file: {e}"
            ))),
        }
    }

    /// Restores persisted state only when the persisted wallet still
    /// matches the currently connected address; anything stale is
    /// discarded rather than trusted. A persisted `Complete` step is a
    /// finished run, so it restores as a fresh wizard.
    pub fn restore(&self, connected_address: Option<&str>) -> Result<WorkflowState, WorkflowError> {
        let Some(state) = self.load()? else {
            return Ok(WorkflowState {
                connected_address: connected_address.map(|a| a.to_lowercase()),
                ..WorkflowState::default()
            });
        };

        if state.current_step == DeployStep::Complete {
            self.clear()?;
            return Ok(WorkflowState {
                connected_address: connected_address.map(|a| a.to_lowercase()),
                ..WorkflowState::default()
            });
        }

        let connected = connected_address.map(|a| a.to_lowercase());
        let persisted_wallet = state.selected_wallet.as_ref().map(|w| w.address.clone());
        let trusted = match (&connected, &persisted_wallet) {
            (Some(connected), Some(wallet)) => connected == wallet,
            (_, None) => true,
            _ => false,
        };

        if !trusted {
            warn!("persisted workflow state does not match connected wallet, discarding");
            self.clear()?;
            return Ok(WorkflowState {
                connected_address: connected,
                ..WorkflowState::default()
            });
        }

        Ok(WorkflowState {
            connected_address: connected,
            // A reload never resumes inside an in-flight delegation.
            delegating: false,
            ..state
        })
    }
}
