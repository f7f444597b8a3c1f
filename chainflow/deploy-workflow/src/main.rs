use std::io::{self, Read};

use delegate_licenses::handler::{SimulatedBackend, delegate_licenses};
use delegate_licenses::models::{DelegationResult, DelegationStrategy, SimulationFixture};
use deploy_workflow::handler::DeployWorkflow;
use deploy_workflow::models::WalletSummary;
use deploy_workflow::store::WorkflowStore;
use license_inventory::handler::{DEFAULT_BATCH_SIZE, FixtureOwnershipSource, InventoryFetcher};
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use uuid::Uuid;

const DEFAULT_CHAIN_ID: u64 = 629274;

#[derive(Debug, Deserialize)]
struct DeployRunRequest {
    wallet: WalletSummary,
    connected_address: String,
    delegatee: String,
    fixture_tokens: Vec<String>,
    #[serde(default)]
    fixture_missing_indices: Vec<u64>,
    /// Defaults to every fetched license.
    #[serde(default)]
    select_token_ids: Option<Vec<String>>,
    #[serde(default)]
    batch_size: Option<usize>,
    #[serde(default)]
    target_chain_id: Option<u64>,
    #[serde(default)]
    simulation: Option<SimulationFixture>,
    #[serde(default)]
    state_file: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeployRunResponse {
    run_id: String,
    final_step: u8,
    licenses_loaded: u64,
    licenses_dropped: u64,
    strategy: DelegationStrategy,
    results: Vec<DelegationResult>,
    succeeded: u64,
    failed: u64,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| format!("failed reading stdin: {e}"))?;
    let request: DeployRunRequest =
        serde_json::from_str(&input).map_err(|e| format!("invalid json input: {e}"))?;

    let run_id = format!("deploy-{}", Uuid::new_v4());
    let store = request.state_file.as_ref().map(WorkflowStore::new);
    let initial = match &store {
        Some(store) => store
            .restore(Some(request.connected_address.as_str()))
            .map_err(|e| e.to_string())?,
        None => Default::default(),
    };

    let mut workflow = DeployWorkflow::new(initial);
    workflow.connect(&request.connected_address);
    workflow
        .select_wallet(Some(request.wallet.clone()))
        .map_err(|e| e.to_string())?;

    let rt = Runtime::new().map_err(|e| format!("runtime init failed: {e}"))?;

    let source = FixtureOwnershipSource::new(
        request.fixture_tokens.clone(),
        request.fixture_missing_indices.clone(),
    );
    let fetcher = InventoryFetcher::new(
        source,
        request.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
    );
    let inventory = rt
        .block_on(fetcher.fetch_licenses(&request.wallet.address, |progress, _| {
            eprintln!(
                "inventory {}/{} ({}%)",
                progress.scanned, progress.total, progress.percent
            );
        }))
        .map_err(|e| e.to_string())?;

    let selection = request.select_token_ids.clone().unwrap_or_else(|| {
        inventory
            .licenses
            .iter()
            .map(|l| l.token_id.clone())
            .collect()
    });
    workflow
        .select_licenses(&selection, &inventory.licenses)
        .map_err(|e| e.to_string())?;
    workflow.begin_delegation().map_err(|e| e.to_string())?;
    if let Some(store) = &store {
        store.save(workflow.state()).map_err(|e| e.to_string())?;
    }

    let chain_id = request.target_chain_id.unwrap_or(DEFAULT_CHAIN_ID);
    let backend = SimulatedBackend::new(
        &request.connected_address,
        chain_id,
        request.simulation.clone().unwrap_or_default(),
    );
    let outcome = rt
        .block_on(delegate_licenses(
            &backend,
            &request.wallet.address,
            &request.delegatee,
            &selection,
            chain_id,
            |progress, _| {
                eprintln!(
                    "delegated {}/{} ({}%)",
                    progress.completed, progress.total, progress.percent
                );
            },
        ))
        .map_err(|e| e.to_string())?;

    workflow
        .finish_delegation(&outcome.results)
        .map_err(|e| e.to_string())?;
    if let Some(store) = &store {
        store.save(workflow.state()).map_err(|e| e.to_string())?;
    }

    let response = DeployRunResponse {
        run_id,
        final_step: workflow.current_step().as_index(),
        licenses_loaded: inventory.loaded,
        licenses_dropped: inventory.dropped,
        strategy: outcome.strategy,
        results: outcome.results,
        succeeded: outcome.succeeded,
        failed: outcome.failed,
    };
    let output = serde_json::to_string_pretty(&response)
        .map_err(|e| format!("failed serializing output: {e}"))?;
    println!("{output}");
    Ok(())
}
