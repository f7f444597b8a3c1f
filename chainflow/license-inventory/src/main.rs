use std::io::{self, Read};

use license_inventory::chain::{ChainConfig, ChainOwnershipSource};
use license_inventory::errors::InventoryError;
use license_inventory::handler::{DEFAULT_BATCH_SIZE, FixtureOwnershipSource, InventoryFetcher};
use license_inventory::models::{FetchLicensesRequest, FetchOutcome};
use tokio::runtime::Runtime;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), InventoryError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| InventoryError::InvalidRequest(format!("failed reading stdin: {e}")))?;

    let request: FetchLicensesRequest = serde_json::from_str(&input)
        .map_err(|e| InventoryError::InvalidRequest(format!("invalid json input: {e}")))?;

    let batch_size = request.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
    let rt = Runtime::new()
        .map_err(|e| InventoryError::Onchain(format!("runtime init failed: {e}")))?;

    let outcome: FetchOutcome = if let Some(tokens) = request.fixture_tokens.clone() {
        let source = FixtureOwnershipSource::new(
            tokens,
            request.fixture_missing_indices.clone().unwrap_or_default(),
        );
        let fetcher = InventoryFetcher::new(source, batch_size);
        rt.block_on(fetcher.fetch_licenses(&request.owner_address, print_progress))?
    } else {
        let cfg = read_chain_config()?;
        let source = ChainOwnershipSource::connect(&cfg)?;
        let fetcher = InventoryFetcher::new(source, batch_size);
        rt.block_on(fetcher.fetch_licenses(&request.owner_address, print_progress))?
    };

    let output = serde_json::to_string_pretty(&outcome)
        .map_err(|e| InventoryError::InvalidRequest(format!("failed serializing output: {e}")))?;
    println!("{output}");
    Ok(())
}

fn print_progress(
    progress: license_inventory::models::FetchProgress,
    _partial: &[license_inventory::models::LicenseToken],
) {
    eprintln!(
        "scanned {}/{} ({}%)",
        progress.scanned, progress.total, progress.percent
    );
}

fn read_chain_config() -> Result<ChainConfig, InventoryError> {
    let rpc_url = std::env::var("LICENSE_RPC_URL").map_err(|_| {
        InventoryError::MissingEnv(
            "set LICENSE_RPC_URL, or provide fixture_tokens for offline mode".to_string(),
        )
    })?;
    let contract_address = std::env::var("LICENSE_CONTRACT_ADDRESS")
        .unwrap_or_else(|_| "0xa0467e0d53B552F5A0D8d846207eF6C3a6933b3C".to_string());
    Ok(ChainConfig {
        rpc_url,
        contract_address,
    })
}
