use std::io::{self, Read};

use delegate_licenses::chain::{ChainConfig, EthersDelegationBackend};
use delegate_licenses::errors::DelegationError;
use delegate_licenses::handler::{delegate_licenses, process_delegate_licenses};
use delegate_licenses::models::{
    DelegateLicensesRequest, DelegationOutcome, DelegationProgress, DelegationResult,
};
use tokio::runtime::Runtime;

const DEFAULT_CHAIN_ID: u64 = 629274;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), DelegationError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| DelegationError::InvalidRequest(format!("failed reading stdin: {e}")))?;

    let request: DelegateLicensesRequest = serde_json::from_str(&input)
        .map_err(|e| DelegationError::InvalidRequest(format!("invalid json input: {e}")))?;

    let target_chain_id = request.target_chain_id.unwrap_or(DEFAULT_CHAIN_ID);
    let rt = Runtime::new()
        .map_err(|e| DelegationError::Onchain(format!("runtime init failed: {e}")))?;

    let outcome: DelegationOutcome = if let Some(cfg) = read_chain_config(target_chain_id)? {
        let backend = EthersDelegationBackend::connect(&cfg)?;
        rt.block_on(delegate_licenses(
            &backend,
            &request.owner_address,
            &request.delegatee,
            &request.token_ids,
            target_chain_id,
            print_progress,
        ))?
    } else {
        rt.block_on(process_delegate_licenses(
            request,
            target_chain_id,
            print_progress,
        ))?
    };

    let output = serde_json::to_string_pretty(&outcome)
        .map_err(|e| DelegationError::InvalidRequest(format!("failed serializing output: {e}")))?;
    println!("{output}");
    Ok(())
}

fn print_progress(progress: DelegationProgress, _results: &[DelegationResult]) {
    eprintln!(
        "delegated {}/{} ({}%)",
        progress.completed, progress.total, progress.percent
    );
}

fn read_chain_config(chain_id: u64) -> Result<Option<ChainConfig>, DelegationError> {
    let rpc = std::env::var("LICENSE_RPC_URL").ok();
    let pk = std::env::var("PRIVATE_KEY").ok();

    match (rpc, pk) {
        (Some(rpc_url), Some(private_key)) => Ok(Some(ChainConfig {
            rpc_url,
            private_key,
            chain_id,
            license_contract: std::env::var("LICENSE_CONTRACT_ADDRESS")
                .unwrap_or_else(|_| "0x3F1BD1Abc350eD6313Ff7Eaab561DCAbbcc61071".to_string()),
            multicall_contract: std::env::var("MULTICALL3_ADDRESS")
                .unwrap_or_else(|_| "0x3F1BD1Abc350eD6313Ff7Eaab561DCAbbcc61071".to_string()),
        })),
        (None, None) => Ok(None),
        _ => Err(DelegationError::MissingEnv(
            "set both LICENSE_RPC_URL and PRIVATE_KEY, or set neither for simulation mode"
                .to_string(),
        )),
    }
}
