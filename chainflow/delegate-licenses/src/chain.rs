use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, U256, U64};

use crate::errors::DelegationError;
use crate::handler::{DelegationBackend, SubmittedTx};

abigen!(
    LicenseDelegate,
    r#"[
        {
            "inputs": [
                {"name":"delegatee","type":"address"},
                {"name":"tokenId","type":"uint256"}
            ],
            "name": "delegate",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        }
    ]"#
);

// abigen names the aggregate3 output struct after the internalType;
// it must not be called "Result" or it shadows the prelude type here.
abigen!(
    Multicall3,
    r#"[
        {
            "inputs": [
                {
                    "components": [
                        {"internalType":"address","name":"target","type":"address"},
                        {"internalType":"bool","name":"allowFailure","type":"bool"},
                        {"internalType":"bytes","name":"callData","type":"bytes"}
                    ],
                    "internalType":"struct Multicall3.Call3[]",
                    "name":"calls",
                    "type":"tuple[]"
                }
            ],
            "name": "aggregate3",
            "outputs": [
                {
                    "components": [
                        {"internalType":"bool","name":"success","type":"bool"},
                        {"internalType":"bytes","name":"returnData","type":"bytes"}
                    ],
                    "internalType":"struct Multicall3.CallResult[]",
                    "name":"returnData",
                    "type":"tuple[]"
                }
            ],
            "stateMutability": "payable",
            "type": "function"
        }
    ]"#
);

/// Large aggregated transactions can confirm slowly; receipt waiting
/// gets minutes, not seconds.
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(300);

type ChainMiddleware = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct ChainConfig {
    pub rpc_url: String,
    pub private_key: String,
    pub chain_id: u64,
    pub license_contract: String,
    pub multicall_contract: String,
}

pub struct EthersDelegationBackend {
    middleware: Arc<ChainMiddleware>,
    license: LicenseDelegate<ChainMiddleware>,
    multicall: Multicall3<ChainMiddleware>,
    sender: Address,
}

impl EthersDelegationBackend {
    pub fn connect(cfg: &ChainConfig) -> Result<Self, DelegationError> {
        let provider = Provider::<Http>::try_from(cfg.rpc_url.as_str())
            .map_err(|e| DelegationError::Onchain(format!("provider init failed: {e}")))?;
        let wallet: LocalWallet = cfg
            .private_key
            .parse::<LocalWallet>()
            .map_err(|e| DelegationError::Onchain(format!("invalid private key: {e}")))?
            .with_chain_id(cfg.chain_id);
        let sender = wallet.address();
        let middleware = Arc::new(SignerMiddleware::new(provider, wallet));

        let license_addr = Address::from_str(&cfg.license_contract)
            .map_err(|e| DelegationError::Onchain(format!("invalid license contract: {e}")))?;
        let multicall_addr = Address::from_str(&cfg.multicall_contract)
            .map_err(|e| DelegationError::Onchain(format!("invalid multicall contract: {e}")))?;

        Ok(Self {
            license: LicenseDelegate::new(license_addr, middleware.clone()),
            multicall: Multicall3::new(multicall_addr, middleware.clone()),
            middleware,
            sender,
        })
    }

    fn aggregate_calls(
        &self,
        token_ids: &[String],
        delegatee: &str,
    ) -> Result<Vec<Call3>, DelegationError> {
        let delegatee = parse_address(delegatee)?;
        let mut calls = Vec::with_capacity(token_ids.len());
        for token_id in token_ids {
            let token = parse_token_id(token_id)?;
            let call_data: Bytes = self
                .license
                .delegate(delegatee, token)
                .calldata()
                .ok_or_else(|| {
                    DelegationError::Onchain("failed encoding delegate calldata".to_string())
                })?;
            calls.push(Call3 {
                target: self.license.address(),
                allow_failure: false,
                call_data,
            });
        }
        Ok(calls)
    }
}

fn parse_address(input: &str) -> Result<Address, DelegationError> {
    Address::from_str(input)
        .map_err(|e| DelegationError::InvalidRequest(format!("invalid address `{input}`: {e}")))
}

fn parse_token_id(input: &str) -> Result<U256, DelegationError> {
    if let Some(hexv) = input.strip_prefix("0x") {
        U256::from_str_radix(hexv, 16)
            .map_err(|e| DelegationError::InvalidRequest(format!("invalid token id `{input}`: {e}")))
    } else {
        U256::from_dec_str(input)
            .map_err(|e| DelegationError::InvalidRequest(format!("invalid token id `{input}`: {e}")))
    }
}

async fn await_receipt(
    pending: ethers::providers::PendingTransaction<'_, Http>,
) -> Result<SubmittedTx, DelegationError> {
    let hash = format!("{:#x}", pending.tx_hash());
    let receipt = tokio::time::timeout(RECEIPT_TIMEOUT, pending)
        .await
        .map_err(|_| DelegationError::Onchain(format!("receipt wait timed out: tx={hash}")))?
        .map_err(|e| DelegationError::Onchain(format!("tx confirmation failed: {e}")))?
        .ok_or_else(|| DelegationError::Onchain("missing transaction receipt".to_string()))?;

    Ok(SubmittedTx {
        hash,
        confirmed: receipt.status == Some(U64::from(1u64)),
    })
}

#[async_trait]
impl DelegationBackend for EthersDelegationBackend {
    async fn ensure_chain(&self, target_chain_id: u64) -> Result<(), DelegationError> {
        let chain_id = self
            .middleware
            .get_chainid()
            .await
            .map_err(|e| DelegationError::Onchain(format!("chain id query failed: {e}")))?;
        if chain_id != U256::from(target_chain_id) {
            return Err(DelegationError::WrongNetwork(format!(
                "connected to chain {chain_id} but chain {target_chain_id} is required"
            )));
        }
        Ok(())
    }

    fn sender_address(&self) -> String {
        format!("{:#x}", self.sender)
    }

    async fn estimate_aggregate_gas(
        &self,
        token_ids: &[String],
        delegatee: &str,
    ) -> Result<u64, DelegationError> {
        let calls = self.aggregate_calls(token_ids, delegatee)?;
        let estimate = self
            .multicall
            .aggregate_3(calls)
            .estimate_gas()
            .await
            .map_err(|e| DelegationError::Onchain(format!("gas estimation failed: {e}")))?;
        Ok(estimate.as_u64())
    }

    async fn simulate_aggregate(
        &self,
        token_ids: &[String],
        delegatee: &str,
    ) -> Result<(), DelegationError> {
        let calls = self.aggregate_calls(token_ids, delegatee)?;
        self.multicall
            .aggregate_3(calls)
            .call()
            .await
            .map_err(|e| DelegationError::Onchain(format!("aggregate simulation failed: {e}")))?;
        Ok(())
    }

    async fn submit_aggregate(
        &self,
        token_ids: &[String],
        delegatee: &str,
        gas_limit: u64,
    ) -> Result<SubmittedTx, DelegationError> {
        let calls = self.aggregate_calls(token_ids, delegatee)?;
        let call = self.multicall.aggregate_3(calls).gas(U256::from(gas_limit));
        let pending = call
            .send()
            .await
            .map_err(|e| DelegationError::Onchain(format!("aggregate call failed: {e}")))?;
        await_receipt(pending).await
    }

    async fn simulate_delegate(
        &self,
        token_id: &str,
        delegatee: &str,
    ) -> Result<(), DelegationError> {
        let delegatee = parse_address(delegatee)?;
        let token = parse_token_id(token_id)?;
        self.license
            .delegate(delegatee, token)
            .call()
            .await
            .map_err(|e| DelegationError::Onchain(format!("delegate simulation failed: {e}")))?;
        Ok(())
    }

    async fn submit_delegate(
        &self,
        token_id: &str,
        delegatee: &str,
    ) -> Result<SubmittedTx, DelegationError> {
        let delegatee = parse_address(delegatee)?;
        let token = parse_token_id(token_id)?;
        let call = self.license.delegate(delegatee, token);
        let pending = call
            .send()
            .await
            .map_err(|e| DelegationError::Onchain(format!("delegate call failed: {e}")))?;
        await_receipt(pending).await
    }
}
