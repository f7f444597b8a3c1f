use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, U256};

use crate::errors::InventoryError;
use crate::handler::OwnershipSource;

abigen!(
    LicenseContract,
    r#"[
        {
            "inputs": [{"name":"owner","type":"address"}],
            "name": "balanceOf",
            "outputs": [{"name":"","type":"uint256"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [
                {"name":"owner","type":"address"},
                {"name":"index","type":"uint256"}
            ],
            "name": "tokenOfOwnerByIndex",
            "outputs": [{"name":"","type":"uint256"}],
            "stateMutability": "view",
            "type": "function"
        }
    ]"#
);

pub struct ChainConfig {
    pub rpc_url: String,
    pub contract_address: String,
}

pub struct ChainOwnershipSource {
    contract: LicenseContract<Provider<Http>>,
}

impl ChainOwnershipSource {
    pub fn connect(cfg: &ChainConfig) -> Result<Self, InventoryError> {
        let provider = Provider::<Http>::try_from(cfg.rpc_url.as_str())
            .map_err(|e| InventoryError::Onchain(format!("provider init failed: {e}")))?;
        let contract_addr = Address::from_str(&cfg.contract_address)
            .map_err(|e| InventoryError::Onchain(format!("invalid contract address: {e}")))?;
        Ok(Self {
            contract: LicenseContract::new(contract_addr, Arc::new(provider)),
        })
    }
}

fn parse_owner(owner: &str) -> Result<Address, InventoryError> {
    Address::from_str(owner)
        .map_err(|e| InventoryError::InvalidRequest(format!("invalid owner address: {e}")))
}

#[async_trait]
impl OwnershipSource for ChainOwnershipSource {
    async fn token_count(&self, owner: &str) -> Result<u64, InventoryError> {
        let owner = parse_owner(owner)?;
        let balance: U256 = self
            .contract
            .balance_of(owner)
            .call()
            .await
            .map_err(|e| InventoryError::Onchain(format!("balanceOf call failed: {e}")))?;
        Ok(balance.as_u64())
    }

    async fn token_by_index(&self, owner: &str, index: u64) -> Result<String, InventoryError> {
        let owner = parse_owner(owner)?;
        let token_id: U256 = self
            .contract
            .token_of_owner_by_index(owner, U256::from(index))
            .call()
            .await
            .map_err(|e| {
                InventoryError::Onchain(format!("tokenOfOwnerByIndex call failed: {e}"))
            })?;
        Ok(token_id.to_string())
    }
}
