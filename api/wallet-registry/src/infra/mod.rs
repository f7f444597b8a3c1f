use crate::config::db::RedisConfig;
use crate::config::environment::AppConfig;
use redis::Client as RedisClient;

#[derive(Debug, Clone)]
pub struct InfraClients {
    pub redis: RedisClient,
}

pub const WALLETS_COLLECTION: &str = "wallets";
pub const WALLETS_INDEX_KEY: &str = "wallets:index";

pub async fn init_infra(config: &AppConfig) -> Result<Option<InfraClients>, String> {
    let Some(redis_config) = RedisConfig::from_app(config) else {
        return Ok(None);
    };

    let redis =
        RedisClient::open(redis_config.url).map_err(|e| format!("redis init failed: {e}"))?;
    Ok(Some(InfraClients { redis }))
}
