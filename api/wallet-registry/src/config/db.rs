use crate::config::environment::AppConfig;

/// Redis connection settings, present only when a mirror is configured.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl RedisConfig {
    pub fn from_app(app: &AppConfig) -> Option<Self> {
        app.redis_url.clone().map(|url| Self { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            rust_env: "test".to_string(),
            api_host: "127.0.0.1".to_string(),
            api_port: 0,
            redis_url: None,
            cors_allowed_origins: Vec::new(),
        }
    }

    #[test]
    fn redis_config_follows_the_optional_url() {
        assert!(RedisConfig::from_app(&base_config()).is_none());

        let mut config = base_config();
        config.redis_url = Some("redis://127.0.0.1:6379".to_string());
        let redis = RedisConfig::from_app(&config).unwrap();
        assert_eq!(redis.url, "redis://127.0.0.1:6379");
    }
}
