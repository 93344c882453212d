use std::sync::Arc;

use anyhow::Context;

use crate::auth::{
    jwt::TokenIssuer, memory::MemoryAccountRepository, password::CredentialHasher,
    repo::{AccountRepository, PgAccountRepository}, services::AuthService,
};
use crate::config::AppConfig;
use crate::db;

/// `DATABASE_URL` value that selects the in-process store.
pub const MEMORY_STORE_URL: &str = "memory://";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let accounts = if config.database_url == MEMORY_STORE_URL {
            tracing::warn!("using in-memory account store; data is lost on exit");
            Arc::new(MemoryAccountRepository::new()) as Arc<dyn AccountRepository>
        } else {
            let pool = db::connect(&config.database_url).await?;
            Arc::new(PgAccountRepository::new(pool)) as Arc<dyn AccountRepository>
        };

        let hasher = CredentialHasher::new(config.hash).context("build credential hasher")?;
        let tokens = TokenIssuer::new(&config.jwt).context("build token issuer")?;

        Ok(Self::from_parts(
            config,
            AuthService::new(accounts, hasher, tokens),
        ))
    }

    pub fn from_parts(config: Arc<AppConfig>, auth: AuthService) -> Self {
        Self { config, auth }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::auth::services::test_support::memory_service;
        use crate::config::{HashConfig, JwtConfig};
        use std::time::Duration;

        let config = Arc::new(AppConfig {
            database_url: MEMORY_STORE_URL.into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                ttl_hours: 72,
            },
            hash: HashConfig::default(),
            request_timeout: Duration::from_secs(5),
        });

        let (auth, _) = memory_service();
        Self::from_parts(config, auth)
    }
}
