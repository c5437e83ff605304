use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, StoreBackend};
use crate::db;
use crate::rate_limit::CallerRateLimiter;
use crate::store::{MemoryStore, PgStore, ReportStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReportStore>,
    pub config: Arc<AppConfig>,
    pub clock: Arc<dyn Clock>,
    pub report_limiter: Arc<CallerRateLimiter>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn ReportStore> = match config.store_backend {
            StoreBackend::Postgres => Arc::new(PgStore::new(db::connect(&config).await?)),
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::from_parts(store, config, Arc::new(SystemClock)))
    }

    pub fn from_parts(
        store: Arc<dyn ReportStore>,
        config: Arc<AppConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let report_limiter = Arc::new(CallerRateLimiter::per_minute(
            config.report_rate_limit_per_minute,
        ));
        Self {
            store,
            config,
            clock,
            report_limiter,
        }
    }

    /// In-memory state with a fixed test configuration.
    #[cfg(test)]
    pub fn fake(clock: Arc<dyn Clock>) -> Self {
        use crate::config::JwtConfig;

        let config = Arc::new(AppConfig {
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 1,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            owner: None,
            cors_origins: vec!["*".into()],
            report_rate_limit_per_minute: 10,
        });

        Self::from_parts(Arc::new(MemoryStore::new()), config, clock)
    }
}
