use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        }
    }
}

/// Credentials for the single owner account created at first start.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub owner: Option<OwnerConfig>,
    pub cors_origins: Vec<String>,
    pub report_rate_limit_per_minute: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = std::env::var("STORE_BACKEND")
            .ok()
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(StoreBackend::Postgres);

        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "miastoalert".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "miastoalert-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60 * 24 * 30),
        };

        let owner = match (std::env::var("OWNER_EMAIL"), std::env::var("OWNER_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(OwnerConfig { email, password })
            }
            _ => None,
        };

        let cors_origins = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            store_backend,
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            jwt,
            owner,
            cors_origins,
            report_rate_limit_per_minute: env_parse("REPORT_RATE_LIMIT_PER_MINUTE")
                .unwrap_or(10),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
