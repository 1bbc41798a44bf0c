use serde::Deserialize;
use time::{macros::offset, UtcOffset};

/// Store-local time (WIB) for order codes and report day boundaries.
pub const STORE_OFFSET: UtcOffset = offset!(+7);
/// Same zone by name, for Postgres date arithmetic.
pub const STORE_TIMEZONE: &str = "Asia/Jakarta";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub presign_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub store_name: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "laptop-store".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "laptop-store-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let storage = StorageConfig {
            endpoint: std::env::var("STORAGE_ENDPOINT")?,
            bucket: std::env::var("STORAGE_BUCKET")?,
            access_key: std::env::var("STORAGE_ACCESS_KEY")?,
            secret_key: std::env::var("STORAGE_SECRET_KEY")?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".into()),
            presign_ttl_secs: env_or("STORAGE_PRESIGN_TTL_SECS", 30 * 60),
        };
        Ok(Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            jwt,
            storage,
            store_name: std::env::var("STORE_NAME").unwrap_or_else(|_| "Laptop Store".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::env_or;

    #[test]
    fn env_or_falls_back_on_missing_or_garbage() {
        assert_eq!(env_or("LAPTOP_STORE_SURELY_UNSET_VAR", 42u32), 42);
    }
}
