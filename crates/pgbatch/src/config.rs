//! Connection settings, read from the environment.

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

use crate::plan::PLACEHOLDER_LIMIT;
use crate::{Error, Result};

pub const DEFAULT_POOL_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub placeholder_limit: usize,
    pub pool_size: usize,
}

impl Config {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            placeholder_limit: PLACEHOLDER_LIMIT,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    /// Read `DATABASE_URL`, `PGBATCH_PLACEHOLDER_LIMIT` and `PGBATCH_POOL_SIZE`.
    ///
    /// A `.env` file in the working directory (or a parent) is loaded first,
    /// if there is one.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], with variables looked up through `var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = var("DATABASE_URL")
            .ok_or_else(|| Error::Config("DATABASE_URL is not set".to_string()))?;

        let mut config = Self::new(database_url);
        if let Some(limit) = var("PGBATCH_PLACEHOLDER_LIMIT") {
            config.placeholder_limit = parse_number("PGBATCH_PLACEHOLDER_LIMIT", &limit)?;
        }
        if let Some(size) = var("PGBATCH_POOL_SIZE") {
            config.pool_size = parse_number("PGBATCH_POOL_SIZE", &size)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.pg_config()?;
        if self.placeholder_limit == 0 || self.placeholder_limit > PLACEHOLDER_LIMIT {
            return Err(Error::Config(format!(
                "placeholder limit must be between 1 and {PLACEHOLDER_LIMIT}, got {}",
                self.placeholder_limit
            )));
        }
        if self.pool_size == 0 {
            return Err(Error::Config("pool size must be at least 1".to_string()));
        }
        Ok(())
    }

    fn pg_config(&self) -> Result<tokio_postgres::Config> {
        if self.database_url.trim().is_empty() {
            return Err(Error::Config("database url is empty".to_string()));
        }
        self.database_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid database url: {e}")))
    }

    /// Build a connection pool. Connections are opened lazily.
    pub fn create_pool(&self) -> Result<Pool> {
        self.validate()?;
        let mut manager_config = ManagerConfig::default();
        manager_config.recycling_method = RecyclingMethod::Fast;
        let manager = Manager::from_config(self.pg_config()?, NoTls, manager_config);
        Ok(Pool::builder(manager).max_size(self.pool_size).build()?)
    }
}

fn parse_number(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a positive integer, got {raw:?}")))
}
