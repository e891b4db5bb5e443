use crate::errors::AppError;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    /// Drop and recreate the tables at startup.
    pub schema_reset: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| AppError::configuration("DATABASE_URL not set"))?;
        Self::from_env_with_url(database_url)
    }

    /// Same as [`AppConfig::from_env`] but with the database URL already chosen.
    pub fn from_env_with_url(database_url: impl Into<String>) -> Result<Self, AppError> {
        let port = parse_env("APP_PORT", DEFAULT_PORT)?;
        let max_connections = parse_env("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let schema_reset = parse_env("SCHEMA_RESET", false)?;

        Ok(Self {
            database_url: database_url.into(),
            port,
            max_connections,
            schema_reset,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::configuration(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
