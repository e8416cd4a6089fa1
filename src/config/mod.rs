use std::{env, error::Error};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub retention_days: i64,
    /// Require TLS on the database connection.
    pub database_tls: bool,
}

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RETENTION_DAYS: i64 = 90;

impl AppConfig {
    pub fn from_env() -> Result<Self, Box<dyn Error + Send + Sync>> {
        let database_url = env::var("DATABASE_URL")?;
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>()?,
            Err(env::VarError::NotPresent) => DEFAULT_PORT,
            Err(err) => return Err(Box::new(err)),
        };
        let retention_days = match env::var("RETENTION_DAYS") {
            Ok(raw) => raw.parse::<i64>()?,
            Err(env::VarError::NotPresent) => DEFAULT_RETENTION_DAYS,
            Err(err) => return Err(Box::new(err)),
        };
        let database_tls = match env::var("DATABASE_TLS") {
            Ok(raw) => matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
            Err(env::VarError::NotPresent) => false,
            Err(err) => return Err(Box::new(err)),
        };

        Ok(Self {
            database_url,
            port,
            retention_days,
            database_tls,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
