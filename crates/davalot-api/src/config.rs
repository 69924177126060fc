//! Server configuration read from the environment.

use davalot_game::application::command_handlers::DEFAULT_MAX_CONFLICT_RETRIES;

use crate::error::AppError;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// PostgreSQL URL; sessions are kept in memory when absent.
    pub database_url: Option<String>,
    /// Open lobbies as debug sessions.
    pub debug: bool,
    pub max_conflict_retries: u32,
}

impl Config {
    /// Reads `HOST`, `PORT`, `DATABASE_URL`, `DAVALOT_DEBUG` and
    /// `DAVALOT_MAX_CONFLICT_RETRIES`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an unparsable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let debug = match lookup("DAVALOT_DEBUG") {
            Some(raw) => parse_flag(&raw)?,
            None => false,
        };
        let max_conflict_retries = match lookup("DAVALOT_MAX_CONFLICT_RETRIES") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::Config(format!(
                    "DAVALOT_MAX_CONFLICT_RETRIES must be a non-negative integer: {e}"
                ))
            })?,
            None => DEFAULT_MAX_CONFLICT_RETRIES,
        };

        Ok(Self {
            host,
            port,
            database_url,
            debug,
            max_conflict_retries,
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Config(format!(
            "DAVALOT_DEBUG must be a boolean, got `{other}`"
        ))),
    }
}
