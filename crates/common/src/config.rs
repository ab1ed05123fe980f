//! Configuration management following 12-factor app principles
//!
//! Runtime settings for the server process are loaded from environment
//! variables. Component settings (backend, auth, attachments, invitations)
//! live next to the component that reads them.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,

    /// Tracing filter directive
    pub rust_log: String,

    /// Emit JSON log lines instead of the pretty formatter
    pub json_logs: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port number, got '{raw}'"))?,
            Err(_) => 3000,
        };

        Ok(Self {
            port,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "coachdesk=debug".to_string()),
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}
