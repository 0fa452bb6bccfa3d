use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_GATEWAY_URL: &str = "ws://localhost:3000/gateway";
const DEFAULT_CREDENTIALS: &str = "campus-session.json";

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api_url: String,
    pub gateway_url: String,
    pub credentials_path: PathBuf,
    pub email: Option<String>,
    pub password: Option<String>,
    pub reconnect_delay: Duration,
}

impl CliConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let reconnect_secs: u64 = lookup("CAMPUS_RECONNECT_SECS")
            .unwrap_or_else(|| "5".into())
            .parse()
            .context("CAMPUS_RECONNECT_SECS must be a whole number of seconds")?;

        Ok(Self {
            api_url: lookup("CAMPUS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            gateway_url: lookup("CAMPUS_GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.into()),
            credentials_path: lookup("CAMPUS_CREDENTIALS")
                .unwrap_or_else(|| DEFAULT_CREDENTIALS.into())
                .into(),
            email: lookup("CAMPUS_EMAIL").filter(|v| !v.is_empty()),
            password: lookup("CAMPUS_PASSWORD").filter(|v| !v.is_empty()),
            reconnect_delay: Duration::from_secs(reconnect_secs),
        })
    }
}
