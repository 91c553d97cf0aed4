pub mod config;

use std::env;

pub use config::{ConfigError, Environment, SetupConfig};

pub const DEFAULT_HORIZON_URL: &str = "https://api.testnet.minepi.com";
pub const DEFAULT_NETWORK_PASSPHRASE: &str = "Pi Testnet";
pub const DEFAULT_TOKEN_CODE: &str = "FXR";
pub const DEFAULT_TX_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Upper bound accepted for both timeouts.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe to call where no dotenv
/// file is deployed. Variables already present in the process win.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Reads an environment variable, treating empty values as unset.
pub fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
