mod report;
mod telemetry;
mod workflow;

use reqwest::Client;
use token_setup_horizon::HorizonClient;
use token_setup_util::{load_env_file, Environment, SetupConfig};

use crate::workflow::{SetupError, SetupReport, TokenSetup};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let environment = Environment::from_env()?;
    telemetry::init_tracing(environment)?;

    // every failure is reported here; the process still exits normally
    match run().await {
        Ok(report) => report::log_success(&report),
        Err(err) => report::log_failure(&err),
    }
    Ok(())
}

async fn run() -> Result<SetupReport, SetupError> {
    let config = SetupConfig::from_env()?;
    let http = Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(SetupError::HttpClient)?;
    let horizon = HorizonClient::new(config.horizon_url.clone(), http);

    TokenSetup::new(horizon, config).run().await
}
