use thiserror::Error;
use tracing_subscriber::{
    fmt::{self as tracing_fmt, time::UtcTime},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

use token_setup_util::Environment;

#[derive(Debug, Error)]
#[error("failed to initialize tracing: {0}")]
pub struct TelemetryError(#[from] TryInitError);

/// Installs the global subscriber: pretty console output while developing,
/// one JSON object per line in production. `RUST_LOG` overrides the `info` default.
pub fn init_tracing(environment: Environment) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::rfc_3339());
    let registry = tracing_subscriber::registry().with(env_filter);

    match environment {
        Environment::Production => registry.with(fmt_layer.json()).try_init()?,
        Environment::Development | Environment::Test => {
            registry.with(fmt_layer.pretty()).try_init()?
        }
    }

    tracing::debug!(stage = "config", env = environment.as_str(), "tracing initialized");
    Ok(())
}
