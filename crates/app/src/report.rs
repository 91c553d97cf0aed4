use token_setup_core::format_stroops;
use tracing::{error, info};

use crate::workflow::{SetupError, SetupReport};

pub fn log_success(report: &SetupReport) {
    info!(stage = "report", asset = %report.asset, "token setup completed");
    info!(stage = "report", issuer = %report.issuer, "issuer account");
    info!(stage = "report", distributor = %report.distributor, "distributor account");
    info!(
        stage = "report",
        trust = %report.trust.hash,
        home_domain = report.home_domain.as_ref().map(|r| r.hash.as_str()).unwrap_or("-"),
        mint = %report.mint.hash,
        "transaction hashes"
    );
    if let Some(check) = &report.balance {
        info!(
            stage = "report",
            before = %format_stroops(check.before),
            after = %format_stroops(check.after),
            consistent = check.is_consistent(),
            "distributor balance"
        );
    }
}

/// Logs a failed run and prints the rejection details to stderr.
pub fn log_failure(err: &SetupError) {
    error!(stage = "report", error = %err, "token setup failed");
    eprintln!("{}", failure_details(err));
}

/// Horizon result codes as pretty JSON when available, otherwise the error itself.
pub fn failure_details(err: &SetupError) -> String {
    err.result_codes()
        .and_then(|codes| serde_json::to_string_pretty(codes).ok())
        .unwrap_or_else(|| format!("{err:?}"))
}
