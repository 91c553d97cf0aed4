use std::{fmt, time::Duration};

use token_setup_core::{
    Amount, AmountError, Asset, AssetError, HomeDomain, KeyError, Keypair, Network,
    TransactionError,
};
use url::Url;

use super::{
    env_value, DEFAULT_HORIZON_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_NETWORK_PASSPHRASE,
    DEFAULT_TOKEN_CODE, DEFAULT_TX_TIMEOUT_SECS, MAX_TIMEOUT_SECS,
};

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    /// Reads `APP_ENV`, defaulting to development.
    pub fn from_env() -> Result<Self, ConfigError> {
        let value = env_value("APP_ENV").unwrap_or_else(|| "development".to_string());
        Self::from_str(&value)
    }

    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns the canonical name used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Everything a setup run needs, validated before any network call.
#[derive(Debug, Clone)]
pub struct SetupConfig {
    pub issuer: Keypair,
    pub distributor: Keypair,
    pub asset: Asset,
    pub mint_amount: Amount,
    pub home_domain: Option<HomeDomain>,
    pub horizon_url: Url,
    pub network: Network,
    pub tx_timeout: Duration,
    pub http_timeout: Duration,
    pub environment: Environment,
}

impl SetupConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_value)
    }

    /// Same as [`SetupConfig::from_env`] with a custom variable source.
    /// Empty values must already be mapped to `None`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());
        let environment = Environment::from_str(&app_env)?;

        let issuer = parse_secret(&lookup, "ISSUER_SECRET")?;
        let distributor = parse_secret(&lookup, "DISTRIBUTOR_SECRET")?;
        if issuer.public_key() == distributor.public_key() {
            return Err(ConfigError::SameAccount);
        }

        let token_code = lookup("TOKEN_CODE").unwrap_or_else(|| DEFAULT_TOKEN_CODE.to_string());
        let asset = Asset::new(token_code, issuer.public_key()).map_err(ConfigError::TokenCode)?;

        let mint_amount = lookup("MINT_AMOUNT")
            .ok_or(ConfigError::Missing("MINT_AMOUNT"))?
            .parse::<Amount>()
            .map_err(ConfigError::MintAmount)?;

        let home_domain = lookup("HOME_DOMAIN")
            .map(HomeDomain::new)
            .transpose()
            .map_err(ConfigError::HomeDomain)?;

        let horizon_url = lookup("HORIZON_URL").unwrap_or_else(|| DEFAULT_HORIZON_URL.to_string());
        let horizon_url = Url::parse(&horizon_url).map_err(ConfigError::HorizonUrl)?;

        let network = Network::new(
            lookup("NETWORK_PASSPHRASE").unwrap_or_else(|| DEFAULT_NETWORK_PASSPHRASE.to_string()),
        );

        let tx_timeout = parse_seconds(&lookup, "TX_TIMEOUT_SECS", DEFAULT_TX_TIMEOUT_SECS)?;
        let http_timeout =
            parse_seconds(&lookup, "HORIZON_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

        Ok(Self {
            issuer,
            distributor,
            asset,
            mint_amount,
            home_domain,
            horizon_url,
            network,
            tx_timeout,
            http_timeout,
            environment,
        })
    }
}

fn parse_secret<F>(lookup: &F, var: &'static str) -> Result<Keypair, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(var).ok_or(ConfigError::Missing(var))?;
    Keypair::from_secret(&value).map_err(|source| ConfigError::Secret { var, source })
}

fn parse_seconds<F>(lookup: &F, var: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(Duration::from_secs(default));
    };
    match value.parse::<u64>() {
        Ok(secs) if (1..=MAX_TIMEOUT_SECS).contains(&secs) => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidSeconds { var, value }),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    InvalidEnvironment(String),
    Secret {
        var: &'static str,
        source: KeyError,
    },
    SameAccount,
    TokenCode(AssetError),
    MintAmount(AmountError),
    HomeDomain(TransactionError),
    HorizonUrl(url::ParseError),
    InvalidSeconds {
        var: &'static str,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "{var} must be set"),
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::Secret { var, source } => write!(f, "invalid {var}: {source}"),
            Self::SameAccount => {
                write!(f, "ISSUER_SECRET and DISTRIBUTOR_SECRET must be different accounts")
            }
            Self::TokenCode(err) => write!(f, "invalid TOKEN_CODE: {err}"),
            Self::MintAmount(err) => write!(f, "invalid MINT_AMOUNT: {err}"),
            Self::HomeDomain(err) => write!(f, "invalid HOME_DOMAIN: {err}"),
            Self::HorizonUrl(err) => write!(f, "invalid HORIZON_URL value: {err}"),
            Self::InvalidSeconds { var, value } => {
                write!(
                    f,
                    "{var} must be between 1 and {MAX_TIMEOUT_SECS} seconds (got {value})"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Secret { source, .. } => Some(source),
            Self::TokenCode(err) => Some(err),
            Self::MintAmount(err) => Some(err),
            Self::HomeDomain(err) => Some(err),
            Self::HorizonUrl(err) => Some(err),
            _ => None,
        }
    }
}
