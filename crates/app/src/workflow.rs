use std::fmt;

use chrono::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use token_setup_core::{
    parse_balance, Account, Asset, Keypair, Operation, PublicKey, TransactionBuilder,
    TransactionEnvelope, TransactionError,
};
use token_setup_horizon::{AccountRecord, HorizonClient, HorizonError, ResultCodes, SubmitResponse};
use token_setup_util::{ConfigError, SetupConfig};

/// Transaction-submitting steps of a setup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Trust,
    HomeDomain,
    Mint,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trust => "trust",
            Self::HomeDomain => "home_domain",
            Self::Mint => "mint",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    Issuer,
    Distributor,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issuer => f.write_str("issuer"),
            Self::Distributor => f.write_str("distributor"),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct SetupReport {
    pub asset: Asset,
    pub issuer: PublicKey,
    pub distributor: PublicKey,
    pub trust: SubmitResponse,
    pub home_domain: Option<SubmitResponse>,
    pub mint: SubmitResponse,
    pub balance: Option<BalanceCheck>,
}

/// Distributor balance of the asset around the mint, in stroops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCheck {
    pub before: i64,
    pub minted: i64,
    pub after: i64,
}

impl BalanceCheck {
    pub fn is_consistent(&self) -> bool {
        self.before.checked_add(self.minted) == Some(self.after)
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("failed to fetch network base fee: {0}")]
    FeeStats(#[source] HorizonError),
    #[error("failed to load {role} account: {source}")]
    LoadAccount {
        role: AccountRole,
        #[source]
        source: HorizonError,
    },
    #[error("{role} account returned invalid sequence number '{value}'")]
    InvalidSequence { role: AccountRole, value: String },
    #[error("failed to fetch time bounds for {step} transaction: {source}")]
    Timebounds {
        step: Step,
        #[source]
        source: HorizonError,
    },
    #[error("failed to build {step} transaction: {source}")]
    Build {
        step: Step,
        #[source]
        source: TransactionError,
    },
    #[error("{step} transaction was rejected: {source}")]
    Submit {
        step: Step,
        #[source]
        source: HorizonError,
    },
}

impl SetupError {
    /// Result codes carried by a rejected submission, if any.
    pub fn result_codes(&self) -> Option<&ResultCodes> {
        match self {
            Self::FeeStats(err)
            | Self::LoadAccount { source: err, .. }
            | Self::Timebounds { source: err, .. }
            | Self::Submit { source: err, .. } => err.result_codes(),
            _ => None,
        }
    }
}

/// Sequences the trust, home domain and mint transactions for one asset.
pub struct TokenSetup {
    horizon: HorizonClient,
    config: SetupConfig,
}

impl TokenSetup {
    pub fn new(horizon: HorizonClient, config: SetupConfig) -> Self {
        Self { horizon, config }
    }

    pub async fn run(&self) -> Result<SetupReport, SetupError> {
        let config = &self.config;
        let issuer = config.issuer.public_key();
        let distributor = config.distributor.public_key();
        info!(
            stage = "config",
            asset = %config.asset,
            amount = %config.mint_amount,
            horizon = %self.horizon.base_url(),
            "starting token setup"
        );

        let ledger = self
            .horizon
            .latest_ledger()
            .await
            .map_err(SetupError::FeeStats)?;
        let base_fee = ledger.base_fee_in_stroops;
        info!(stage = "fees", base_fee, ledger = ledger.sequence, "fetched network base fee");

        info!(stage = "trust", account = %distributor, "creating trustline from distributor");
        let distributor_record = self
            .load_account(AccountRole::Distributor, &distributor)
            .await?;
        let balance_before = existing_balance(&distributor_record, &config.asset);
        let mut distributor_account =
            account_from_record(AccountRole::Distributor, distributor, &distributor_record)?;
        let trust = self
            .submit(
                Step::Trust,
                &mut distributor_account,
                base_fee,
                Operation::change_trust(config.asset.clone()),
                &config.distributor,
            )
            .await?;

        let issuer_record = self.load_account(AccountRole::Issuer, &issuer).await?;
        let mut issuer_account = account_from_record(AccountRole::Issuer, issuer, &issuer_record)?;

        let home_domain = match &config.home_domain {
            Some(domain) => {
                info!(stage = "home_domain", domain = domain.as_str(), account = %issuer, "setting issuer home domain");
                let response = self
                    .submit(
                        Step::HomeDomain,
                        &mut issuer_account,
                        base_fee,
                        Operation::SetOptions {
                            home_domain: domain.clone(),
                        },
                        &config.issuer,
                    )
                    .await?;
                Some(response)
            }
            None => {
                debug!(stage = "home_domain", "HOME_DOMAIN not set; skipping");
                None
            }
        };

        info!(stage = "mint", amount = %config.mint_amount, destination = %distributor, "minting to distributor");
        let mint = self
            .submit(
                Step::Mint,
                &mut issuer_account,
                base_fee,
                Operation::Payment {
                    destination: distributor,
                    asset: config.asset.clone(),
                    amount: config.mint_amount,
                },
                &config.issuer,
            )
            .await?;

        let balance = match balance_before {
            Some(before) => self.verify_balance(&distributor, before).await,
            None => None,
        };

        Ok(SetupReport {
            asset: config.asset.clone(),
            issuer,
            distributor,
            trust,
            home_domain,
            mint,
            balance,
        })
    }

    async fn load_account(
        &self,
        role: AccountRole,
        account: &PublicKey,
    ) -> Result<AccountRecord, SetupError> {
        self.horizon
            .load_account(account)
            .await
            .map_err(|source| SetupError::LoadAccount { role, source })
    }

    async fn submit(
        &self,
        step: Step,
        account: &mut Account,
        base_fee: u32,
        operation: Operation,
        signer: &Keypair,
    ) -> Result<SubmitResponse, SetupError> {
        let timeout = Duration::from_std(self.config.tx_timeout).map_err(|_| SetupError::Build {
            step,
            source: TransactionError::TimeBoundsOverflow,
        })?;
        let bounds = self
            .horizon
            .fetch_timebounds(timeout)
            .await
            .map_err(|source| SetupError::Timebounds { step, source })?;

        let operation_name = operation.name();
        let tx = TransactionBuilder::new(account, base_fee)
            .time_bounds(bounds)
            .add_operation(operation)
            .build()
            .map_err(|source| SetupError::Build { step, source })?;
        let sequence = tx.sequence();

        let mut envelope = TransactionEnvelope::new(tx);
        envelope.sign(signer, &self.config.network);
        debug!(
            stage = step.as_str(),
            operation = operation_name,
            sequence,
            max_time = bounds.max_time,
            hash = %envelope.hash_hex(&self.config.network),
            "submitting transaction"
        );

        let response = self
            .horizon
            .submit_transaction(&envelope)
            .await
            .map_err(|source| SetupError::Submit { step, source })?;
        info!(stage = step.as_str(), hash = %response.hash, ledger = response.ledger, "transaction applied");
        Ok(response)
    }

    async fn verify_balance(&self, distributor: &PublicKey, before: i64) -> Option<BalanceCheck> {
        let record = match self.horizon.load_account(distributor).await {
            Ok(record) => record,
            Err(err) => {
                warn!(stage = "report", error = %err, "could not reload distributor account");
                return None;
            }
        };
        let Some(after) = record
            .balance_of(&self.config.asset)
            .and_then(|value| parse_balance(value).ok())
        else {
            warn!(stage = "report", asset = %self.config.asset, "distributor balance not reported");
            return None;
        };

        let check = BalanceCheck {
            before,
            minted: self.config.mint_amount.stroops(),
            after,
        };
        if !check.is_consistent() {
            warn!(
                stage = "report",
                before = check.before,
                minted = check.minted,
                after = check.after,
                "distributor balance does not reflect the minted amount"
            );
        }
        Some(check)
    }
}

/// Balance held before the run; zero when no trustline exists yet.
fn existing_balance(record: &AccountRecord, asset: &Asset) -> Option<i64> {
    match record.balance_of(asset) {
        Some(value) => parse_balance(value).ok(),
        None => Some(0),
    }
}

fn account_from_record(
    role: AccountRole,
    id: PublicKey,
    record: &AccountRecord,
) -> Result<Account, SetupError> {
    let sequence = record
        .sequence_number()
        .ok_or_else(|| SetupError::InvalidSequence {
            role,
            value: record.sequence.clone(),
        })?;
    Ok(Account::new(id, sequence))
}
