use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    amount::Amount,
    asset::Asset,
    keys::{Keypair, PublicKey},
    xdr::XdrWriter,
};

/// Ledger limit on operations per transaction.
pub const MAX_OPERATIONS: usize = 100;
const MAX_HOME_DOMAIN_LEN: usize = 32;

const ENVELOPE_TYPE_TX: i32 = 2;
const KEY_TYPE_ED25519: i32 = 0;
const PRECOND_TIME: i32 = 1;
const MEMO_NONE: i32 = 0;

const OP_PAYMENT: i32 = 1;
const OP_SET_OPTIONS: i32 = 5;
const OP_CHANGE_TRUST: i32 = 6;

/// Network the transaction is bound to, identified by its passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    passphrase: String,
}

impl Network {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// SHA-256 of the passphrase.
    pub fn id(&self) -> [u8; 32] {
        Sha256::digest(self.passphrase.as_bytes()).into()
    }
}

/// Source account with its last consumed sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: PublicKey,
    sequence: i64,
}

impl Account {
    pub fn new(id: PublicKey, sequence: i64) -> Self {
        Self { id, sequence }
    }

    pub fn id(&self) -> PublicKey {
        self.id
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    fn next_sequence(&self) -> Result<i64, TransactionError> {
        self.sequence
            .checked_add(1)
            .ok_or(TransactionError::SequenceOverflow)
    }
}

/// Validity window of a transaction in unix seconds. A `max_time` of zero means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

impl TimeBounds {
    /// Bounds valid from any time until `now + timeout`.
    pub fn expiring_after(now: DateTime<Utc>, timeout: Duration) -> Result<Self, TransactionError> {
        let expires = now
            .checked_add_signed(timeout)
            .ok_or(TransactionError::TimeBoundsOverflow)?;
        let max_time =
            u64::try_from(expires.timestamp()).map_err(|_| TransactionError::TimeBoundsOverflow)?;
        Ok(Self {
            min_time: 0,
            max_time,
        })
    }
}

/// Home domain attached to an account, at most 32 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeDomain(String);

impl HomeDomain {
    pub fn new(value: impl Into<String>) -> Result<Self, TransactionError> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_HOME_DOMAIN_LEN {
            return Err(TransactionError::HomeDomainLength(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Ledger operations the workflow submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ChangeTrust { asset: Asset, limit: Amount },
    SetOptions { home_domain: HomeDomain },
    Payment {
        destination: PublicKey,
        asset: Asset,
        amount: Amount,
    },
}

impl Operation {
    /// Trustline for `asset` with the maximum limit.
    pub fn change_trust(asset: Asset) -> Self {
        Self::ChangeTrust {
            asset,
            limit: Amount::MAX,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ChangeTrust { .. } => "change_trust",
            Self::SetOptions { .. } => "set_options",
            Self::Payment { .. } => "payment",
        }
    }

    fn write_xdr(&self, w: &mut XdrWriter) {
        // per-operation source account is never set
        w.write_bool(false);
        match self {
            Self::ChangeTrust { asset, limit } => {
                w.write_i32(OP_CHANGE_TRUST);
                write_asset(w, asset);
                w.write_i64(limit.stroops());
            }
            Self::SetOptions { home_domain } => {
                w.write_i32(OP_SET_OPTIONS);
                // inflation dest, clear/set flags, master weight, thresholds
                for _ in 0..7 {
                    w.write_bool(false);
                }
                w.write_optional(Some(home_domain), |w, domain| w.write_string(domain.as_str()));
                // signer
                w.write_bool(false);
            }
            Self::Payment {
                destination,
                asset,
                amount,
            } => {
                w.write_i32(OP_PAYMENT);
                write_account(w, destination);
                write_asset(w, asset);
                w.write_i64(amount.stroops());
            }
        }
    }
}

/// Builds a transaction for a source account, consuming its next sequence number.
pub struct TransactionBuilder<'a> {
    source: &'a mut Account,
    base_fee: u32,
    time_bounds: Option<TimeBounds>,
    operations: Vec<Operation>,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(source: &'a mut Account, base_fee: u32) -> Self {
        Self {
            source,
            base_fee,
            time_bounds: None,
            operations: Vec::new(),
        }
    }

    pub fn time_bounds(mut self, bounds: TimeBounds) -> Self {
        self.time_bounds = Some(bounds);
        self
    }

    pub fn add_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Finalizes the transaction and advances the source account sequence.
    pub fn build(self) -> Result<Transaction, TransactionError> {
        let Self {
            source,
            base_fee,
            time_bounds,
            operations,
        } = self;

        if operations.is_empty() {
            return Err(TransactionError::NoOperations);
        }
        if operations.len() > MAX_OPERATIONS {
            return Err(TransactionError::TooManyOperations(operations.len()));
        }
        let time_bounds = time_bounds.ok_or(TransactionError::MissingTimeBounds)?;
        let fee = u32::try_from(operations.len())
            .ok()
            .and_then(|count| base_fee.checked_mul(count))
            .ok_or(TransactionError::FeeOverflow)?;
        let sequence = source.next_sequence()?;
        source.sequence = sequence;

        Ok(Transaction {
            source: source.id,
            fee,
            sequence,
            time_bounds,
            operations,
        })
    }
}

/// Unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    source: PublicKey,
    fee: u32,
    sequence: i64,
    time_bounds: TimeBounds,
    operations: Vec<Operation>,
}

impl Transaction {
    pub fn fee(&self) -> u32 {
        self.fee
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Hash signed by every signer: SHA-256 over the network id and the tagged transaction.
    pub fn hash(&self, network: &Network) -> [u8; 32] {
        let mut payload = XdrWriter::new();
        payload.write_fixed_opaque(&network.id());
        payload.write_i32(ENVELOPE_TYPE_TX);
        self.write_xdr(&mut payload);
        Sha256::digest(payload.as_bytes()).into()
    }

    fn write_xdr(&self, w: &mut XdrWriter) {
        write_account(w, &self.source);
        w.write_u32(self.fee);
        w.write_i64(self.sequence);
        w.write_i32(PRECOND_TIME);
        w.write_u64(self.time_bounds.min_time);
        w.write_u64(self.time_bounds.max_time);
        w.write_i32(MEMO_NONE);
        w.write_u32(self.operations.len() as u32);
        for operation in &self.operations {
            operation.write_xdr(w);
        }
        // ext
        w.write_i32(0);
    }
}

/// Signature decorated with the signer's key hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedSignature {
    pub hint: [u8; 4],
    pub signature: [u8; 64],
}

/// Transaction plus its signatures, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope {
    tx: Transaction,
    signatures: Vec<DecoratedSignature>,
}

impl TransactionEnvelope {
    pub fn new(tx: Transaction) -> Self {
        Self {
            tx,
            signatures: Vec::new(),
        }
    }

    pub fn signatures(&self) -> &[DecoratedSignature] {
        &self.signatures
    }

    pub fn sign(&mut self, keypair: &Keypair, network: &Network) {
        let hash = self.tx.hash(network);
        self.signatures.push(DecoratedSignature {
            hint: keypair.public_key().signature_hint(),
            signature: keypair.sign(&hash),
        });
    }

    /// Hex-encoded transaction hash, as reported by Horizon.
    pub fn hash_hex(&self, network: &Network) -> String {
        hex::encode(self.tx.hash(network))
    }

    pub fn to_xdr(&self) -> Vec<u8> {
        let mut w = XdrWriter::new();
        w.write_i32(ENVELOPE_TYPE_TX);
        self.tx.write_xdr(&mut w);
        w.write_u32(self.signatures.len() as u32);
        for signature in &self.signatures {
            w.write_fixed_opaque(&signature.hint);
            w.write_var_opaque(&signature.signature);
        }
        w.into_bytes()
    }

    pub fn to_xdr_base64(&self) -> String {
        STANDARD.encode(self.to_xdr())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has no operations")]
    NoOperations,
    #[error("transaction has {0} operations (limit 100)")]
    TooManyOperations(usize),
    #[error("transaction time bounds are required")]
    MissingTimeBounds,
    #[error("transaction fee overflows u32")]
    FeeOverflow,
    #[error("transaction expiry is outside the representable time range")]
    TimeBoundsOverflow,
    #[error("account sequence number overflow")]
    SequenceOverflow,
    #[error("home domain '{0}' must be between 1 and 32 bytes")]
    HomeDomainLength(String),
}

fn write_account(w: &mut XdrWriter, key: &PublicKey) {
    w.write_i32(KEY_TYPE_ED25519);
    w.write_fixed_opaque(key.as_bytes());
}

fn write_asset(w: &mut XdrWriter, asset: &Asset) {
    let kind = asset.kind();
    w.write_i32(kind.discriminant());
    let mut code = vec![0u8; kind.code_width()];
    code[..asset.code().len()].copy_from_slice(asset.code().as_bytes());
    w.write_fixed_opaque(&code);
    write_account(w, &asset.issuer());
}
