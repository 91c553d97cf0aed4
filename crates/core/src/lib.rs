//! Domain layer for issuing assets: account keys, asset identifiers, amounts,
//! and the signed transaction envelopes submitted to Horizon.

pub mod amount;
pub mod asset;
pub mod keys;
pub mod transaction;
pub mod xdr;

pub use amount::{format_stroops, parse_balance, Amount, AmountError};
pub use asset::{Asset, AssetError, AssetKind};
pub use keys::{KeyError, Keypair, PublicKey};
pub use transaction::{
    Account, HomeDomain, Network, Operation, TimeBounds, Transaction, TransactionBuilder,
    TransactionEnvelope, TransactionError,
};
