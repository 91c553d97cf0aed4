use std::fmt;

use serde::{Deserialize, Serialize};

use token_setup_core::Asset;

/// Ledger header fields needed to price transactions.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LedgerRecord {
    pub sequence: u32,
    pub base_fee_in_stroops: u32,
    pub base_reserve_in_stroops: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(rename = "_embedded")]
    pub embedded: Embedded<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Embedded<T> {
    pub records: Vec<T>,
}

/// Account document returned by `GET /accounts/{id}`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    pub account_id: String,
    pub sequence: String,
    #[serde(default)]
    pub home_domain: Option<String>,
    #[serde(default)]
    pub balances: Vec<BalanceLine>,
}

impl AccountRecord {
    /// Parses the string encoded sequence number.
    pub fn sequence_number(&self) -> Option<i64> {
        self.sequence.parse().ok()
    }

    /// Returns the balance held in `asset`, if the account has a trustline for it.
    pub fn balance_of(&self, asset: &Asset) -> Option<&str> {
        self.balances
            .iter()
            .find(|line| match (&line.asset_code, &line.asset_issuer) {
                (Some(code), Some(issuer)) => asset.matches(code, issuer),
                _ => false,
            })
            .map(|line| line.balance.as_str())
    }
}

/// Single balance entry of an account.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BalanceLine {
    pub balance: String,
    pub asset_type: String,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
}

/// Successful transaction submission.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SubmitResponse {
    pub hash: String,
    pub ledger: u32,
    #[serde(default)]
    pub successful: Option<bool>,
}

/// Problem document Horizon returns for failed requests.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Problem {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub extras: Option<ProblemExtras>,
}

impl Problem {
    pub fn result_codes(&self) -> Option<&ResultCodes> {
        self.extras
            .as_ref()
            .and_then(|extras| extras.result_codes.as_ref())
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self.title),
            None => f.write_str(&self.title),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProblemExtras {
    #[serde(default)]
    pub result_codes: Option<ResultCodes>,
    #[serde(default)]
    pub envelope_xdr: Option<String>,
    #[serde(default)]
    pub result_xdr: Option<String>,
}

/// Transaction and per-operation result codes of a rejected submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultCodes {
    pub transaction: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use token_setup_core::PublicKey;

    #[test]
    fn balance_lookup_matches_code_and_issuer() {
        let issuer = PublicKey::from_bytes([3u8; 32]);
        let asset = Asset::new("FXR", issuer).expect("asset");
        let record: AccountRecord = serde_json::from_value(json!({
            "account_id": "GDIST",
            "sequence": "8589934593",
            "balances": [
                { "balance": "12.0000000", "asset_type": "credit_alphanum4", "asset_code": "FXR", "asset_issuer": "GOTHER" },
                { "balance": "250.0000000", "asset_type": "credit_alphanum4", "asset_code": "FXR", "asset_issuer": issuer.account_id() },
                { "balance": "9999.9999900", "asset_type": "native" }
            ]
        }))
        .expect("account json");

        assert_eq!(record.sequence_number(), Some(8_589_934_593));
        assert_eq!(record.balance_of(&asset), Some("250.0000000"));
        assert_eq!(record.home_domain, None);
    }

    #[test]
    fn problem_exposes_result_codes() {
        let problem: Problem = serde_json::from_value(json!({
            "type": "https://stellar.org/horizon-errors/transaction_failed",
            "title": "Transaction Failed",
            "status": 400,
            "detail": "The transaction failed when submitted to the stellar network.",
            "extras": {
                "envelope_xdr": "AAAA",
                "result_codes": { "transaction": "tx_failed", "operations": ["op_low_reserve"] },
                "result_xdr": "AAAA"
            }
        }))
        .expect("problem json");

        let codes = problem.result_codes().expect("result codes");
        assert_eq!(codes.transaction, "tx_failed");
        assert_eq!(codes.operations, vec!["op_low_reserve".to_string()]);
        assert!(problem.to_string().starts_with("Transaction Failed: "));
    }

    #[test]
    fn result_codes_serialize_without_empty_operations() {
        let codes = ResultCodes {
            transaction: "tx_bad_seq".into(),
            operations: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&codes).expect("serialize"),
            json!({ "transaction": "tx_bad_seq" })
        );
    }
}
