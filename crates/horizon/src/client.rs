use chrono::{DateTime, Duration, Utc};
use reqwest::{header::DATE, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use token_setup_core::{PublicKey, TimeBounds, TransactionEnvelope, TransactionError};

use crate::resources::{AccountRecord, LedgerRecord, Page, Problem, ResultCodes, SubmitResponse};

/// Client for the subset of the Horizon REST API used to issue assets.
#[derive(Clone)]
pub struct HorizonClient {
    http: Client,
    base_url: Url,
}

impl HorizonClient {
    /// Creates a new client. A trailing slash is added to the base path so
    /// relative joins stay below it.
    pub fn new(mut base_url: Url, http: Client) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches the most recently closed ledger.
    pub async fn latest_ledger(&self) -> Result<LedgerRecord, HorizonError> {
        let mut url = self.base_url.join("ledgers")?;
        url.query_pairs_mut()
            .append_pair("order", "desc")
            .append_pair("limit", "1");

        let response = self.http.get(url).send().await?;
        let page: Page<LedgerRecord> = parse_json(response).await?;
        page.embedded
            .records
            .into_iter()
            .next()
            .ok_or(HorizonError::EmptyLedgers)
    }

    /// Loads an account document, including its current sequence number.
    pub async fn load_account(&self, account: &PublicKey) -> Result<AccountRecord, HorizonError> {
        let url = self
            .base_url
            .join(&format!("accounts/{}", account.account_id()))?;
        let response = self.http.get(url).send().await?;
        parse_json(response).await
    }

    /// Reads the server clock from the `Date` header of the root resource.
    pub async fn server_time(&self) -> Result<Option<DateTime<Utc>>, HorizonError> {
        let response = self.http.get(self.base_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response
            .headers()
            .get(DATE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
            .map(|value| value.with_timezone(&Utc)))
    }

    /// Time bounds expiring `timeout` after the server clock, or after the
    /// local clock when the server does not report one.
    pub async fn fetch_timebounds(&self, timeout: Duration) -> Result<TimeBounds, HorizonError> {
        let now = self.server_time().await?.unwrap_or_else(Utc::now);
        Ok(TimeBounds::expiring_after(now, timeout)?)
    }

    /// Submits a signed envelope and waits for it to be included in a ledger.
    pub async fn submit_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SubmitResponse, HorizonError> {
        let url = self.base_url.join("transactions")?;
        let encoded = envelope.to_xdr_base64();
        let response = self
            .http
            .post(url)
            .form(&[("tx", encoded.as_str())])
            .send()
            .await?;

        parse_json(response).await
    }
}

/// Errors produced by the Horizon client.
#[derive(Debug, Error)]
pub enum HorizonError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("horizon returned {status}: {problem}")]
    Problem { status: StatusCode, problem: Problem },
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("horizon returned no ledgers")]
    EmptyLedgers,
    #[error("invalid time bounds: {0}")]
    TimeBounds(#[from] TransactionError),
}

impl HorizonError {
    /// Result codes of a rejected transaction, when Horizon reported them.
    pub fn result_codes(&self) -> Option<&ResultCodes> {
        match self {
            Self::Problem { problem, .. } => problem.result_codes(),
            _ => None,
        }
    }
}

async fn error_from_response(response: Response) -> HorizonError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<unavailable>"));
    match serde_json::from_str::<Problem>(&body) {
        Ok(problem) => HorizonError::Problem { status, problem },
        Err(_) => HorizonError::Status { status, body },
    }
}

async fn parse_json<T>(response: Response) -> Result<T, HorizonError>
where
    T: DeserializeOwned,
{
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use token_setup_core::{Account, Asset, Keypair, Network, Operation, TransactionBuilder};

    fn client(base_url: &Url) -> HorizonClient {
        HorizonClient::new(base_url.clone(), Client::builder().build().expect("client"))
    }

    fn envelope() -> TransactionEnvelope {
        let keypair = Keypair::from_seed([1u8; 32]);
        let issuer = Keypair::from_seed([2u8; 32]).public_key();
        let mut account = Account::new(keypair.public_key(), 10);
        let tx = TransactionBuilder::new(&mut account, 100)
            .time_bounds(TimeBounds {
                min_time: 0,
                max_time: 1_700_000_090,
            })
            .add_operation(Operation::change_trust(
                Asset::new("FXR", issuer).expect("asset"),
            ))
            .build()
            .expect("tx");
        let mut envelope = TransactionEnvelope::new(tx);
        envelope.sign(&keypair, &Network::new("Pi Testnet"));
        envelope
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = client(&Url::parse("https://horizon.example/api").expect("url"));
        assert_eq!(client.base_url().as_str(), "https://horizon.example/api/");
    }

    #[tokio::test]
    async fn latest_ledger_reads_base_fee() {
        let server = MockServer::start_async().await;
        let client = client(&Url::parse(&server.base_url()).expect("url"));

        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/ledgers")
                    .query_param("order", "desc")
                    .query_param("limit", "1");
                then.status(200).json_body(json!({
                    "_embedded": {
                        "records": [{
                            "sequence": 120,
                            "base_fee_in_stroops": 100000,
                            "base_reserve_in_stroops": 5000000
                        }]
                    }
                }));
            })
            .await;

        let ledger = client.latest_ledger().await.expect("ledger");
        mock.assert_async().await;
        assert_eq!(ledger.sequence, 120);
        assert_eq!(ledger.base_fee_in_stroops, 100_000);
        assert_eq!(ledger.base_reserve_in_stroops, 5_000_000);
    }

    #[tokio::test]
    async fn empty_ledger_page_is_an_error() {
        let server = MockServer::start_async().await;
        let client = client(&Url::parse(&server.base_url()).expect("url"));

        server
            .mock_async(|when, then| {
                when.method(GET).path("/ledgers");
                then.status(200)
                    .json_body(json!({ "_embedded": { "records": [] } }));
            })
            .await;

        let err = client.latest_ledger().await.expect_err("should error");
        assert!(matches!(err, HorizonError::EmptyLedgers));
    }

    #[tokio::test]
    async fn load_account_parses_sequence_and_balances() {
        let server = MockServer::start_async().await;
        let client = client(&Url::parse(&server.url("/horizon")).expect("url"));
        let account = Keypair::from_seed([1u8; 32]).public_key();

        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/horizon/accounts/{}", account.account_id()));
                then.status(200).json_body(json!({
                    "id": account.account_id(),
                    "account_id": account.account_id(),
                    "sequence": "4294967296",
                    "home_domain": "example.com",
                    "balances": [
                        { "balance": "100.0000000", "asset_type": "native" }
                    ]
                }));
            })
            .await;

        let record = client.load_account(&account).await.expect("account");
        mock.assert_async().await;
        assert_eq!(record.sequence_number(), Some(4_294_967_296));
        assert_eq!(record.home_domain.as_deref(), Some("example.com"));
        assert_eq!(record.balances.len(), 1);
    }

    #[tokio::test]
    async fn missing_account_returns_problem() {
        let server = MockServer::start_async().await;
        let client = client(&Url::parse(&server.base_url()).expect("url"));
        let account = Keypair::from_seed([1u8; 32]).public_key();

        server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/accounts/");
                then.status(404).json_body(json!({
                    "type": "https://stellar.org/horizon-errors/not_found",
                    "title": "Resource Missing",
                    "status": 404,
                    "detail": "The resource at the url requested was not found."
                }));
            })
            .await;

        let err = client.load_account(&account).await.expect_err("should error");
        assert!(err.result_codes().is_none());
        match err {
            HorizonError::Problem { status, problem } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(problem.title, "Resource Missing");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_time_uses_date_header() {
        let server = MockServer::start_async().await;
        let client = client(&Url::parse(&server.base_url()).expect("url"));

        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200)
                    .header("Date", "Tue, 14 Nov 2023 22:13:20 GMT")
                    .json_body(json!({ "horizon_version": "2.27.0" }));
            })
            .await;

        let bounds = client
            .fetch_timebounds(Duration::seconds(90))
            .await
            .expect("timebounds");
        assert_eq!(bounds.min_time, 0);
        assert_eq!(bounds.max_time, 1_700_000_090);
    }

    #[tokio::test]
    async fn unparsable_date_falls_back_to_local_clock() {
        let server = MockServer::start_async().await;
        let client = client(&Url::parse(&server.base_url()).expect("url"));

        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200)
                    .header("Date", "not-a-date")
                    .json_body(json!({ "horizon_version": "2.27.0" }));
            })
            .await;

        assert_eq!(client.server_time().await.expect("server time"), None);

        let before = Utc::now().timestamp() as u64;
        let bounds = client
            .fetch_timebounds(Duration::seconds(90))
            .await
            .expect("timebounds");
        let after = Utc::now().timestamp() as u64;
        assert_eq!(bounds.min_time, 0);
        assert!(bounds.max_time >= before + 90);
        assert!(bounds.max_time <= after + 90);
    }

    #[tokio::test]
    async fn timebounds_overflow_is_an_error() {
        let server = MockServer::start_async().await;
        let client = client(&Url::parse(&server.base_url()).expect("url"));

        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200)
                    .header("Date", "Tue, 14 Nov 2023 22:13:20 GMT")
                    .json_body(json!({}));
            })
            .await;

        let timeout = Duration::try_seconds(10_000_000_000_000).expect("duration in range");
        let err = client
            .fetch_timebounds(timeout)
            .await
            .expect_err("expiry overflows");
        assert!(matches!(
            err,
            HorizonError::TimeBounds(TransactionError::TimeBoundsOverflow)
        ));
    }

    #[tokio::test]
    async fn submit_posts_form_encoded_envelope() {
        let server = MockServer::start_async().await;
        let client = client(&Url::parse(&server.base_url()).expect("url"));
        let envelope = envelope();
        let hash = envelope.hash_hex(&Network::new("Pi Testnet"));

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/transactions")
                    .body_contains("tx=AAAAAgAAAAC");
                then.status(200).json_body(json!({
                    "hash": hash,
                    "ledger": 121,
                    "successful": true
                }));
            })
            .await;

        let response = client
            .submit_transaction(&envelope)
            .await
            .expect("submit");
        mock.assert_async().await;
        assert_eq!(response.hash, hash);
        assert_eq!(response.ledger, 121);
    }

    #[tokio::test]
    async fn rejected_submission_carries_result_codes() {
        let server = MockServer::start_async().await;
        let client = client(&Url::parse(&server.base_url()).expect("url"));

        server
            .mock_async(|when, then| {
                when.method(POST).path("/transactions");
                then.status(400).json_body(json!({
                    "type": "https://stellar.org/horizon-errors/transaction_failed",
                    "title": "Transaction Failed",
                    "status": 400,
                    "extras": {
                        "result_codes": {
                            "transaction": "tx_failed",
                            "operations": ["op_low_reserve"]
                        }
                    }
                }));
            })
            .await;

        let err = client
            .submit_transaction(&envelope())
            .await
            .expect_err("should error");
        let codes = err.result_codes().expect("result codes");
        assert_eq!(codes.transaction, "tx_failed");
        assert_eq!(codes.operations, vec!["op_low_reserve".to_string()]);
    }

    #[tokio::test]
    async fn non_problem_error_body_is_kept_raw() {
        let server = MockServer::start_async().await;
        let client = client(&Url::parse(&server.base_url()).expect("url"));

        server
            .mock_async(|when, then| {
                when.method(GET).path("/ledgers");
                then.status(502).body("bad gateway");
            })
            .await;

        let err = client.latest_ledger().await.expect_err("should error");
        match err {
            HorizonError::Status { status, body } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
