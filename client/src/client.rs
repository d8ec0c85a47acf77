use crate::{Error, Result};
use bytes::Bytes;
use nullspace_types::{
    api::{decode_lookup, state_query, wrap_transaction_submission, Lookup},
    execution::{Account, Key, PublicKey, Transaction, Value},
};
use rand::Rng;
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry behavior for HTTP requests.
///
/// Only idempotent requests are retried unless `retry_non_idempotent` is set:
/// replaying a submission can land the same nonce twice.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub retry_non_idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            retry_non_idempotent: false,
        }
    }
}

impl RetryPolicy {
    fn attempts_for(&self, method: &Method) -> usize {
        let idempotent = *method == Method::GET || *method == Method::HEAD;
        if idempotent || self.retry_non_idempotent {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

fn retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

/// "Equal jitter": delay is in [backoff/2, backoff].
pub(crate) fn jittered_backoff(rng: &mut impl Rng, backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }
    let half_ms = backoff_ms / 2;
    let jitter_ms = rng.gen_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

/// HTTP client for a ledger node's `/submit` and `/state` endpoints.
#[derive(Clone)]
pub struct Client {
    pub base_url: Url,
    http: reqwest::Client,
    retry_policy: RetryPolicy,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url,
            http,
            retry_policy: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Submit signed transactions. Any non-2xx response is an error.
    pub async fn submit_transactions(&self, txs: Vec<Transaction>) -> Result<()> {
        if txs.len() > nullspace_types::api::MAX_SUBMISSION_TRANSACTIONS {
            return Err(Error::TooManyTransactions {
                max: nullspace_types::api::MAX_SUBMISSION_TRANSACTIONS,
                got: txs.len(),
            });
        }
        let body = wrap_transaction_submission(txs)?;
        let url = self.base_url.join("submit")?;
        self.post_bytes_with_retry(url, Bytes::from(body)).await?;
        Ok(())
    }

    /// Fetch the latest value stored under `key`, or `None` if the ledger has
    /// never written it.
    pub async fn query_state(&self, key: &Key) -> Result<Option<Lookup>> {
        let url = self.base_url.join(&format!("state/{}", state_query(key)))?;
        let response = self.get_with_retry(url).await?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Ok(None),
            status => return Err(Error::Failed(status)),
        }
        let body = response.bytes().await?;
        Ok(Some(decode_lookup(key, &body)?))
    }

    /// Fetch an account's nonce record.
    pub async fn query_account(&self, public: &PublicKey) -> Result<Option<Account>> {
        let Some(lookup) = self.query_state(&Key::Account(*public)).await? else {
            return Ok(None);
        };
        match lookup.value {
            Value::Account(account) => Ok(Some(account)),
        }
    }

    /// GET `url`, retrying transport errors and retryable statuses. The last
    /// response is returned as-is so callers can interpret its status.
    pub async fn get_with_retry(&self, url: Url) -> Result<reqwest::Response> {
        self.send_with_retry(Method::GET, url, None).await
    }

    /// POST `body` to `url`. Non-2xx responses become
    /// [`Error::FailedWithBody`].
    pub async fn post_bytes_with_retry(&self, url: Url, body: Bytes) -> Result<reqwest::Response> {
        let response = self
            .send_with_retry(Method::POST, url.clone(), Some(body))
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(Error::FailedWithBody {
            status,
            body: format!("POST {url} returned {status}: {text}"),
        })
    }

    async fn send_with_retry(
        &self,
        method: Method,
        url: Url,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response> {
        let attempts = self.retry_policy.attempts_for(&method);
        let mut backoff = self.retry_policy.initial_backoff;
        let mut attempt = 1;
        loop {
            let mut request = self.http.request(method.clone(), url.clone());
            if let Some(body) = &body {
                request = request.body(body.clone());
            }
            let last = attempt >= attempts;
            match request.send().await {
                Ok(response) if last || !retryable_status(response.status()) => {
                    return Ok(response);
                }
                Ok(response) => {
                    debug!(%url, %method, attempt, status = %response.status(), "retrying request");
                }
                Err(err) if last || !retryable_error(&err) => return Err(err.into()),
                Err(err) => {
                    warn!(%url, %method, attempt, ?err, "request failed, retrying");
                }
            }

            let delay = jittered_backoff(&mut rand::thread_rng(), backoff);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            backoff = backoff
                .saturating_mul(2)
                .min(self.retry_policy.max_backoff);
            attempt += 1;
        }
    }
}
