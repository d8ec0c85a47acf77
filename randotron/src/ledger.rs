use nullspace_types::execution::{PublicKey, Transaction};
use std::future::Future;
#[cfg(test)]
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

/// The remote ledger as seen by a bot.
pub trait Ledger: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Submit one signed transaction. Any error means it was not accepted.
    fn submit(&self, tx: Transaction) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Number of transactions the ledger has accepted from `public`, or
    /// `None` if it has never seen the account.
    fn account_nonce(
        &self,
        public: &PublicKey,
    ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send;
}

impl Ledger for nullspace_client::Client {
    type Error = nullspace_client::Error;

    async fn submit(&self, tx: Transaction) -> Result<(), Self::Error> {
        self.submit_transactions(vec![tx]).await
    }

    async fn account_nonce(&self, public: &PublicKey) -> Result<Option<u64>, Self::Error> {
        Ok(self
            .query_account(public)
            .await?
            .map(|account| account.nonce))
    }
}

#[cfg(test)]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    #[error("unavailable")]
    Unavailable,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch { expected: u64, got: u64 },
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    nonces: HashMap<PublicKey, u64>,
    accepted: Vec<Transaction>,
    attempts: usize,
    queries: usize,
    fail_submissions: usize,
    fail_at: HashSet<(PublicKey, u64)>,
    fail_queries: bool,
}

/// An in-memory ledger that enforces nonce ordering.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct Mock {
    state: Arc<Mutex<MockState>>,
}

#[cfg(test)]
impl Mock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` submissions regardless of content.
    pub fn fail_submissions(&self, count: usize) {
        self.state.lock().unwrap().fail_submissions = count;
    }

    /// Fail the first submission from `public` at `nonce`.
    pub fn fail_at(&self, public: PublicKey, nonce: u64) {
        self.state.lock().unwrap().fail_at.insert((public, nonce));
    }

    pub fn fail_queries(&self, fail: bool) {
        self.state.lock().unwrap().fail_queries = fail;
    }

    /// Pretend `public` has had `nonce` transactions accepted elsewhere.
    pub fn set_nonce(&self, public: PublicKey, nonce: u64) {
        self.state.lock().unwrap().nonces.insert(public, nonce);
    }

    pub fn nonce(&self, public: &PublicKey) -> Option<u64> {
        self.state.lock().unwrap().nonces.get(public).copied()
    }

    pub fn accepted(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().accepted.clone()
    }

    pub fn accepted_from(&self, public: &PublicKey) -> Vec<Transaction> {
        self.state
            .lock()
            .unwrap()
            .accepted
            .iter()
            .filter(|tx| &tx.public == public)
            .cloned()
            .collect()
    }

    /// Submissions received, accepted or not.
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    pub fn queries(&self) -> usize {
        self.state.lock().unwrap().queries
    }
}

#[cfg(test)]
impl Ledger for Mock {
    type Error = MockError;

    async fn submit(&self, tx: Transaction) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;
        if state.fail_submissions > 0 {
            state.fail_submissions -= 1;
            return Err(MockError::Unavailable);
        }
        if state.fail_at.remove(&(tx.public, tx.nonce)) {
            return Err(MockError::Unavailable);
        }
        if !tx.verify() {
            return Err(MockError::InvalidSignature);
        }
        let expected = state.nonces.get(&tx.public).copied().unwrap_or(0);
        if tx.nonce != expected {
            return Err(MockError::NonceMismatch {
                expected,
                got: tx.nonce,
            });
        }
        state.nonces.insert(tx.public, expected + 1);
        state.accepted.push(tx);
        Ok(())
    }

    async fn account_nonce(&self, public: &PublicKey) -> Result<Option<u64>, Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.queries += 1;
        if state.fail_queries {
            return Err(MockError::Unavailable);
        }
        Ok(state.nonces.get(public).copied())
    }
}
