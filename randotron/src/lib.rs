//! A fleet of bots that play nullspace casino games.
//!
//! Each bot owns an ed25519 identity and a nonce sequence, picks games from a
//! randomized [planner::Profile], encodes every step of its plan into a
//! signed transaction, and submits the steps one at a time. A failed
//! submission resynchronizes the nonce from the ledger before the bot tries
//! again on its next tick.
//!
//! [orchestrator::Orchestrator] owns the population and exposes aggregate
//! progress through a [status::Monitor].

pub mod agent;
pub mod config;
pub mod ledger;
pub mod orchestrator;
pub mod payload;
pub mod planner;
pub mod sequence;
pub mod status;


pub use config::{Config, FleetConfig};
pub use ledger::Ledger;
pub use orchestrator::{Orchestrator, TournamentContext};
pub use status::{FleetStatus, Monitor};

use thiserror::Error;

pub const SEED_LENGTH: usize = 32;

#[derive(Error, Debug)]
pub enum Error {
    #[error("ledger error: {0}")]
    Ledger(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("invalid config: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn ledger(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Ledger(Box::new(err))
    }
}
