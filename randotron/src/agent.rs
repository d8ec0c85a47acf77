//! A single bot and its play loop.
//!
//! An agent submits at most one transaction at a time and awaits its result
//! before doing anything else. A rejected or failed submission never advances
//! the nonce: the agent resyncs from the ledger and abandons the rest of the
//! game.

use crate::{
    ledger::Ledger,
    payload::{self, EncodeError},
    planner::{self, Plan, Profile},
    sequence::{Resync, Sequence},
    status::Reporter,
    Error,
};
use nullspace_types::{
    execution::{Instruction, PrivateKey, PublicKey, Transaction},
    GameType,
};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Spacing between the session ids of two agents.
pub const SESSIONS_PER_AGENT: u64 = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Starting,
    /// Submitting the move at this index of the plan.
    Submitting(usize),
    Resyncing,
}

/// What happened to the nonce after a failed submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResyncOutcome {
    Synced(Resync),
    /// The query failed; the stale nonce is kept until the next tick.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    /// Step `step` (0 is the start, `i + 1` is move `i`) was not accepted.
    Rejected { step: usize, resync: ResyncOutcome },
    /// Step `step` failed to encode and nothing was sent for the tick.
    Invalid { step: usize, error: EncodeError },
    /// The agent was deactivated before step `step`.
    Stopped { step: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub game: GameType,
    pub session_id: u64,
    /// Transactions accepted during the tick.
    pub submitted: usize,
    pub outcome: TickOutcome,
}

pub struct Agent<L: Ledger> {
    id: u64,
    name: String,
    private: PrivateKey,
    public: PublicKey,
    sequence: Sequence,
    sessions: u64,
    profile: Profile,
    active: Arc<AtomicBool>,
    state: AgentState,
    rng: ChaCha20Rng,
    ledger: L,
    reporter: Reporter,
}

impl<L: Ledger> Agent<L> {
    pub(crate) fn new(
        id: u64,
        private: PrivateKey,
        profile: Profile,
        rng: ChaCha20Rng,
        ledger: L,
        reporter: Reporter,
    ) -> Self {
        let public = private.public_key();
        Self {
            id,
            name: format!("Bot{:04}", id),
            private,
            public,
            sequence: Sequence::new(),
            sessions: 0,
            profile,
            active: Arc::new(AtomicBool::new(true)),
            state: AgentState::Idle,
            rng,
            ledger,
            reporter,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn nonce(&self) -> u64 {
        self.sequence.current()
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Shared flag the orchestrator clears to stop this agent.
    pub fn active_flag(&self) -> Arc<AtomicBool> {
        self.active.clone()
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    fn next_session_id(&mut self) -> u64 {
        self.sessions += 1;
        self.id * SESSIONS_PER_AGENT + self.sessions
    }

    /// Load the nonce from the ledger, registering the account first if the
    /// ledger has never seen it.
    pub async fn bootstrap(&mut self) -> Result<(), Error> {
        match self
            .ledger
            .account_nonce(&self.public)
            .await
            .map_err(Error::ledger)?
        {
            Some(nonce) => {
                self.sequence.resync(nonce);
                debug!(agent = %self.name, nonce, "loaded existing account");
            }
            None => {
                let register = Instruction::CasinoRegister {
                    name: self.name.clone(),
                };
                let tx = Transaction::sign(&self.private, 0, register);
                self.ledger.submit(tx).await.map_err(Error::ledger)?;
                self.sequence.registered();
                self.reporter.record_submitted();
                debug!(agent = %self.name, "registered");
            }
        }
        Ok(())
    }

    /// Join a tournament at the current nonce.
    pub async fn join_tournament(&mut self, tournament_id: u64) -> Result<(), Error> {
        let instruction = Instruction::CasinoJoinTournament { tournament_id };
        if let Err(err) = self.submit(instruction).await {
            self.resync().await;
            return Err(Error::ledger(err));
        }
        info!(agent = %self.name, tournament_id, "joined tournament");
        Ok(())
    }

    async fn submit(&mut self, instruction: Instruction) -> Result<(), L::Error> {
        let nonce = self.sequence.current();
        let tx = Transaction::sign(&self.private, nonce, instruction);
        self.ledger.submit(tx).await?;
        self.sequence.confirm();
        self.reporter.record_submitted();
        Ok(())
    }

    /// Replace the local nonce with the ledger's.
    pub async fn resync(&mut self) -> ResyncOutcome {
        self.state = AgentState::Resyncing;
        let outcome = match self.ledger.account_nonce(&self.public).await {
            Ok(nonce) => {
                let resync = self.sequence.resync(nonce.unwrap_or(0));
                if resync.regressed() {
                    warn!(agent = %self.name, from = resync.from, to = resync.to, "nonce moved backwards");
                } else {
                    debug!(agent = %self.name, from = resync.from, to = resync.to, "resynced nonce");
                }
                ResyncOutcome::Synced(resync)
            }
            Err(err) => {
                warn!(agent = %self.name, nonce = self.sequence.current(), ?err, "resync failed");
                ResyncOutcome::Failed
            }
        };
        self.state = AgentState::Idle;
        outcome
    }

    /// Choose a game, plan it, and play it.
    pub async fn tick(&mut self) -> TickReport {
        let game = planner::choose_game(&self.profile, &mut self.rng);
        let plan = planner::plan(&self.profile, game, &mut self.rng);
        self.execute(plan).await
    }

    /// Submit every step of `plan` in order, stopping at the first step that
    /// is not accepted. The whole plan is encoded up front, so a step that
    /// fails to encode means nothing is sent for the tick.
    pub async fn execute(&mut self, plan: Plan) -> TickReport {
        let session_id = self.next_session_id();
        let game = plan.game;

        let mut submitted = 0;
        let outcome = match encode_plan(&plan, session_id) {
            Err((step, error)) => {
                warn!(agent = %self.name, %game, session = session_id, step, %error, "dropping unencodable plan");
                TickOutcome::Invalid { step, error }
            }
            Ok(steps) => {
                let mut outcome = TickOutcome::Completed;
                for (step, instruction) in steps.into_iter().enumerate() {
                    if !self.is_active() {
                        outcome = TickOutcome::Stopped { step };
                        break;
                    }
                    self.state = match step {
                        0 => AgentState::Starting,
                        i => AgentState::Submitting(i - 1),
                    };
                    if let Err(err) = self.submit(instruction).await {
                        warn!(agent = %self.name, %game, session = session_id, step, nonce = self.sequence.current(), ?err, "submission failed");
                        let resync = self.resync().await;
                        outcome = TickOutcome::Rejected { step, resync };
                        break;
                    }
                    submitted += 1;
                }
                outcome
            }
        };
        self.state = AgentState::Idle;

        debug!(agent = %self.name, %game, session = session_id, submitted, ?outcome, "tick finished");
        TickReport {
            game,
            session_id,
            submitted,
            outcome,
        }
    }

    /// Play until deactivated or until `shutdown` changes.
    ///
    /// The first tick fires after a random delay in `[0, interval)`; later
    /// ticks wait `interval`, or `interval × U(0.5, 1.5)` when `randomize`.
    pub async fn run(
        mut self,
        interval: Duration,
        randomize: bool,
        mut shutdown: watch::Receiver<u64>,
    ) {
        let interval_ms = interval.as_millis() as u64;
        let mut delay = if interval_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(self.rng.gen_range(0..interval_ms))
        };

        while self.is_active() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = shutdown.changed() => break,
            }
            if !self.is_active() {
                break;
            }

            self.tick().await;
            delay = next_delay(&mut self.rng, interval, randomize);
        }
        debug!(agent = %self.name, nonce = self.sequence.current(), "agent stopped");
    }
}

/// Encode the start and every move of `plan`, or report the first step that
/// cannot be encoded.
fn encode_plan(plan: &Plan, session_id: u64) -> Result<Vec<Instruction>, (usize, EncodeError)> {
    let mut steps = Vec::with_capacity(plan.moves.len() + 1);
    steps.push(
        payload::start_game(plan.game, plan.starting_bet, session_id).map_err(|err| (0, err))?,
    );
    for (index, action) in plan.moves.iter().enumerate() {
        steps.push(
            payload::game_move(plan.game, session_id, action).map_err(|err| (index + 1, err))?,
        );
    }
    Ok(steps)
}

/// Delay before the next tick.
pub fn next_delay(rng: &mut impl Rng, interval: Duration, randomize: bool) -> Duration {
    if randomize {
        interval.mul_f64(rng.gen_range(0.5..1.5))
    } else {
        interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ledger::Mock,
        payload::{Action, RouletteBet, Signal, TableBet},
        status::Reporter,
    };
    use rand::SeedableRng;

    fn agent(id: u64, ledger: &Mock) -> Agent<Mock> {
        let mut rng = ChaCha20Rng::seed_from_u64(id);
        let private = PrivateKey::from_rng(&mut rng);
        let profile = Profile::random(&mut rng);
        let (reporter, _) = Reporter::new();
        Agent::new(id, private, profile, rng, ledger.clone(), reporter)
    }

    fn roulette_plan(amount: u64) -> Plan {
        Plan {
            game: GameType::Roulette,
            starting_bet: 0,
            moves: vec![
                Action::TableBet {
                    bet: TableBet::Roulette(RouletteBet::Red),
                    amount,
                },
                Action::Signal(Signal::RouletteSpin),
            ],
        }
    }

    #[tokio::test]
    async fn test_bootstrap_registers_new_account() {
        let ledger = Mock::new();
        let mut agent = agent(7, &ledger);
        assert_eq!(agent.name(), "Bot0007");

        agent.bootstrap().await.unwrap();
        assert_eq!(agent.nonce(), 1);

        let accepted = ledger.accepted();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].nonce, 0);
        assert_eq!(
            accepted[0].instruction,
            Instruction::CasinoRegister {
                name: "Bot0007".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_bootstrap_loads_known_account() {
        let ledger = Mock::new();
        let mut agent = agent(1, &ledger);
        ledger.set_nonce(*agent.public_key(), 42);

        agent.bootstrap().await.unwrap();
        assert_eq!(agent.nonce(), 42);
        assert!(ledger.accepted().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_query_failure() {
        let ledger = Mock::new();
        ledger.fail_queries(true);
        let mut agent = agent(1, &ledger);
        assert!(matches!(agent.bootstrap().await, Err(Error::Ledger(_))));
        assert_eq!(agent.nonce(), 0);
    }

    #[tokio::test]
    async fn test_successful_ticks_advance_by_submissions() {
        let ledger = Mock::new();
        let mut agent = agent(2, &ledger);
        agent.bootstrap().await.unwrap();

        let mut total = 0;
        for _ in 0..20 {
            let before = agent.nonce();
            let report = agent.tick().await;
            assert_eq!(report.outcome, TickOutcome::Completed);
            assert_eq!(agent.nonce(), before + report.submitted as u64);
            total += report.submitted;
        }
        assert_eq!(agent.nonce(), 1 + total as u64);
        assert_eq!(ledger.nonce(agent.public_key()), Some(agent.nonce()));
        assert_eq!(agent.state(), AgentState::Idle);
    }

    #[tokio::test]
    async fn test_session_ids_unique_and_spaced() {
        let ledger = Mock::new();
        let mut agent = agent(3, &ledger);
        agent.bootstrap().await.unwrap();

        let first = agent.tick().await.session_id;
        let second = agent.tick().await.session_id;
        assert_eq!(first, 3 * SESSIONS_PER_AGENT + 1);
        assert_eq!(second, first + 1);
    }

    #[tokio::test]
    async fn test_failed_start_resyncs_and_skips_moves() {
        let ledger = Mock::new();
        let mut agent = agent(4, &ledger);
        agent.bootstrap().await.unwrap();
        ledger.fail_submissions(1);

        let report = agent.execute(roulette_plan(25)).await;
        assert_eq!(
            report.outcome,
            TickOutcome::Rejected {
                step: 0,
                resync: ResyncOutcome::Synced(Resync { from: 1, to: 1 })
            }
        );
        assert_eq!(report.submitted, 0);
        assert_eq!(agent.nonce(), 1);
        // register + failed start, no moves
        assert_eq!(ledger.attempts(), 2);
        assert_eq!(ledger.queries(), 2);
    }

    #[tokio::test]
    async fn test_failed_move_abandons_rest() {
        let ledger = Mock::new();
        let mut agent = agent(5, &ledger);
        agent.bootstrap().await.unwrap();
        // start lands at nonce 1, the bet at nonce 2 fails
        ledger.fail_at(*agent.public_key(), 2);

        let report = agent.execute(roulette_plan(25)).await;
        assert_eq!(report.submitted, 1);
        assert!(matches!(
            report.outcome,
            TickOutcome::Rejected {
                step: 1,
                resync: ResyncOutcome::Synced(Resync { from: 2, to: 2 })
            }
        ));
        assert_eq!(ledger.accepted_from(agent.public_key()).len(), 2);
        assert_eq!(ledger.attempts(), 3);
    }

    #[tokio::test]
    async fn test_resync_adopts_ledger_nonce() {
        let ledger = Mock::new();
        let mut agent = agent(6, &ledger);
        agent.bootstrap().await.unwrap();
        // Another writer advanced the account.
        ledger.set_nonce(*agent.public_key(), 9);

        let report = agent.execute(roulette_plan(10)).await;
        assert_eq!(
            report.outcome,
            TickOutcome::Rejected {
                step: 0,
                resync: ResyncOutcome::Synced(Resync { from: 1, to: 9 })
            }
        );
        assert_eq!(agent.nonce(), 9);

        let report = agent.execute(roulette_plan(10)).await;
        assert_eq!(report.outcome, TickOutcome::Completed);
        assert_eq!(agent.nonce(), 12);
    }

    #[tokio::test]
    async fn test_resync_failure_keeps_stale_nonce() {
        let ledger = Mock::new();
        let mut agent = agent(8, &ledger);
        agent.bootstrap().await.unwrap();
        ledger.fail_submissions(1);
        ledger.fail_queries(true);

        let report = agent.execute(roulette_plan(10)).await;
        assert_eq!(
            report.outcome,
            TickOutcome::Rejected {
                step: 0,
                resync: ResyncOutcome::Failed
            }
        );
        assert_eq!(agent.nonce(), 1);

        // The next tick retries with the same nonce.
        ledger.fail_queries(false);
        let report = agent.execute(roulette_plan(10)).await;
        assert_eq!(report.outcome, TickOutcome::Completed);
    }

    #[tokio::test]
    async fn test_encode_error_sends_nothing() {
        let ledger = Mock::new();
        let mut agent = agent(9, &ledger);
        agent.bootstrap().await.unwrap();
        let attempts = ledger.attempts();
        let queries = ledger.queries();

        let report = agent
            .execute(Plan {
                game: GameType::Blackjack,
                starting_bet: 0,
                moves: vec![Action::Signal(Signal::BlackjackDeal)],
            })
            .await;
        assert_eq!(
            report.outcome,
            TickOutcome::Invalid {
                step: 0,
                error: EncodeError::ZeroStartingBet(GameType::Blackjack)
            }
        );

        // A zero bet later in the plan keeps the start from being sent too.
        let report = agent.execute(roulette_plan(0)).await;
        assert_eq!(
            report.outcome,
            TickOutcome::Invalid {
                step: 1,
                error: EncodeError::InvalidAmount
            }
        );
        assert_eq!(report.submitted, 0);
        assert_eq!(ledger.attempts(), attempts);
        assert_eq!(ledger.queries(), queries);
        assert_eq!(agent.nonce(), 1);
    }

    #[tokio::test]
    async fn test_inactive_agent_sends_nothing() {
        let ledger = Mock::new();
        let mut agent = agent(10, &ledger);
        agent.bootstrap().await.unwrap();
        agent.deactivate();

        let report = agent.execute(roulette_plan(10)).await;
        assert_eq!(report.outcome, TickOutcome::Stopped { step: 0 });
        assert_eq!(ledger.attempts(), 1);
    }

    #[tokio::test]
    async fn test_join_tournament() {
        let ledger = Mock::new();
        let mut agent = agent(11, &ledger);
        agent.bootstrap().await.unwrap();
        agent.join_tournament(3).await.unwrap();
        assert_eq!(agent.nonce(), 2);
        assert_eq!(
            ledger.accepted()[1].instruction,
            Instruction::CasinoJoinTournament { tournament_id: 3 }
        );

        ledger.fail_submissions(1);
        assert!(agent.join_tournament(4).await.is_err());
        assert_eq!(agent.nonce(), 2);
    }

    #[test]
    fn test_next_delay_bounds() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let interval = Duration::from_millis(1_000);
        assert_eq!(next_delay(&mut rng, interval, false), interval);
        for _ in 0..1_000 {
            let delay = next_delay(&mut rng, interval, true);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay < Duration::from_millis(1_500));
        }
    }
}
