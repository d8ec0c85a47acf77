//! Population lifecycle.
//!
//! The orchestrator is an explicit handle: create it with a ledger, prepare
//! agents, start them, and stop them. Every `stop()` bumps a generation
//! counter so that a `prepare()` still in flight cannot add agents to a
//! population that has already been torn down.

use crate::{
    agent::Agent,
    config::FleetConfig,
    ledger::Ledger,
    planner::Profile,
    status::{FleetStatus, Monitor, Reporter},
    Error, SEED_LENGTH,
};
use futures::future::join_all;
use nullspace_types::execution::PrivateKey;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

/// Pause between agent creations during `prepare()`.
pub const DEFAULT_CREATION_DELAY: Duration = Duration::from_millis(50);

/// Tournament every prepared agent should join.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TournamentContext {
    pub id: u64,
}

struct Population<L: Ledger> {
    prepared: Vec<Agent<L>>,
    running: Vec<(Arc<AtomicBool>, JoinHandle<()>)>,
}

impl<L: Ledger> Population<L> {
    fn len(&self) -> usize {
        self.prepared.len() + self.running.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Orchestrator<L: Ledger> {
    ledger: L,
    config: Mutex<FleetConfig>,
    creation_delay: Duration,

    generation: AtomicU64,
    next_id: AtomicU64,
    rng: Mutex<ChaCha20Rng>,

    population: Mutex<Population<L>>,
    detached: Mutex<Vec<JoinHandle<()>>>,
    shutdown: watch::Sender<u64>,
    reporter: Reporter,
}

impl<L: Ledger> Orchestrator<L> {
    /// Create an orchestrator with no agents. Keys, profiles, and per-agent
    /// randomness are all derived from `seed`.
    pub fn new(ledger: L, config: FleetConfig, seed: [u8; SEED_LENGTH]) -> (Self, Monitor) {
        let (reporter, monitor) = Reporter::new();
        let (shutdown, _) = watch::channel(0);
        let orchestrator = Self {
            ledger,
            config: Mutex::new(config),
            creation_delay: DEFAULT_CREATION_DELAY,
            generation: AtomicU64::new(0),
            next_id: AtomicU64::new(0),
            rng: Mutex::new(ChaCha20Rng::from_seed(seed)),
            population: Mutex::new(Population {
                prepared: Vec::new(),
                running: Vec::new(),
            }),
            detached: Mutex::new(Vec::new()),
            shutdown,
            reporter,
        };
        (orchestrator, monitor)
    }

    pub fn with_creation_delay(mut self, delay: Duration) -> Self {
        self.creation_delay = delay;
        self
    }

    pub fn config(&self) -> FleetConfig {
        lock(&self.config).clone()
    }

    /// Replace the config. Takes effect on the next `prepare()` or
    /// `start_playing()`; running agents keep their interval.
    pub fn set_config(&self, config: FleetConfig) -> Result<(), Error> {
        config.validate()?;
        *lock(&self.config) = config;
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn status(&self) -> FleetStatus {
        self.reporter.snapshot()
    }

    fn publish(&self, population: &Population<L>) {
        self.reporter
            .set_population(!population.running.is_empty(), population.len());
    }

    fn create_agent(&self) -> Agent<L> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut rng = lock(&self.rng);
        let private = PrivateKey::from_rng(&mut *rng);
        let profile = Profile::random(&mut *rng);
        let agent_rng = ChaCha20Rng::from_seed(rng.gen());
        Agent::new(
            id,
            private,
            profile,
            agent_rng,
            self.ledger.clone(),
            self.reporter.clone(),
        )
    }

    /// Create, register, and (optionally) enroll up to `population_size`
    /// agents. Agents that fail any step are dropped. Returns the number
    /// added, which is short if `stop()` ran in the meantime.
    pub async fn prepare(
        &self,
        population_size: usize,
        tournament: Option<TournamentContext>,
    ) -> usize {
        let generation = self.generation();
        let mut added = 0;
        for index in 0..population_size {
            if index > 0 && !self.creation_delay.is_zero() {
                tokio::time::sleep(self.creation_delay).await;
            }
            if self.generation() != generation {
                break;
            }

            let mut agent = self.create_agent();
            if let Err(err) = agent.bootstrap().await {
                warn!(agent = agent.name(), ?err, "failed to register agent");
                continue;
            }
            if let Some(tournament) = tournament {
                if let Err(err) = agent.join_tournament(tournament.id).await {
                    warn!(
                        agent = agent.name(),
                        tournament = tournament.id,
                        ?err,
                        "failed to join tournament"
                    );
                    continue;
                }
            }

            // Checked under the population lock so stop() cannot interleave.
            let mut population = lock(&self.population);
            if self.generation() != generation {
                agent.deactivate();
                break;
            }
            debug!(agent = agent.name(), nonce = agent.nonce(), "prepared agent");
            population.prepared.push(agent);
            self.publish(&population);
            added += 1;
        }

        if self.generation() != generation {
            info!(added, requested = population_size, "prepare superseded by stop");
        } else {
            info!(added, requested = population_size, "prepared agents");
        }
        added
    }

    /// Spawn a play loop for every prepared agent. Returns the number
    /// started.
    pub fn start_playing(&self) -> usize {
        let config = self.config();
        if !config.enabled {
            warn!("fleet disabled, not starting agents");
            return 0;
        }
        let interval = config.interval();

        let mut population = lock(&self.population);
        let agents = std::mem::take(&mut population.prepared);
        let started = agents.len();
        for agent in agents {
            let active = agent.active_flag();
            let handle = tokio::spawn(agent.run(
                interval,
                config.randomize_interval,
                self.shutdown.subscribe(),
            ));
            population.running.push((active, handle));
        }
        self.publish(&population);
        info!(
            started,
            interval_ms = config.interval_ms,
            randomize = config.randomize_interval,
            "started agents"
        );
        started
    }

    /// Deactivate every agent, cancel their timers, and clear the
    /// population. Calling it again is harmless.
    pub fn stop(&self) {
        let mut population = lock(&self.population);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        for agent in population.prepared.drain(..) {
            agent.deactivate();
        }
        let handles: Vec<_> = population
            .running
            .drain(..)
            .map(|(active, handle)| {
                active.store(false, Ordering::Release);
                handle
            })
            .collect();
        let stopped = handles.len();
        self.shutdown.send_replace(generation);
        lock(&self.detached).extend(handles);

        self.publish(&population);
        debug!(generation, stopped, "stopped agents");
    }

    /// Wait for every agent task stopped so far to exit. A submission that
    /// was in flight during `stop()` completes first.
    pub async fn join(&self) {
        let handles = std::mem::take(&mut *lock(&self.detached));
        for result in join_all(handles).await {
            if let Err(err) = result {
                warn!(?err, "agent task failed");
            }
        }
    }
}

impl<L: Ledger> Drop for Orchestrator<L> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Mock;
    use nullspace_types::execution::Instruction;
    use std::collections::HashSet;

    fn orchestrator(ledger: &Mock) -> (Orchestrator<Mock>, Monitor) {
        let (orchestrator, monitor) =
            Orchestrator::new(ledger.clone(), FleetConfig::default(), [7; SEED_LENGTH]);
        (orchestrator.with_creation_delay(Duration::ZERO), monitor)
    }

    #[tokio::test]
    async fn test_prepare_registers_distinct_agents() {
        let ledger = Mock::new();
        let (orchestrator, monitor) = orchestrator(&ledger);

        assert_eq!(orchestrator.prepare(5, None).await, 5);
        let accepted = ledger.accepted();
        assert_eq!(accepted.len(), 5);
        let keys: HashSet<_> = accepted.iter().map(|tx| tx.public).collect();
        assert_eq!(keys.len(), 5);
        let names: Vec<_> = accepted
            .iter()
            .map(|tx| match &tx.instruction {
                Instruction::CasinoRegister { name } => name.clone(),
                other => panic!("unexpected instruction {other:?}"),
            })
            .collect();
        assert_eq!(names, ["Bot0001", "Bot0002", "Bot0003", "Bot0004", "Bot0005"]);

        let status = monitor.snapshot();
        assert!(!status.is_running);
        assert_eq!(status.active_agents, 5);
        assert_eq!(status.total_submitted, 5);
    }

    #[tokio::test]
    async fn test_same_seed_same_keys() {
        let first = Mock::new();
        let second = Mock::new();
        orchestrator(&first).0.prepare(3, None).await;
        orchestrator(&second).0.prepare(3, None).await;

        let keys = |ledger: &Mock| ledger.accepted().iter().map(|tx| tx.public).collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));
    }

    #[tokio::test]
    async fn test_prepare_skips_failed_agents() {
        let ledger = Mock::new();
        let (orchestrator, monitor) = orchestrator(&ledger);
        ledger.fail_submissions(2);

        assert_eq!(orchestrator.prepare(4, None).await, 2);
        assert_eq!(monitor.snapshot().active_agents, 2);
        assert_eq!(ledger.accepted().len(), 2);
    }

    #[tokio::test]
    async fn test_prepare_joins_tournament() {
        let ledger = Mock::new();
        let (orchestrator, _monitor) = orchestrator(&ledger);

        let added = orchestrator
            .prepare(2, Some(TournamentContext { id: 9 }))
            .await;
        assert_eq!(added, 2);
        let joins = ledger
            .accepted()
            .into_iter()
            .filter(|tx| {
                tx.nonce == 1
                    && tx.instruction == Instruction::CasinoJoinTournament { tournament_id: 9 }
            })
            .count();
        assert_eq!(joins, 2);
    }

    #[tokio::test]
    async fn test_ids_continue_after_stop() {
        let ledger = Mock::new();
        let (orchestrator, _monitor) = orchestrator(&ledger);
        orchestrator.prepare(2, None).await;
        orchestrator.stop();
        orchestrator.prepare(1, None).await;

        let last = ledger.accepted().pop().unwrap();
        assert_eq!(
            last.instruction,
            Instruction::CasinoRegister {
                name: "Bot0003".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_set_config_validates() {
        let ledger = Mock::new();
        let (orchestrator, _monitor) = orchestrator(&ledger);

        let invalid = FleetConfig {
            interval_ms: 0,
            ..FleetConfig::default()
        };
        assert!(matches!(
            orchestrator.set_config(invalid),
            Err(Error::Config(_))
        ));

        let updated = FleetConfig {
            population_size: 3,
            ..FleetConfig::default()
        };
        orchestrator.set_config(updated.clone()).unwrap();
        assert_eq!(orchestrator.config(), updated);
    }

    #[tokio::test]
    async fn test_disabled_fleet_does_not_start() {
        let ledger = Mock::new();
        let (orchestrator, monitor) = orchestrator(&ledger);
        orchestrator
            .set_config(FleetConfig {
                enabled: false,
                ..FleetConfig::default()
            })
            .unwrap();
        orchestrator.prepare(2, None).await;

        assert_eq!(orchestrator.start_playing(), 0);
        assert!(!monitor.snapshot().is_running);
        assert_eq!(monitor.snapshot().active_agents, 2);
    }

    #[tokio::test]
    async fn test_stop_bumps_generation() {
        let ledger = Mock::new();
        let (orchestrator, _monitor) = orchestrator(&ledger);
        assert_eq!(orchestrator.generation(), 0);
        orchestrator.stop();
        orchestrator.stop();
        assert_eq!(orchestrator.generation(), 2);
        assert_eq!(orchestrator.status(), FleetStatus::default());
    }
}
