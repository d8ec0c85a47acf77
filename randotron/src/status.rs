//! Aggregate fleet status.

use std::sync::Arc;
use tokio::sync::watch;

/// What observers of the fleet can see. Per-agent errors never surface here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FleetStatus {
    pub is_running: bool,
    pub active_agents: usize,
    pub total_submitted: u64,
}

/// Read handle returned alongside an [crate::Orchestrator].
///
/// Poll with [Monitor::snapshot] or await [Monitor::changed].
#[derive(Clone, Debug)]
pub struct Monitor {
    rx: watch::Receiver<FleetStatus>,
}

impl Monitor {
    pub fn snapshot(&self) -> FleetStatus {
        *self.rx.borrow()
    }

    /// Wait for the next status change. Returns `None` once the orchestrator
    /// has been dropped.
    pub async fn changed(&mut self) -> Option<FleetStatus> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// Write side shared by the orchestrator and its agents.
#[derive(Clone, Debug)]
pub(crate) struct Reporter {
    tx: Arc<watch::Sender<FleetStatus>>,
}

impl Reporter {
    pub(crate) fn new() -> (Self, Monitor) {
        let (tx, rx) = watch::channel(FleetStatus::default());
        (Self { tx: Arc::new(tx) }, Monitor { rx })
    }

    pub(crate) fn snapshot(&self) -> FleetStatus {
        *self.tx.borrow()
    }

    pub(crate) fn record_submitted(&self) {
        self.tx.send_modify(|status| status.total_submitted += 1);
    }

    pub(crate) fn set_population(&self, is_running: bool, active_agents: usize) {
        self.tx.send_if_modified(|status| {
            let changed =
                status.is_running != is_running || status.active_agents != active_agents;
            status.is_running = is_running;
            status.active_agents = active_agents;
            changed
        });
    }
}
