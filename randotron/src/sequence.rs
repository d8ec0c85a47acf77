//! Per-agent nonce bookkeeping.
//!
//! The local value is optimistic: it only moves forward after the ledger
//! accepts a transaction, and after any failure it is overwritten with
//! whatever the ledger reports.

/// The result of overwriting the local nonce with the ledger's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resync {
    pub from: u64,
    pub to: u64,
}

impl Resync {
    /// The ledger reported fewer accepted transactions than we had counted.
    pub fn regressed(&self) -> bool {
        self.to < self.from
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sequence {
    next: u64,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nonce to use for the next submission.
    pub fn current(&self) -> u64 {
        self.next
    }

    /// Record an accepted submission.
    pub fn confirm(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    /// Registration is always the first transaction of a new account.
    pub fn registered(&mut self) {
        self.next = 1;
    }

    /// Adopt the ledger's count of accepted transactions.
    pub fn resync(&mut self, ledger: u64) -> Resync {
        let from = self.next;
        self.next = ledger;
        Resync { from, to: ledger }
    }
}
