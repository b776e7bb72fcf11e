//! Day-keyed time ledger.
//!
//! The ledger is a two-level table `day -> domain -> entry`. Entries only
//! ever grow: each [`Commit`] is an unconditional increment, so callers are
//! responsible for committing each closed segment exactly once. There is no
//! retention policy; the table grows for the lifetime of the data.

use std::collections::BTreeMap;
use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::tracker::Commit;
use crate::types::{DayKey, Domain};

/// Accumulated time and segment count for one domain on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Attributed wall-clock seconds.
    #[serde(rename = "time")]
    pub seconds: u64,
    /// Number of closed segments, not page loads.
    pub visits: u32,
}

impl LedgerEntry {
    fn add(&mut self, seconds: u64, visits: u32) {
        self.seconds = self.seconds.saturating_add(seconds);
        self.visits = self.visits.saturating_add(visits);
    }
}

/// One day's entries keyed by domain.
pub type DayLedger = BTreeMap<Domain, LedgerEntry>;

/// Append-only storage for commits.
///
/// `commit` must apply as a single read-modify-write so that interleaved
/// commits never lose an update.
pub trait LedgerStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Adds the commit's seconds and visits, creating the entry if absent.
    fn commit(&mut self, commit: &Commit) -> Result<(), Self::Error>;

    /// Returns the entries for `day`, empty when nothing was recorded.
    fn read(&self, day: DayKey) -> Result<DayLedger, Self::Error>;
}

/// In-memory ledger, also the shape analytics operate on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    days: BTreeMap<DayKey, DayLedger>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a commit in place.
    pub fn apply(&mut self, commit: &Commit) {
        self.add(commit.day, commit.domain.clone(), commit.seconds, commit.visits);
    }

    /// Entries for `day`, or `None` when the day has no entries.
    pub fn day(&self, day: DayKey) -> Option<&DayLedger> {
        self.days.get(&day)
    }

    /// Entries for `day`, empty for unknown days.
    pub fn read(&self, day: DayKey) -> DayLedger {
        self.day(day).cloned().unwrap_or_default()
    }

    /// Days with at least one entry, oldest first.
    pub fn days(&self) -> impl Iterator<Item = DayKey> + '_ {
        self.days.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    fn add(&mut self, day: DayKey, domain: Domain, seconds: u64, visits: u32) {
        self.days
            .entry(day)
            .or_default()
            .entry(domain)
            .or_default()
            .add(seconds, visits);
    }
}

impl FromIterator<(DayKey, Domain, LedgerEntry)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (DayKey, Domain, LedgerEntry)>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for (day, domain, entry) in iter {
            ledger.add(day, domain, entry.seconds, entry.visits);
        }
        ledger
    }
}

impl LedgerStore for Ledger {
    type Error = Infallible;

    fn commit(&mut self, commit: &Commit) -> Result<(), Self::Error> {
        self.apply(commit);
        Ok(())
    }

    fn read(&self, day: DayKey) -> Result<DayLedger, Self::Error> {
        Ok(self.day(day).cloned().unwrap_or_default())
    }
}
