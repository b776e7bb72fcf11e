//! Derived metrics over the ledger and category cache.
//!
//! Everything here is a pure function of its inputs and can be recomputed
//! at any time.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::category::CategoryCache;
use crate::domain::is_reportable;
use crate::ledger::{DayLedger, Ledger};
use crate::types::{Category, DayKey, Domain};

/// Minimum tracked seconds for a day to extend a streak.
pub const STREAK_MIN_TOTAL_SECS: u64 = 1800;
/// Minimum focus rate (percent) for a day to extend a streak.
pub const STREAK_MIN_FOCUS_RATE: u8 = 50;
/// How many days back a streak walk may look.
pub const STREAK_LOOKBACK_DAYS: u32 = 365;

/// One domain's share of a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainUsage {
    pub domain: Domain,
    pub category: Category,
    pub seconds: u64,
    pub visits: u32,
}

/// Aggregated view of one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayRollup {
    pub day: DayKey,
    pub total_secs: u64,
    /// Seconds on Work domains.
    pub focus_secs: u64,
    /// Everything that is not focus time.
    pub distract_secs: u64,
    /// Rounded percentage of focus time, 0 for an empty day.
    pub focus_rate: u8,
    pub by_category: BTreeMap<Category, u64>,
    /// Longest first; ties ordered by domain.
    pub domains: Vec<DomainUsage>,
}

impl DayRollup {
    pub fn is_empty(&self) -> bool {
        self.total_secs == 0
    }

    /// Top `n` domains by time.
    pub fn top(&self, n: usize) -> &[DomainUsage] {
        &self.domains[..n.min(self.domains.len())]
    }

    /// Compares the exact focus share, not the rounded `focus_rate`.
    fn qualifies_for_streak(&self) -> bool {
        self.total_secs >= STREAK_MIN_TOTAL_SECS
            && u128::from(self.focus_secs) * 100
                >= u128::from(self.total_secs) * u128::from(STREAK_MIN_FOCUS_RATE)
    }
}

/// Rolls up one day's entries, skipping bookkeeping and browser-internal keys.
pub fn rollup(day: DayKey, entries: &DayLedger, categories: &CategoryCache) -> DayRollup {
    let mut domains: Vec<DomainUsage> = entries
        .iter()
        .filter(|(domain, _)| is_reportable(domain.as_str()))
        .map(|(domain, entry)| DomainUsage {
            domain: domain.clone(),
            category: categories.classify(domain.as_str()),
            seconds: entry.seconds,
            visits: entry.visits,
        })
        .collect();
    domains.sort_by(|a, b| b.seconds.cmp(&a.seconds).then_with(|| a.domain.cmp(&b.domain)));

    let mut by_category = BTreeMap::new();
    let mut total_secs = 0u64;
    let mut focus_secs = 0u64;
    for usage in &domains {
        total_secs = total_secs.saturating_add(usage.seconds);
        if usage.category.is_focus() {
            focus_secs = focus_secs.saturating_add(usage.seconds);
        }
        *by_category.entry(usage.category).or_insert(0u64) += usage.seconds;
    }

    DayRollup {
        day,
        total_secs,
        focus_secs,
        distract_secs: total_secs - focus_secs,
        focus_rate: percent(focus_secs, total_secs).unwrap_or(0),
        by_category,
        domains,
    }
}

/// Percent of the daily goal reached, clamped to 100.
///
/// A zero goal counts as met.
pub fn goal_progress(focus_secs: u64, daily_goal_secs: u64) -> u8 {
    percent(focus_secs, daily_goal_secs).unwrap_or(100)
}

/// Consecutive qualifying days immediately before `today`.
///
/// The walk stops at the first day that is missing from the ledger or fails
/// either floor; today never counts.
pub fn streak(ledger: &Ledger, categories: &CategoryCache, today: DayKey) -> u32 {
    let mut count = 0;
    for back in 1..=STREAK_LOOKBACK_DAYS {
        let day = today.days_back(back);
        let Some(entries) = ledger.day(day) else {
            break;
        };
        if !rollup(day, entries, categories).qualifies_for_streak() {
            break;
        }
        count += 1;
    }
    count
}

/// Human readable duration: `0m`, `45s`, `12m`, `2h 5m`.
pub fn format_duration(seconds: u64) -> String {
    if seconds < 1 {
        return "0m".to_string();
    }
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m");
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// `round(100 * part / whole)` clamped to 100, half rounding up. `None` when
/// `whole` is zero.
fn percent(part: u64, whole: u64) -> Option<u8> {
    if whole == 0 {
        return None;
    }
    let (part, whole) = (u128::from(part), u128::from(whole));
    let rounded = (200 * part + whole) / (2 * whole);
    Some(u8::try_from(rounded.min(100)).unwrap_or(100))
}
