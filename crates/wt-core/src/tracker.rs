//! Activity tracker: turns browser events into ledger commits.
//!
//! The tracker owns a single [`ActivityState`] and is driven by one
//! sequential caller. Every handler closes the open segment (if any) before
//! changing the attribution target, so each closed segment yields at most one
//! [`Commit`]. Handlers never await and never touch storage; the caller
//! applies commits through [`ActivityTracker::process`] or by hand.
//!
//! # Attribution rules
//!
//! - A segment is committed only when a target URL and start are set and the
//!   tracker is not idle.
//! - Elapsed time is truncated to whole seconds; segments shorter than one
//!   second are dropped, not carried forward.
//! - Segments crossing midnight are booked entirely on the closing day.
//! - URLs without a parseable host close the segment but commit nothing.

use chrono::{DateTime, Utc};

use crate::domain::domain_from_url;
use crate::event::{EventKind, TabId};
use crate::ledger::LedgerStore;
use crate::types::{DayKey, Domain};

/// Default idle threshold in seconds.
pub const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 60;

/// Mutable tracker state. Never persisted: a restart starts empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityState {
    /// Tab whose in-place navigations are followed.
    pub active_tab: Option<TabId>,
    /// URL of the current attribution target.
    pub active_url: Option<String>,
    /// Start of the open segment, `None` while no window has focus.
    pub segment_start: Option<DateTime<Utc>>,
    pub is_idle: bool,
}

/// Time attributed to one domain by a closed segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub day: DayKey,
    pub domain: Domain,
    pub seconds: u64,
    pub visits: u32,
}

/// Decides idleness from raw seconds since last input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleDetector {
    threshold_secs: u64,
}

impl IdleDetector {
    pub const fn from_seconds(threshold_secs: u64) -> Self {
        Self { threshold_secs }
    }

    pub const fn is_idle(&self, idle_secs: u64) -> bool {
        idle_secs >= self.threshold_secs
    }
}

impl Default for IdleDetector {
    fn default() -> Self {
        Self::from_seconds(DEFAULT_IDLE_THRESHOLD_SECS)
    }
}

/// The activity tracking state machine.
#[derive(Debug, Clone, Default)]
pub struct ActivityTracker {
    state: ActivityState,
    idle: IdleDetector,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `threshold_secs` when evaluating [`EventKind::IdleSample`] events.
    #[must_use]
    pub fn with_idle_threshold(mut self, threshold_secs: u64) -> Self {
        self.idle = IdleDetector::from_seconds(threshold_secs);
        self
    }

    pub const fn state(&self) -> &ActivityState {
        &self.state
    }

    /// Applies one event at `now` and returns the commit it produced, if any.
    pub fn handle(&mut self, kind: &EventKind, now: DateTime<Utc>) -> Option<Commit> {
        match kind {
            EventKind::TabActivated { tab_id, url } => {
                self.on_tab_activated(*tab_id, url.as_deref(), now)
            }
            EventKind::UrlChanged { tab_id, url } => self.on_url_changed(*tab_id, url, now),
            EventKind::WindowFocusLost => self.on_window_focus_lost(now),
            EventKind::WindowFocusGained { tab_id, url } => {
                self.on_window_focus_gained(*tab_id, url.as_deref(), now)
            }
            EventKind::IdleStateChanged { state } => {
                if state.is_idle() {
                    self.on_idle_entered(now)
                } else {
                    self.on_idle_exited(now);
                    None
                }
            }
            EventKind::IdleSample { idle_secs } => self.on_idle_sample(*idle_secs, now),
            EventKind::Tick => self.on_tick(now),
        }
    }

    /// Handles an event at `now` and appends its commit to `store`.
    ///
    /// Storage failures are logged and swallowed so the caller keeps
    /// processing subsequent events.
    pub fn process<S: LedgerStore>(
        &mut self,
        kind: &EventKind,
        now: DateTime<Utc>,
        store: &mut S,
    ) -> Option<Commit> {
        let commit = self.handle(kind, now)?;
        if let Err(err) = store.commit(&commit) {
            tracing::warn!(
                error = %err,
                domain = %commit.domain,
                seconds = commit.seconds,
                "failed to persist commit, time discarded"
            );
            return None;
        }
        tracing::debug!(
            day = %commit.day,
            domain = %commit.domain,
            seconds = commit.seconds,
            "committed segment"
        );
        Some(commit)
    }

    pub fn on_tab_activated(
        &mut self,
        tab_id: TabId,
        url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<Commit> {
        let commit = self.close_segment(now);
        self.state.active_tab = Some(tab_id);
        self.state.active_url = url.map(str::to_string);
        self.state.segment_start = Some(now);
        commit
    }

    /// Navigations in tabs other than the tracked one are ignored.
    pub fn on_url_changed(&mut self, tab_id: TabId, url: &str, now: DateTime<Utc>) -> Option<Commit> {
        if self.state.active_tab != Some(tab_id) {
            return None;
        }
        let commit = self.close_segment(now);
        self.state.active_url = Some(url.to_string());
        self.state.segment_start = Some(now);
        commit
    }

    pub fn on_window_focus_lost(&mut self, now: DateTime<Utc>) -> Option<Commit> {
        let commit = self.close_segment(now);
        self.state.segment_start = None;
        commit
    }

    /// Retargets to the newly focused window's active tab.
    ///
    /// Focus can move straight from one browser window to another without an
    /// intermediate loss, so an open segment is closed first.
    pub fn on_window_focus_gained(
        &mut self,
        tab_id: Option<TabId>,
        url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<Commit> {
        let tab_id = tab_id?;
        let commit = self.close_segment(now);
        self.state.active_tab = Some(tab_id);
        self.state.active_url = url.map(str::to_string);
        self.state.segment_start = Some(now);
        commit
    }

    pub fn on_idle_entered(&mut self, now: DateTime<Utc>) -> Option<Commit> {
        let commit = self.close_segment(now);
        self.state.is_idle = true;
        self.state.segment_start = Some(now);
        commit
    }

    /// Time accrues again from `now`, never retroactively.
    pub fn on_idle_exited(&mut self, now: DateTime<Utc>) {
        self.state.is_idle = false;
        self.state.segment_start = Some(now);
    }

    fn on_idle_sample(&mut self, idle_secs: u64, now: DateTime<Utc>) -> Option<Commit> {
        match (self.idle.is_idle(idle_secs), self.state.is_idle) {
            (true, false) => self.on_idle_entered(now),
            (false, true) => {
                self.on_idle_exited(now);
                None
            }
            _ => None,
        }
    }

    /// Flushes the open segment and reopens it at `now`.
    pub fn on_tick(&mut self, now: DateTime<Utc>) -> Option<Commit> {
        if self.state.is_idle || self.state.segment_start.is_none() {
            return None;
        }
        let commit = self.close_segment(now);
        self.state.segment_start = Some(now);
        commit
    }

    /// Closes the open segment, leaving `segment_start` empty.
    fn close_segment(&mut self, now: DateTime<Utc>) -> Option<Commit> {
        let start = self.state.segment_start.take()?;
        if self.state.is_idle {
            return None;
        }
        let url = self.state.active_url.as_deref()?;

        let elapsed = now.signed_duration_since(start).num_seconds();
        let seconds = u64::try_from(elapsed).ok().filter(|secs| *secs >= 1)?;

        let Some(domain) = domain_from_url(url) else {
            tracing::debug!(url, seconds, "no domain for url, segment discarded");
            return None;
        };

        Some(Commit {
            day: DayKey::of(now),
            domain,
            seconds,
            visits: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::event::IdleState;
    use crate::ledger::Ledger;

    fn at(hms: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("2025-01-15T{hms}Z"))
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day() -> DayKey {
        "2025-01-15".parse().unwrap()
    }

    fn commit(domain: &str, seconds: u64) -> Commit {
        Commit {
            day: day(),
            domain: Domain::new(domain).unwrap(),
            seconds,
            visits: 1,
        }
    }

    #[test]
    fn tab_switch_commits_previous_domain() {
        let mut tracker = ActivityTracker::new();
        assert_eq!(
            tracker.on_tab_activated(1, Some("https://a.com/"), at("10:00:00")),
            None
        );
        let committed = tracker.on_tab_activated(2, Some("https://www.b.com/x"), at("10:00:45"));
        assert_eq!(committed, Some(commit("a.com", 45)));

        let committed = tracker.on_tab_activated(1, Some("https://a.com/"), at("10:01:00"));
        assert_eq!(committed, Some(commit("b.com", 15)));
    }

    #[test]
    fn idle_scenario_accumulates_two_visits() {
        let mut tracker = ActivityTracker::new();
        let mut ledger = Ledger::new();
        let events = [
            (at("10:00:00"), EventKind::TabActivated {
                tab_id: 1,
                url: Some("https://a.com/".to_string()),
            }),
            (at("10:00:45"), EventKind::IdleStateChanged {
                state: IdleState::Idle,
            }),
            (at("10:05:00"), EventKind::IdleStateChanged {
                state: IdleState::Active,
            }),
            (at("10:06:00"), EventKind::Tick),
        ];
        for (now, kind) in events {
            tracker.process(&kind, now, &mut ledger);
        }

        let entries = ledger.read(day());
        let entry = entries.get("a.com").unwrap();
        assert_eq!(entry.seconds, 105);
        assert_eq!(entry.visits, 2);
    }

    #[test]
    fn tab_events_during_idle_commit_nothing_and_reset_start() {
        let mut tracker = ActivityTracker::new();
        tracker.on_tab_activated(1, Some("https://a.com/"), at("10:00:00"));
        tracker.on_idle_entered(at("10:00:10"));

        assert_eq!(
            tracker.on_tab_activated(2, Some("https://b.com/"), at("10:03:00")),
            None
        );
        assert_eq!(tracker.on_tick(at("10:03:30")), None);
        assert_eq!(tracker.state().segment_start, Some(at("10:03:00")));

        tracker.on_idle_exited(at("10:04:00"));
        let committed = tracker.on_tab_activated(1, Some("https://a.com/"), at("10:04:20"));
        assert_eq!(committed, Some(commit("b.com", 20)));
    }

    #[test]
    fn focus_loss_stops_attribution_until_focus_returns() {
        let mut tracker = ActivityTracker::new();
        tracker.on_tab_activated(1, Some("https://a.com/"), at("10:00:00"));

        assert_eq!(
            tracker.on_window_focus_lost(at("10:00:30")),
            Some(commit("a.com", 30))
        );
        assert_eq!(tracker.state().segment_start, None);
        assert_eq!(tracker.on_tick(at("10:01:00")), None);
        assert_eq!(tracker.on_tick(at("10:01:30")), None);

        assert_eq!(
            tracker.on_window_focus_gained(Some(4), Some("https://c.com/"), at("10:02:00")),
            None
        );
        assert_eq!(tracker.on_tick(at("10:02:30")), Some(commit("c.com", 30)));
    }

    #[test]
    fn focus_moving_between_windows_closes_open_segment() {
        let mut tracker = ActivityTracker::new();
        tracker.on_tab_activated(1, Some("https://a.com/"), at("10:00:00"));
        assert_eq!(
            tracker.on_window_focus_gained(Some(9), Some("https://b.com/"), at("10:00:20")),
            Some(commit("a.com", 20))
        );
    }

    #[test]
    fn focus_gained_without_tab_changes_nothing() {
        let mut tracker = ActivityTracker::new();
        tracker.on_tab_activated(1, Some("https://a.com/"), at("10:00:00"));
        let before = tracker.state().clone();
        assert_eq!(tracker.on_window_focus_gained(None, None, at("10:00:20")), None);
        assert_eq!(tracker.state(), &before);
    }

    #[test]
    fn url_change_only_applies_to_tracked_tab() {
        let mut tracker = ActivityTracker::new();
        tracker.on_tab_activated(1, Some("https://a.com/"), at("10:00:00"));

        assert_eq!(tracker.on_url_changed(7, "https://b.com/", at("10:00:10")), None);
        assert_eq!(tracker.state().active_url.as_deref(), Some("https://a.com/"));

        let committed = tracker.on_url_changed(1, "https://b.com/", at("10:00:20"));
        assert_eq!(committed, Some(commit("a.com", 20)));
    }

    #[test]
    fn same_domain_navigation_still_counts_a_visit() {
        let mut tracker = ActivityTracker::new();
        tracker.on_tab_activated(1, Some("https://a.com/one"), at("10:00:00"));
        let first = tracker.on_url_changed(1, "https://a.com/two", at("10:00:05"));
        let second = tracker.on_tab_activated(2, Some("https://b.com/"), at("10:00:08"));

        assert_eq!(first, Some(commit("a.com", 5)));
        assert_eq!(second, Some(commit("a.com", 3)));
    }

    #[test]
    fn sub_second_segments_are_dropped() {
        let mut tracker = ActivityTracker::new();
        let start = at("10:00:00");
        tracker.on_tab_activated(1, Some("https://a.com/"), start);
        let committed = tracker.on_tab_activated(
            2,
            Some("https://b.com/"),
            start + chrono::Duration::milliseconds(900),
        );
        assert_eq!(committed, None);
    }

    #[test]
    fn elapsed_seconds_are_truncated() {
        let mut tracker = ActivityTracker::new();
        let start = at("10:00:00");
        tracker.on_tab_activated(1, Some("https://a.com/"), start);
        let committed = tracker.on_tick(start + chrono::Duration::milliseconds(2_999));
        assert_eq!(committed, Some(commit("a.com", 2)));
    }

    #[test]
    fn backwards_clock_jump_commits_nothing() {
        let mut tracker = ActivityTracker::new();
        tracker.on_tab_activated(1, Some("https://a.com/"), at("10:00:00"));
        assert_eq!(tracker.on_tick(at("09:59:00")), None);
        assert_eq!(tracker.state().segment_start, Some(at("09:59:00")));
    }

    #[test]
    fn unparseable_url_closes_segment_without_commit() {
        let mut tracker = ActivityTracker::new();
        tracker.on_tab_activated(1, Some("about:blank"), at("10:00:00"));
        assert_eq!(
            tracker.on_tab_activated(2, Some("https://a.com/"), at("10:01:00")),
            None
        );
        assert_eq!(tracker.on_tick(at("10:01:30")), Some(commit("a.com", 30)));
    }

    #[test]
    fn midnight_crossing_segment_books_on_closing_day() {
        let mut tracker = ActivityTracker::new();
        let before = DateTime::parse_from_rfc3339("2025-01-15T23:59:50Z")
            .unwrap()
            .with_timezone(&Utc);
        let after = DateTime::parse_from_rfc3339("2025-01-16T00:00:20Z")
            .unwrap()
            .with_timezone(&Utc);
        tracker.on_tab_activated(1, Some("https://a.com/"), before);

        let committed = tracker.on_tick(after).unwrap();
        assert_eq!(committed.day.to_string(), "2025-01-16");
        assert_eq!(committed.seconds, 30);
    }

    #[test]
    fn idle_sample_uses_threshold() {
        let mut tracker = ActivityTracker::new().with_idle_threshold(60);
        tracker.on_tab_activated(1, Some("https://a.com/"), at("10:00:00"));

        assert_eq!(tracker.handle(&EventKind::IdleSample { idle_secs: 59 }, at("10:00:30")), None);
        assert!(!tracker.state().is_idle);

        let committed = tracker.handle(&EventKind::IdleSample { idle_secs: 60 }, at("10:01:00"));
        assert_eq!(committed, Some(commit("a.com", 60)));
        assert!(tracker.state().is_idle);

        assert_eq!(tracker.handle(&EventKind::IdleSample { idle_secs: 0 }, at("10:09:00")), None);
        assert!(!tracker.state().is_idle);
        assert_eq!(tracker.state().segment_start, Some(at("10:09:00")));
    }

    #[test]
    fn gap_free_sequence_sums_to_span() {
        let mut tracker = ActivityTracker::new();
        let mut ledger = Ledger::new();
        let urls = ["https://a.com/", "https://b.com/", "https://c.com/", "https://a.com/x"];
        let times = ["10:00:00", "10:00:07", "10:01:13", "10:05:00", "10:09:59"];

        for (i, time) in times.iter().enumerate() {
            let url = urls.get(i).copied().unwrap_or("https://d.com/");
            let kind = EventKind::TabActivated {
                tab_id: TabId::try_from(i).unwrap(),
                url: Some(url.to_string()),
            };
            tracker.process(&kind, at(time), &mut ledger);
        }

        let total: u64 = ledger.read(day()).values().map(|entry| entry.seconds).sum();
        assert_eq!(total, 599);
    }
}
