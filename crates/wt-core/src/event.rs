//! Normalized browser activity events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Browser tab identifier as reported by the event source.
pub type TabId = i64;

/// A browser activity signal, optionally stamped by the event source.
///
/// Live sources may omit the timestamp, in which case the receive time is
/// used. Replayed streams must carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// When the event occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// What happened.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The kind of browser activity captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The user switched to another tab.
    TabActivated {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// A tab navigated in place. Only relevant for the tracked tab.
    UrlChanged { tab_id: TabId, url: String },
    /// No browser window has focus any more.
    WindowFocusLost,
    /// A browser window gained focus. `tab_id` is absent when the window has
    /// no active tab.
    WindowFocusGained {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<TabId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// The system reported an idle state transition.
    IdleStateChanged { state: IdleState },
    /// Raw seconds since last user input, evaluated against the idle threshold.
    IdleSample { idle_secs: u64 },
    /// Periodic flush.
    Tick,
}

/// System idle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    Active,
    Idle,
    Locked,
}

impl IdleState {
    /// Locked screens count as idle.
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle | Self::Locked)
    }
}
