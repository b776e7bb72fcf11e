//! Core domain logic for the web time tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Tracking: turning browser events into per-domain, per-day time commits
//! - Categorization: a write-through category cache filled by an external classifier
//! - Analytics: day rollups, goal progress and focus streaks
//! - Focus mode: block decisions and browser blocking rules

pub mod analytics;
pub mod category;
pub mod domain;
pub mod event;
pub mod focus;
pub mod ledger;
pub mod tracker;
mod types;

pub use analytics::{DayRollup, DomainUsage, format_duration, goal_progress, rollup, streak};
pub use category::{CategoryCache, CategoryStore, Categorizer, Classifier, Resolution};
pub use domain::{domain_from_url, is_reportable, should_ignore};
pub use event::{Event, EventKind, IdleState, TabId};
pub use focus::{BlockDecision, BlockRule, block_rules, decide};
pub use ledger::{DayLedger, Ledger, LedgerEntry, LedgerStore};
pub use tracker::{ActivityState, ActivityTracker, Commit, IdleDetector};
pub use types::{Category, DayKey, Domain, ValidationError};
