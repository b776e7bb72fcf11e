//! CLI subcommand implementations.

pub mod ask;
pub mod categories;
pub mod classify;
pub mod focus;
pub mod insight;
pub mod report;
pub mod settings;
pub mod status;
pub mod streak;
pub mod track;
pub mod util;
