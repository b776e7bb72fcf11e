//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use wt_core::{DayKey, Domain, domain_from_url};

use crate::Config;

/// Pre-compiled regex for relative day parsing.
static RELATIVE_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+days?\s+ago$").unwrap());

/// Parse a day as a keyword, a relative day or an ISO date.
///
/// Supports:
/// - Keywords: "today", "yesterday"
/// - Relative: "3 days ago", "1 day ago"
/// - ISO 8601 date: "2025-01-15"
pub fn parse_day(s: &str, today: DayKey) -> Result<DayKey> {
    let s = s.trim();
    match s.to_ascii_lowercase().as_str() {
        "today" => return Ok(today),
        "yesterday" => return Ok(today.days_back(1)),
        _ => {}
    }

    if let Some(caps) = RELATIVE_DAY_RE.captures(s) {
        let n: u32 = caps[1]
            .parse()
            .context("failed to parse number in relative day")?;
        return Ok(today.days_back(n));
    }

    s.parse().with_context(|| {
        format!("Invalid day: {s}. Use YYYY-MM-DD, 'today', 'yesterday' or 'N days ago'")
    })
}

/// Resolves an optional `--day` argument, defaulting to today (UTC).
pub fn resolve_day(arg: Option<&str>) -> Result<DayKey> {
    let today = DayKey::today();
    arg.map_or(Ok(today), |s| parse_day(s, today))
}

/// Accepts a bare domain or a full URL.
pub fn parse_domain_arg(s: &str) -> Result<Domain> {
    let s = s.trim();
    if s.contains("://") {
        return domain_from_url(s).with_context(|| format!("no domain in URL: {s}"));
    }
    let s = s.strip_prefix("www.").unwrap_or(s);
    Domain::new(s).with_context(|| format!("invalid domain: {s:?}"))
}

/// Builds the chat-completions client, or `None` without an API key.
pub fn classifier(config: &Config) -> Result<Option<wt_llm::Client>> {
    let Some(api_key) = config.api_key() else {
        return Ok(None);
    };
    let client = wt_llm::Client::new(api_key)
        .context("failed to create API client")?
        .with_endpoint(&config.api_url)
        .with_model(&config.model);
    Ok(Some(client))
}

/// Runtime for the async parts of a single command.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// Text progress bar, ten cells wide. Any non-zero value shows at least one cell.
pub fn progress_bar(value: u64, max: u64) -> String {
    let filled = if max == 0 {
        0
    } else {
        let (value, max) = (u128::from(value), u128::from(max));
        let cells = ((value * 10 + max / 2) / max).min(10);
        let cells = usize::try_from(cells).unwrap_or(10);
        if cells == 0 && value > 0 { 1 } else { cells }
    };
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}
