//! Report command for one day's web time.
//!
//! This module implements `wt report` with an optional `--day` and output
//! formats (human-readable, JSON). With `--classify`, unknown domains of
//! that day are categorized first.

use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::Result;
use serde::Serialize;
use wt_core::{
    Categorizer, Category, DayKey, DayRollup, DomainUsage, format_duration, goal_progress,
    is_reportable, rollup,
};
use wt_db::Database;

use crate::Config;
use crate::commands::util::{classifier, progress_bar, single_thread_runtime};

/// Domains listed in the human report.
const TOP_SITES: usize = 10;

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    day: DayKey,
    total_secs: u64,
    focus_secs: u64,
    distract_secs: u64,
    focus_rate: u8,
    goal_secs: u64,
    goal_progress: u8,
    by_category: &'a BTreeMap<Category, u64>,
    domains: &'a [DomainUsage],
}

/// Formats the human-readable report output.
pub fn format_report(data: &DayRollup, goal_secs: u64) -> String {
    let mut output = String::new();

    let date = data.day.date().format("%A, %b %-d, %Y");
    writeln!(output, "WEB TIME REPORT: {date}").unwrap();

    if data.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "No activity recorded this day.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'wt status' to check tracking health.").unwrap();
        return output;
    }

    let progress = goal_progress(data.focus_secs, goal_secs);
    writeln!(output).unwrap();
    writeln!(output, "Total     {}", format_duration(data.total_secs)).unwrap();
    writeln!(
        output,
        "Focus     {} ({}%)",
        format_duration(data.focus_secs),
        data.focus_rate
    )
    .unwrap();
    writeln!(output, "Distract  {}", format_duration(data.distract_secs)).unwrap();
    writeln!(
        output,
        "Goal      {} {progress}% of {}",
        progress_bar(data.focus_secs.min(goal_secs), goal_secs),
        format_duration(goal_secs)
    )
    .unwrap();

    writeln!(output).unwrap();
    writeln!(output, "BY CATEGORY").unwrap();
    writeln!(output, "───────────").unwrap();
    for (category, seconds) in &data.by_category {
        writeln!(
            output,
            "{:<14} {:>8}  {}",
            category.as_str(),
            format_duration(*seconds),
            progress_bar(*seconds, data.total_secs)
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "TOP SITES").unwrap();
    writeln!(output, "─────────").unwrap();
    let width = data
        .top(TOP_SITES)
        .iter()
        .map(|usage| usage.domain.as_str().len())
        .max()
        .unwrap_or(0);
    for usage in data.top(TOP_SITES) {
        let visits = if usage.visits == 1 { "visit" } else { "visits" };
        writeln!(
            output,
            "{:<width$}  {:<13} {:>8}  {} {visits}",
            usage.domain.as_str(),
            usage.category.as_str(),
            format_duration(usage.seconds),
            usage.visits,
        )
        .unwrap();
    }
    let hidden = data.domains.len().saturating_sub(TOP_SITES);
    if hidden > 0 {
        writeln!(output, "... and {hidden} more").unwrap();
    }

    output
}

/// Formats report data as JSON.
pub fn format_report_json(data: &DayRollup, goal_secs: u64) -> Result<String> {
    let report = JsonReport {
        day: data.day,
        total_secs: data.total_secs,
        focus_secs: data.focus_secs,
        distract_secs: data.distract_secs,
        focus_rate: data.focus_rate,
        goal_secs,
        goal_progress: goal_progress(data.focus_secs, goal_secs),
        by_category: &data.by_category,
        domains: &data.domains,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Runs the report command.
pub fn run(db: Database, config: &Config, day: DayKey, classify: bool, json: bool) -> Result<()> {
    let entries = db.read_day(day)?;
    let mut categorizer =
        Categorizer::load(db)?.with_timeout(config.classify_timeout());

    if classify {
        if let Some(client) = classifier(config)? {
            let domains = entries
                .keys()
                .filter(|domain| is_reportable(domain.as_str()))
                .cloned();
            let runtime = single_thread_runtime()?;
            runtime.block_on(categorizer.resolve_batch(&client, domains));
        } else {
            tracing::warn!("no API key configured, reporting without classification");
        }
    }

    let data = rollup(day, &entries, categorizer.cache());
    if json {
        println!("{}", format_report_json(&data, config.daily_goal_secs)?);
    } else {
        print!("{}", format_report(&data, config.daily_goal_secs));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use wt_core::{CategoryCache, DayLedger, Domain, LedgerEntry};

    fn sample_rollup() -> DayRollup {
        let mut categories = CategoryCache::new();
        categories.set(Domain::new("github.com").unwrap(), Category::Work);
        categories.set(Domain::new("reddit.com").unwrap(), Category::Social);

        let entries: DayLedger = [
            ("github.com", 5400, 12),
            ("reddit.com", 1200, 4),
            ("example.org", 45, 1),
            ("newtab", 300, 9),
        ]
        .into_iter()
        .map(|(domain, seconds, visits)| {
            (Domain::new(domain).unwrap(), LedgerEntry { seconds, visits })
        })
        .collect();

        rollup("2025-01-15".parse().unwrap(), &entries, &categories)
    }

    #[test]
    fn test_format_report() {
        assert_snapshot!(format_report(&sample_rollup(), 14_400), @r"
        WEB TIME REPORT: Wednesday, Jan 15, 2025

        Total     1h 50m
        Focus     1h 30m (81%)
        Distract  20m
        Goal      ████░░░░░░ 38% of 4h 0m

        BY CATEGORY
        ───────────
        Work             1h 30m  ████████░░
        Social              20m  ██░░░░░░░░
        Other               45s  █░░░░░░░░░

        TOP SITES
        ─────────
        github.com   Work            1h 30m  12 visits
        reddit.com   Social             20m  4 visits
        example.org  Other              45s  1 visit
        ");
    }

    #[test]
    fn test_format_report_empty_day() {
        let data = rollup(
            "2025-01-15".parse().unwrap(),
            &DayLedger::new(),
            &CategoryCache::new(),
        );
        assert_snapshot!(format_report(&data, 14_400), @r"
        WEB TIME REPORT: Wednesday, Jan 15, 2025

        No activity recorded this day.

        Hint: Run 'wt status' to check tracking health.
        ");
    }

    #[test]
    fn test_format_report_json() {
        let json = format_report_json(&sample_rollup(), 14_400).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["day"], "2025-01-15");
        assert_eq!(value["total_secs"], 6645);
        assert_eq!(value["focus_secs"], 5400);
        assert_eq!(value["focus_rate"], 81);
        assert_eq!(value["goal_progress"], 38);
        assert_eq!(value["by_category"]["Social"], 1200);
        assert_eq!(value["domains"][0]["domain"], "github.com");
        assert_eq!(value["domains"].as_array().unwrap().len(), 3);
    }
}
