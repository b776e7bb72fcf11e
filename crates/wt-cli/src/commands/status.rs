//! Status command for showing what the ledger holds.

use std::io::Write;

use anyhow::Result;
use wt_core::analytics::STREAK_LOOKBACK_DAYS;
use wt_core::{CategoryCache, DayKey, format_duration, goal_progress, rollup, streak};
use wt_db::Database;

use crate::Config;
use crate::commands::util::progress_bar;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config, today: DayKey) -> Result<()> {
    let stats = db.ledger_stats()?;
    let categories = CategoryCache::from(db.load_categories()?);

    writeln!(writer, "Web time tracker status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;

    let (Some(first), Some(last)) = (stats.first_day, stats.last_day) else {
        writeln!(writer, "No activity recorded.")?;
        writeln!(writer)?;
        writeln!(
            writer,
            "Hint: Pipe browser events into 'wt track' to start recording."
        )?;
        return Ok(());
    };

    let today_data = rollup(today, &db.read_day(today)?, &categories);
    writeln!(writer, "Days tracked: {} ({first} to {last})", stats.days)?;
    writeln!(writer, "Domains: {} ({} categorized)", stats.domains, categories.len())?;
    writeln!(writer, "Total time: {}", format_duration(stats.total_secs))?;
    writeln!(
        writer,
        "Today: {} ({}% focus)",
        format_duration(today_data.total_secs),
        today_data.focus_rate
    )?;
    let goal = config.daily_goal_secs;
    writeln!(
        writer,
        "Goal: {} {}% of {}",
        progress_bar(today_data.focus_secs.min(goal), goal),
        goal_progress(today_data.focus_secs, goal),
        format_duration(goal)
    )?;
    let ledger = db.load_ledger_since(today.days_back(STREAK_LOOKBACK_DAYS))?;
    let days = streak(&ledger, &categories, today);
    let unit = if days == 1 { "day" } else { "days" };
    writeln!(writer, "Streak: {days} {unit}")?;
    let focus = if config.focus_mode_enabled { "on" } else { "off" };
    writeln!(writer, "Focus mode: {focus}")?;

    Ok(())
}
