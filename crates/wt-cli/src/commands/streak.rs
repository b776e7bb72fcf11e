//! Streak command: consecutive focused days before today.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use wt_core::analytics::{STREAK_LOOKBACK_DAYS, STREAK_MIN_FOCUS_RATE, STREAK_MIN_TOTAL_SECS};
use wt_core::{CategoryCache, DayKey, format_duration, streak};
use wt_db::Database;

#[derive(Debug, Serialize)]
struct JsonStreak {
    today: DayKey,
    streak: u32,
    min_total_secs: u64,
    min_focus_rate: u8,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, today: DayKey, json: bool) -> Result<()> {
    let ledger = db.load_ledger_since(today.days_back(STREAK_LOOKBACK_DAYS))?;
    let categories = CategoryCache::from(db.load_categories()?);
    let days = streak(&ledger, &categories, today);

    if json {
        let payload = JsonStreak {
            today,
            streak: days,
            min_total_secs: STREAK_MIN_TOTAL_SECS,
            min_focus_rate: STREAK_MIN_FOCUS_RATE,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&payload)?)?;
        return Ok(());
    }

    let unit = if days == 1 { "day" } else { "days" };
    writeln!(writer, "Focus streak: {days} {unit}")?;
    writeln!(
        writer,
        "A day counts with at least {} tracked and {}% focus.",
        format_duration(STREAK_MIN_TOTAL_SECS),
        STREAK_MIN_FOCUS_RATE
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use wt_core::{Category, Commit, Domain};

    fn commit(day: DayKey, domain: &str, seconds: u64) -> Commit {
        Commit {
            day,
            domain: Domain::new(domain).unwrap(),
            seconds,
            visits: 1,
        }
    }

    #[test]
    fn test_streak_counts_focused_days() {
        let mut db = Database::open_in_memory().unwrap();
        db.save_override(&Domain::new("github.com").unwrap(), Category::Work)
            .unwrap();
        let today: DayKey = "2025-01-15".parse().unwrap();
        for back in 1..=3 {
            db.commit(&commit(today.days_back(back), "github.com", 3600))
                .unwrap();
        }

        let mut out = Vec::new();
        run(&mut out, &db, today, false).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "Focus streak: 3 days\nA day counts with at least 30m tracked and 50% focus.\n"
        );
    }

    #[test]
    fn test_streak_json() {
        let db = Database::open_in_memory().unwrap();
        let today: DayKey = "2025-01-15".parse().unwrap();

        let mut out = Vec::new();
        run(&mut out, &db, today, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["streak"], 0);
        assert_eq!(value["today"], "2025-01-15");
    }
}
