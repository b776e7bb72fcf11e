//! Insight command: one coaching sentence about a day.

use std::io::Write;

use anyhow::{Context, Result, bail};
use wt_core::{CategoryCache, DayKey, DayRollup, rollup};
use wt_db::Database;
use wt_llm::InsightRequest;

use crate::Config;
use crate::commands::util::{classifier, single_thread_runtime};

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config, day: DayKey) -> Result<()> {
    let Some(client) = classifier(config)? else {
        bail!("no API key configured; set api_key in config.toml or WT_API_KEY");
    };

    let categories = CategoryCache::from(db.load_categories()?);
    let data = rollup(day, &db.read_day(day)?, &categories);
    let request = insight_request(&data);

    let runtime = single_thread_runtime()?;
    let insight = runtime
        .block_on(client.insight(&request))
        .context("failed to fetch insight")?;

    match insight {
        Some(text) => writeln!(writer, "{text}")?,
        None => writeln!(writer, "No activity recorded on {day}.")?,
    }
    Ok(())
}

pub fn insight_request(data: &DayRollup) -> InsightRequest {
    InsightRequest {
        top_sites: data
            .top(5)
            .iter()
            .map(|usage| (usage.domain.to_string(), usage.seconds))
            .collect(),
        focus_rate: data.focus_rate,
        total_secs: data.total_secs,
    }
}
