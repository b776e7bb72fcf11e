//! Ask command: a free-form question about a day.

use std::io::Write;

use anyhow::{Context, Result, bail};
use wt_core::{CategoryCache, DayKey, DayRollup, rollup};
use wt_db::Database;
use wt_llm::AskRequest;

use crate::Config;
use crate::commands::util::{classifier, single_thread_runtime};

/// Domains sent along with the question.
const CONTEXT_SITES: usize = 10;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    day: DayKey,
    question: &str,
) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        bail!("question cannot be empty");
    }
    let Some(client) = classifier(config)? else {
        bail!("no API key configured; set api_key in config.toml or WT_API_KEY");
    };

    let categories = CategoryCache::from(db.load_categories()?);
    let data = rollup(day, &db.read_day(day)?, &categories);
    let request = ask_request(&data, question);

    let runtime = single_thread_runtime()?;
    let answer = runtime
        .block_on(client.chat(&request))
        .context("failed to reach the chat service")?;

    match answer {
        Some(text) => writeln!(writer, "{text}")?,
        None => writeln!(writer, "Could not process that.")?,
    }
    Ok(())
}

pub fn ask_request(data: &DayRollup, question: &str) -> AskRequest {
    AskRequest {
        question: question.to_string(),
        sites: data.top(CONTEXT_SITES).to_vec(),
    }
}
