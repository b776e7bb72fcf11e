//! Settings command: prints the effective configuration.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use wt_core::format_duration;

use crate::Config;

#[derive(Debug, Serialize)]
struct SettingsView<'a> {
    database_path: String,
    idle_threshold_secs: u64,
    daily_goal_secs: u64,
    focus_mode_enabled: bool,
    tick_interval_secs: u64,
    classify_timeout_secs: u64,
    api_key_set: bool,
    model: &'a str,
    api_url: &'a str,
}

impl<'a> SettingsView<'a> {
    fn new(config: &'a Config) -> Self {
        Self {
            database_path: config.database_path.display().to_string(),
            idle_threshold_secs: config.idle_threshold_secs,
            daily_goal_secs: config.daily_goal_secs,
            focus_mode_enabled: config.focus_mode_enabled,
            tick_interval_secs: config.tick_interval_secs,
            classify_timeout_secs: config.classify_timeout_secs,
            api_key_set: config.api_key().is_some(),
            model: &config.model,
            api_url: &config.api_url,
        }
    }
}

pub fn run<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    let view = SettingsView::new(config);
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&view)?)?;
        return Ok(());
    }

    let api_key = if view.api_key_set { "set" } else { "not set" };
    writeln!(writer, "database_path          {}", view.database_path)?;
    writeln!(
        writer,
        "idle_threshold_secs    {} ({})",
        view.idle_threshold_secs,
        format_duration(view.idle_threshold_secs)
    )?;
    writeln!(
        writer,
        "daily_goal_secs        {} ({})",
        view.daily_goal_secs,
        format_duration(view.daily_goal_secs)
    )?;
    writeln!(writer, "focus_mode_enabled     {}", view.focus_mode_enabled)?;
    writeln!(writer, "tick_interval_secs     {}", view.tick_interval_secs)?;
    writeln!(writer, "classify_timeout_secs  {}", view.classify_timeout_secs)?;
    writeln!(writer, "api_key                {api_key}")?;
    writeln!(writer, "model                  {}", view.model)?;
    writeln!(writer, "api_url                {}", view.api_url)?;
    Ok(())
}
