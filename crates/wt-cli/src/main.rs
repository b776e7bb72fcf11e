use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{
    ask, categories, classify, focus, insight, report, settings, status, streak, track, util,
};
use wt_cli::{CategoriesAction, Cli, Commands, Config, FocusAction};
use wt_core::{ActivityTracker, Categorizer, DayKey};

/// Load config, failing with context.
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(wt_db::Database, Config)> {
    let config = load_config(config_path)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = wt_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut stdout = io::stdout().lock();
    let config_path = cli.config.as_deref();

    match &cli.command {
        Some(Commands::Track { replay }) => {
            let (mut db, config) = open_database(config_path)?;
            let mut tracker =
                ActivityTracker::new().with_idle_threshold(config.idle_threshold_secs);
            let stats = if *replay {
                track::replay(io::stdin().lock(), &mut tracker, &mut db)?
            } else {
                let input = tokio::io::BufReader::new(tokio::io::stdin());
                util::single_thread_runtime()?.block_on(track::live(
                    input,
                    &mut tracker,
                    &mut db,
                    config.tick_interval(),
                ))?
            };
            track::write_summary(&mut stdout, &stats)?;
        }
        Some(Commands::Report {
            day,
            classify,
            json,
        }) => {
            let day = util::resolve_day(day.as_deref())?;
            let (db, config) = open_database(config_path)?;
            report::run(db, &config, day, *classify, *json)?;
        }
        Some(Commands::Streak { json }) => {
            let (db, _config) = open_database(config_path)?;
            streak::run(&mut stdout, &db, DayKey::today(), *json)?;
        }
        Some(Commands::Classify { day }) => {
            let day = day
                .as_deref()
                .map(|s| util::parse_day(s, DayKey::today()))
                .transpose()?;
            let (db, config) = open_database(config_path)?;
            classify::run(&mut stdout, db, &config, day)?;
        }
        Some(Commands::Categories(action)) => {
            let (db, _config) = open_database(config_path)?;
            match action {
                CategoriesAction::List { json } => categories::list(&mut stdout, &db, *json)?,
                CategoriesAction::Set { domain, category } => {
                    let mut categorizer = Categorizer::load(db)?;
                    categories::set(&mut stdout, &mut categorizer, domain, category)?;
                }
            }
        }
        Some(Commands::Focus(action)) => match action {
            FocusAction::Status => {
                let (db, config) = open_database(config_path)?;
                let today = focus::today_rollup(&db, DayKey::today())?;
                focus::status(&mut stdout, config.focus_mode_enabled, &today)?;
            }
            FocusAction::Rules => {
                let config = load_config(config_path)?;
                focus::rules(&mut stdout, config.focus_mode_enabled)?;
            }
            FocusAction::Check { domains } => {
                let config = load_config(config_path)?;
                focus::check(&mut stdout, config.focus_mode_enabled, domains)?;
            }
        }
        Some(Commands::Insight { day }) => {
            let day = util::resolve_day(day.as_deref())?;
            let (db, config) = open_database(config_path)?;
            insight::run(&mut stdout, &db, &config, day)?;
        }
        Some(Commands::Ask { question, day }) => {
            let day = util::resolve_day(day.as_deref())?;
            let (db, config) = open_database(config_path)?;
            ask::run(&mut stdout, &db, &config, day, &question.join(" "))?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(config_path)?;
            status::run(&mut stdout, &db, &config, DayKey::today())?;
        }
        Some(Commands::Settings { json }) => {
            let config = load_config(config_path)?;
            settings::run(&mut stdout, &config, *json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
