//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Per-domain web time tracker.
///
/// Turns a stream of browser activity events into per-domain daily time,
/// categorizes domains and reports focus time, goal progress and streaks.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record browser events read as JSON lines from stdin.
    Track {
        /// Replay a recorded stream: every event must carry a timestamp and
        /// no wall-clock ticks are generated.
        #[arg(long)]
        replay: bool,
    },

    /// Show a day's time by domain and category.
    Report {
        /// Day to report: today, yesterday, "N days ago" or YYYY-MM-DD.
        #[arg(long)]
        day: Option<String>,

        /// Categorize unknown domains before reporting.
        #[arg(long)]
        classify: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the current focus streak.
    Streak {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Categorize domains that have no category yet.
    Classify {
        /// Only domains seen on this day.
        #[arg(long)]
        day: Option<String>,
    },

    /// List or override domain categories.
    #[command(subcommand)]
    Categories(CategoriesAction),

    /// Inspect focus mode blocking.
    #[command(subcommand)]
    Focus(FocusAction),

    /// Ask for a one-sentence productivity insight on a day.
    Insight {
        /// Day to summarize.
        #[arg(long)]
        day: Option<String>,
    },

    /// Ask a question about a day's browsing.
    Ask {
        /// The question, e.g. "How can I improve focus?".
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Day the question is about.
        #[arg(long)]
        day: Option<String>,
    },

    /// Show database and tracking health.
    Status,

    /// Show effective settings.
    Settings {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum CategoriesAction {
    /// List cached categories.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Set a domain's category. Manual categories are never replaced automatically.
    Set {
        /// Domain or URL.
        domain: String,
        /// Work, Social, Entertainment or Other.
        category: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum FocusAction {
    /// Show whether focus mode is on and what it blocks.
    Status,
    /// Print the blocking rules to install, as JSON.
    Rules,
    /// Check whether domains are blocked.
    Check {
        /// Domains or URLs.
        #[arg(required = true)]
        domains: Vec<String>,
    },
}
