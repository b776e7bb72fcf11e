//! Focus command: what focus mode blocks and the rules that block it.

use std::io::Write;

use anyhow::Result;
use wt_core::focus::{DISTRACTING_DOMAINS, decisions};
use wt_core::{
    BlockDecision, CategoryCache, DayKey, DayRollup, Domain, block_rules, decide,
    format_duration, rollup,
};
use wt_db::Database;

use crate::commands::util::parse_domain_arg;

pub fn today_rollup(db: &Database, today: DayKey) -> Result<DayRollup> {
    let categories = CategoryCache::from(db.load_categories()?);
    Ok(rollup(today, &db.read_day(today)?, &categories))
}

/// Shows the toggle, the block list and how today's distracting domains
/// fare against it.
pub fn status<W: Write>(writer: &mut W, enabled: bool, today: &DayRollup) -> Result<()> {
    let state = if enabled { "on" } else { "off" };
    writeln!(writer, "Focus mode: {state}")?;
    let verb = if enabled { "Blocking" } else { "Would block" };
    writeln!(writer, "{verb}: {}", DISTRACTING_DOMAINS.join(", "))?;

    let distracting: Vec<_> = today
        .domains
        .iter()
        .filter(|usage| usage.category.is_distracting())
        .collect();
    if !distracting.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Distracting today:")?;
        let width = distracting
            .iter()
            .map(|usage| usage.domain.as_str().len())
            .max()
            .unwrap_or(0);
        for usage in distracting {
            let listed = match decide(usage.domain.as_str(), true) {
                BlockDecision::Block => "listed",
                BlockDecision::Allow => "not listed",
            };
            writeln!(
                writer,
                "  {:<width$}  {:>8}  {listed}",
                usage.domain.as_str(),
                format_duration(usage.seconds)
            )?;
        }
    }

    if !enabled {
        writeln!(writer)?;
        writeln!(
            writer,
            "Hint: Set focus_mode_enabled = true in config.toml or WT_FOCUS_MODE_ENABLED=true."
        )?;
    }
    Ok(())
}

/// Prints the full rule set for the current toggle. An empty list means
/// every previously installed rule should be removed.
pub fn rules<W: Write>(writer: &mut W, enabled: bool) -> Result<()> {
    writeln!(
        writer,
        "{}",
        serde_json::to_string_pretty(&block_rules(enabled))?
    )?;
    Ok(())
}

pub fn check<W: Write>(writer: &mut W, enabled: bool, domains: &[String]) -> Result<()> {
    let domains = domains
        .iter()
        .map(|raw| parse_domain_arg(raw))
        .collect::<Result<Vec<_>>>()?;
    for (domain, decision) in decisions(domains.iter().map(Domain::as_str), enabled) {
        let decision = match decision {
            BlockDecision::Allow => "allow",
            BlockDecision::Block => "block",
        };
        writeln!(writer, "{domain}: {decision}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use wt_core::{Category, DayLedger, LedgerEntry};

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_check_normalizes_and_decides() {
        let domains = vec![
            "https://www.reddit.com/r/rust".to_string(),
            "music.youtube.com".to_string(),
            "github.com".to_string(),
        ];
        assert_eq!(
            output(|out| check(out, true, &domains)),
            "reddit.com: block\nmusic.youtube.com: block\ngithub.com: allow\n"
        );
        assert_eq!(
            output(|out| check(out, false, &domains[..1])),
            "reddit.com: allow\n"
        );
    }

    #[test]
    fn test_rules_empty_when_disabled() {
        assert_eq!(output(|out| rules(out, false)), "[]\n");
        let enabled = output(|out| rules(out, true));
        assert!(enabled.contains(r#""urlFilter": "*://*.reddit.com/*""#));
    }

    fn empty_day() -> DayRollup {
        rollup(
            "2025-01-15".parse().unwrap(),
            &DayLedger::new(),
            &CategoryCache::new(),
        )
    }

    #[test]
    fn test_status_mentions_toggle() {
        let day = empty_day();
        assert!(output(|out| status(out, false, &day)).starts_with("Focus mode: off\nWould block: twitter.com"));
        assert!(output(|out| status(out, true, &day)).starts_with("Focus mode: on\nBlocking: twitter.com"));
    }

    #[test]
    fn test_status_lists_distracting_domains_of_the_day() {
        let mut categories = CategoryCache::new();
        categories.set(Domain::new("reddit.com").unwrap(), Category::Social);
        categories.set(Domain::new("9gag.com").unwrap(), Category::Entertainment);
        categories.set(Domain::new("github.com").unwrap(), Category::Work);
        let entries: DayLedger = [("reddit.com", 1200), ("9gag.com", 300), ("github.com", 5400)]
            .into_iter()
            .map(|(domain, seconds)| {
                (
                    Domain::new(domain).unwrap(),
                    LedgerEntry { seconds, visits: 1 },
                )
            })
            .collect();
        let day = rollup("2025-01-15".parse().unwrap(), &entries, &categories);

        assert_snapshot!(output(|out| status(out, true, &day)), @r"
        Focus mode: on
        Blocking: twitter.com, x.com, facebook.com, instagram.com, linkedin.com, reddit.com, tiktok.com, youtube.com, netflix.com, twitch.tv, spotify.com, hulu.com, disneyplus.com

        Distracting today:
          reddit.com       20m  listed
          9gag.com          5m  not listed
        ");
    }
}
