//! Classify command: resolves categories for uncategorized domains.

use std::io::Write;

use anyhow::{Result, bail};
use wt_core::{Categorizer, Classifier, DayKey, Resolution, is_reportable};
use wt_db::Database;

use crate::Config;
use crate::commands::util::{classifier, single_thread_runtime};

pub fn run<W: Write>(
    writer: &mut W,
    db: Database,
    config: &Config,
    day: Option<DayKey>,
) -> Result<()> {
    let Some(client) = classifier(config)? else {
        bail!("no API key configured; set api_key in config.toml or WT_API_KEY");
    };
    let runtime = single_thread_runtime()?;
    let resolution = runtime.block_on(resolve(db, &client, config, day))?;
    write_resolution(writer, &resolution)
}

/// Resolves every reportable domain in the ledger (or on `day`).
pub async fn resolve<C>(
    db: Database,
    classifier: &C,
    config: &Config,
    day: Option<DayKey>,
) -> Result<Resolution>
where
    C: Classifier + Sync,
{
    let domains: Vec<_> = db
        .list_domains(day)?
        .into_iter()
        .filter(|domain| is_reportable(domain.as_str()))
        .collect();
    let mut categorizer = Categorizer::load(db)?.with_timeout(config.classify_timeout());
    Ok(categorizer.resolve_batch(classifier, domains).await)
}

fn write_resolution<W: Write>(writer: &mut W, resolution: &Resolution) -> Result<()> {
    if resolution.requested == 0 {
        writeln!(writer, "All domains already categorized.")?;
        return Ok(());
    }
    writeln!(
        writer,
        "Categorized {} of {} new domains ({} set to Other).",
        resolution.classified, resolution.requested, resolution.fallback
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::convert::Infallible;

    use wt_core::{Category, Commit, Domain};

    struct FixedClassifier;

    impl Classifier for FixedClassifier {
        type Error = Infallible;

        async fn classify_domains(
            &self,
            domains: &[Domain],
        ) -> Result<HashMap<Domain, Category>, Self::Error> {
            Ok(domains
                .iter()
                .filter(|domain| domain.as_str() == "github.com")
                .map(|domain| (domain.clone(), Category::Work))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_resolve_persists_answers_and_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wt.db");
        let mut db = Database::open(&path).unwrap();
        for domain in ["github.com", "odd.io", "newtab"] {
            db.commit(&Commit {
                day: "2025-01-15".parse().unwrap(),
                domain: Domain::new(domain).unwrap(),
                seconds: 60,
                visits: 1,
            })
            .unwrap();
        }

        let resolution = resolve(db, &FixedClassifier, &Config::default(), None)
            .await
            .unwrap();
        assert_eq!(
            resolution,
            Resolution {
                requested: 2,
                classified: 1,
                fallback: 1
            }
        );

        let db = Database::open(&path).unwrap();
        let categories = db.load_categories().unwrap();
        assert_eq!(categories.get("github.com"), Some(&Category::Work));
        assert_eq!(categories.get("odd.io"), Some(&Category::Other));
        assert!(!categories.contains_key("newtab"));
    }

    #[test]
    fn test_run_without_api_key_fails() {
        let db = Database::open_in_memory().unwrap();
        let mut out = Vec::new();
        let err = run(&mut out, db, &Config::default(), None).unwrap_err();
        assert!(err.to_string().contains("no API key"));
    }

    #[test]
    fn test_write_resolution() {
        let mut out = Vec::new();
        write_resolution(&mut out, &Resolution::default()).unwrap();
        write_resolution(
            &mut out,
            &Resolution {
                requested: 3,
                classified: 2,
                fallback: 1,
            },
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "All domains already categorized.\nCategorized 2 of 3 new domains (1 set to Other).\n"
        );
    }
}
