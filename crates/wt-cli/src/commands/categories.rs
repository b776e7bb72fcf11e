//! Categories command: list cached categories or set one manually.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use wt_core::{Categorizer, Category};
use wt_db::Database;

use crate::commands::util::parse_domain_arg;

#[derive(Debug, Serialize)]
struct JsonCategory<'a> {
    domain: &'a str,
    category: Category,
    source: &'static str,
    updated_at: &'a str,
}

pub fn list<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let records = db.list_categories()?;

    if json {
        let rows: Vec<_> = records
            .iter()
            .map(|record| JsonCategory {
                domain: record.domain.as_str(),
                category: record.category,
                source: record.source.as_str(),
                updated_at: &record.updated_at,
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
        return Ok(());
    }

    if records.is_empty() {
        writeln!(writer, "No categorized domains.")?;
        writeln!(writer)?;
        writeln!(writer, "Hint: Run 'wt classify' to categorize tracked domains.")?;
        return Ok(());
    }

    let width = records
        .iter()
        .map(|record| record.domain.as_str().len())
        .max()
        .unwrap_or(0);
    for record in &records {
        writeln!(
            writer,
            "{:<width$}  {:<13} {}",
            record.domain.as_str(),
            record.category.as_str(),
            record.source
        )?;
    }
    Ok(())
}

/// Stores a manual category. It wins over every later automatic resolution.
pub fn set<W: Write>(
    writer: &mut W,
    categorizer: &mut Categorizer<Database>,
    domain: &str,
    category: &str,
) -> Result<()> {
    let domain = parse_domain_arg(domain)?;
    let category: Category = category
        .parse()
        .with_context(|| format!("unknown category {category:?}; use Work, Social, Entertainment or Other"))?;

    categorizer
        .set_category(domain.clone(), category)
        .context("failed to save category")?;
    tracing::info!(%domain, %category, "category overridden");
    writeln!(writer, "{domain} is now {category}")?;
    Ok(())
}
