//! Storage layer for the web time tracker.
//!
//! Persists the day ledger and the domain category cache using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. The tracker drives it
//! from a single sequential loop.
//!
//! # Schema
//!
//! - `tracking_data(day, domain, seconds, visits)`: one row per day and
//!   domain. Days are `YYYY-MM-DD` text in UTC, so lexicographic order is
//!   chronological order.
//! - `domain_categories(domain, category, source, updated_at)`: cached
//!   categories. `source` is `auto` for classifier answers and `manual` for
//!   user overrides; automatic writes never replace an existing row.
//!
//! Timestamps are stored as TEXT in RFC 3339 format (e.g., `2025-01-15T10:30:00Z`).

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use wt_core::{
    Category, CategoryStore, Commit, DayKey, DayLedger, Domain, Ledger, LedgerEntry, LedgerStore,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored or supplied value does not fit its column.
    #[error("invalid value in {column}: {value}")]
    InvalidValue { column: &'static str, value: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Where a cached category came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource {
    Auto,
    Manual,
}

impl CategorySource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for CategorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategorySource {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(invalid("source", other)),
        }
    }
}

/// A cached category row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub domain: Domain,
    pub category: Category,
    pub source: CategorySource,
    pub updated_at: String,
}

/// Totals over the whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub days: u64,
    pub domains: u64,
    pub total_secs: u64,
    pub first_day: Option<DayKey>,
    pub last_day: Option<DayKey>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- tracking_data: accumulated seconds and closed segments per day and domain
            -- day: UTC calendar date (e.g., '2025-01-15')
            CREATE TABLE IF NOT EXISTS tracking_data (
                day TEXT NOT NULL,
                domain TEXT NOT NULL,
                seconds INTEGER NOT NULL DEFAULT 0,
                visits INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (day, domain)
            );

            CREATE INDEX IF NOT EXISTS idx_tracking_data_domain ON tracking_data(domain);

            CREATE TABLE IF NOT EXISTS domain_categories (
                domain TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT 'auto',
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Adds a commit to the ledger in a single statement.
    pub fn commit(&mut self, commit: &Commit) -> Result<(), DbError> {
        let seconds = i64::try_from(commit.seconds)
            .map_err(|_| invalid("seconds", &commit.seconds.to_string()))?;
        self.conn.execute(
            "
            INSERT INTO tracking_data (day, domain, seconds, visits)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(day, domain) DO UPDATE SET
                seconds = seconds + excluded.seconds,
                visits = visits + excluded.visits
            ",
            params![
                commit.day.to_string(),
                commit.domain.as_str(),
                seconds,
                commit.visits
            ],
        )?;
        Ok(())
    }

    /// Entries for one day, empty when nothing was recorded.
    pub fn read_day(&self, day: DayKey) -> Result<DayLedger, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT domain, seconds, visits
            FROM tracking_data
            WHERE day = ?
            ORDER BY domain ASC
            ",
        )?;
        let rows = stmt.query_map([day.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        let mut entries = DayLedger::new();
        for row in rows {
            let (domain, seconds, visits) = row?;
            entries.insert(parse_domain(domain)?, entry_from_columns(seconds, visits)?);
        }
        Ok(entries)
    }

    /// Loads every day on or after `since` into an in-memory ledger.
    pub fn load_ledger_since(&self, since: DayKey) -> Result<Ledger, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT day, domain, seconds, visits
            FROM tracking_data
            WHERE day >= ?
            ORDER BY day ASC, domain ASC
            ",
        )?;
        let rows = stmt.query_map([since.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;
        let mut parsed = Vec::new();
        for row in rows {
            let (day, domain, seconds, visits) = row?;
            parsed.push((
                parse_day(&day)?,
                parse_domain(domain)?,
                entry_from_columns(seconds, visits)?,
            ));
        }
        Ok(parsed.into_iter().collect())
    }

    /// Distinct domains in the ledger, optionally limited to one day.
    pub fn list_domains(&self, day: Option<DayKey>) -> Result<Vec<Domain>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT DISTINCT domain
            FROM tracking_data
            WHERE ?1 IS NULL OR day = ?1
            ORDER BY domain ASC
            ",
        )?;
        let rows = stmt.query_map([day.map(|d| d.to_string())], |row| row.get::<_, String>(0))?;
        let mut domains = Vec::new();
        for row in rows {
            domains.push(parse_domain(row?)?);
        }
        Ok(domains)
    }

    /// Totals over every recorded day.
    pub fn ledger_stats(&self) -> Result<LedgerStats, DbError> {
        let (days, domains, total, first, last) = self.conn.query_row(
            "
            SELECT COUNT(DISTINCT day), COUNT(DISTINCT domain), COALESCE(SUM(seconds), 0),
                   MIN(day), MAX(day)
            FROM tracking_data
            ",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )?;
        Ok(LedgerStats {
            days: to_u64("day", days)?,
            domains: to_u64("domain", domains)?,
            total_secs: to_u64("seconds", total)?,
            first_day: first.as_deref().map(parse_day).transpose()?,
            last_day: last.as_deref().map(parse_day).transpose()?,
        })
    }

    /// Every cached category keyed by domain.
    pub fn load_categories(&self) -> Result<HashMap<Domain, Category>, DbError> {
        Ok(self
            .list_categories()?
            .into_iter()
            .map(|record| (record.domain, record.category))
            .collect())
    }

    /// Cached categories with their provenance, ordered by domain.
    pub fn list_categories(&self) -> Result<Vec<CategoryRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT domain, category, source, updated_at
            FROM domain_categories
            ORDER BY domain ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (domain, category, source, updated_at) = row?;
            records.push(CategoryRecord {
                domain: parse_domain(domain)?,
                category: category
                    .parse()
                    .map_err(|_| invalid("category", &category))?,
                source: source.parse()?,
                updated_at,
            });
        }
        Ok(records)
    }

    /// Cached category for one domain.
    pub fn category(&self, domain: &str) -> Result<Option<CategoryRecord>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT category, source, updated_at FROM domain_categories WHERE domain = ?",
                [domain],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(category, source, updated_at)| {
            Ok(CategoryRecord {
                domain: parse_domain(domain.to_string())?,
                category: category
                    .parse()
                    .map_err(|_| invalid("category", &category))?,
                source: source.parse()?,
                updated_at,
            })
        })
        .transpose()
    }

    /// Stores classifier answers, keeping any existing row.
    pub fn save_resolved(&mut self, resolved: &[(Domain, Category)]) -> Result<usize, DbError> {
        if resolved.is_empty() {
            return Ok(0);
        }
        let now = format_timestamp_now();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO domain_categories (domain, category, source, updated_at)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for (domain, category) in resolved {
                inserted += stmt.execute(params![
                    domain.as_str(),
                    category.as_str(),
                    CategorySource::Auto.as_str(),
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Stores a manual override, replacing any existing row.
    pub fn save_override(&mut self, domain: &Domain, category: Category) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO domain_categories (domain, category, source, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(domain) DO UPDATE SET
                category = excluded.category,
                source = excluded.source,
                updated_at = excluded.updated_at
            ",
            params![
                domain.as_str(),
                category.as_str(),
                CategorySource::Manual.as_str(),
                format_timestamp_now()
            ],
        )?;
        Ok(())
    }
}

impl LedgerStore for Database {
    type Error = DbError;

    fn commit(&mut self, commit: &Commit) -> Result<(), Self::Error> {
        Self::commit(self, commit)
    }

    fn read(&self, day: DayKey) -> Result<DayLedger, Self::Error> {
        self.read_day(day)
    }
}

impl CategoryStore for Database {
    type Error = DbError;

    fn load_categories(&self) -> Result<HashMap<Domain, Category>, Self::Error> {
        Self::load_categories(self)
    }

    fn save_resolved(&mut self, resolved: &[(Domain, Category)]) -> Result<(), Self::Error> {
        Self::save_resolved(self, resolved).map(|_| ())
    }

    fn save_override(&mut self, domain: &Domain, category: Category) -> Result<(), Self::Error> {
        Self::save_override(self, domain, category)
    }
}

fn invalid(column: &'static str, value: &str) -> DbError {
    DbError::InvalidValue {
        column,
        value: value.to_string(),
    }
}

fn parse_day(value: &str) -> Result<DayKey, DbError> {
    value.parse().map_err(|_| invalid("day", value))
}

fn parse_domain(value: String) -> Result<Domain, DbError> {
    Domain::new(value).map_err(|_| invalid("domain", ""))
}

fn to_u64(column: &'static str, value: i64) -> Result<u64, DbError> {
    u64::try_from(value).map_err(|_| invalid(column, &value.to_string()))
}

fn entry_from_columns(seconds: i64, visits: i64) -> Result<LedgerEntry, DbError> {
    Ok(LedgerEntry {
        seconds: to_u64("seconds", seconds)?,
        visits: u32::try_from(visits).map_err(|_| invalid("visits", &visits.to_string()))?,
    })
}

fn format_timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> DayKey {
        s.parse().unwrap()
    }

    fn domain(s: &str) -> Domain {
        Domain::new(s).unwrap()
    }

    fn commit(day_key: &str, name: &str, seconds: u64) -> Commit {
        Commit {
            day: day(day_key),
            domain: domain(name),
            seconds,
            visits: 1,
        }
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(
            table_columns(&db.conn, "tracking_data"),
            vec!["day", "domain", "seconds", "visits"]
        );
        assert_eq!(
            table_columns(&db.conn, "domain_categories"),
            vec!["domain", "category", "source", "updated_at"]
        );
    }

    #[test]
    fn reopening_file_database_keeps_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wt.db");
        {
            let mut db = Database::open(&path).expect("open db");
            db.commit(&commit("2025-01-15", "a.com", 45)).expect("commit");
        }
        let db = Database::open(&path).expect("reopen db");
        let entries = db.read_day(day("2025-01-15")).expect("read");
        assert_eq!(entries.get("a.com").map(|e| e.seconds), Some(45));
    }

    #[test]
    fn commit_upserts_seconds_and_visits() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.commit(&commit("2025-01-15", "a.com", 45)).expect("commit");
        db.commit(&commit("2025-01-15", "a.com", 60)).expect("commit");
        db.commit(&commit("2025-01-16", "a.com", 5)).expect("commit");

        let entries = db.read_day(day("2025-01-15")).expect("read");
        assert_eq!(
            entries.get("a.com"),
            Some(&LedgerEntry {
                seconds: 105,
                visits: 2
            })
        );
        assert!(db.read_day(day("2030-01-01")).expect("read").is_empty());
    }

    #[test]
    fn commit_rejects_seconds_beyond_column_range() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let result = db.commit(&commit("2025-01-15", "a.com", u64::MAX));
        assert!(matches!(
            result,
            Err(DbError::InvalidValue {
                column: "seconds",
                ..
            })
        ));
    }

    #[test]
    fn load_ledger_since_filters_days() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.commit(&commit("2025-01-10", "a.com", 10)).expect("commit");
        db.commit(&commit("2025-01-15", "b.com", 20)).expect("commit");

        let ledger = db.load_ledger_since(day("2025-01-12")).expect("load");
        let days: Vec<String> = ledger.days().map(|d| d.to_string()).collect();
        assert_eq!(days, vec!["2025-01-15"]);
    }

    #[test]
    fn list_domains_and_stats() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(db.ledger_stats().expect("stats"), LedgerStats::default());

        db.commit(&commit("2025-01-14", "b.com", 10)).expect("commit");
        db.commit(&commit("2025-01-15", "a.com", 20)).expect("commit");
        db.commit(&commit("2025-01-15", "b.com", 30)).expect("commit");

        let all = db.list_domains(None).expect("domains");
        assert_eq!(all, vec![domain("a.com"), domain("b.com")]);
        let one_day = db.list_domains(Some(day("2025-01-14"))).expect("domains");
        assert_eq!(one_day, vec![domain("b.com")]);

        let stats = db.ledger_stats().expect("stats");
        assert_eq!(stats.days, 2);
        assert_eq!(stats.domains, 2);
        assert_eq!(stats.total_secs, 60);
        assert_eq!(stats.first_day, Some(day("2025-01-14")));
        assert_eq!(stats.last_day, Some(day("2025-01-15")));
    }

    #[test]
    fn resolved_categories_never_replace_existing_rows() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.save_override(&domain("youtube.com"), Category::Work)
            .expect("override");

        let inserted = db
            .save_resolved(&[
                (domain("youtube.com"), Category::Entertainment),
                (domain("github.com"), Category::Work),
            ])
            .expect("save");
        assert_eq!(inserted, 1);

        let youtube = db.category("youtube.com").expect("get").expect("row");
        assert_eq!(youtube.category, Category::Work);
        assert_eq!(youtube.source, CategorySource::Manual);

        let github = db.category("github.com").expect("get").expect("row");
        assert_eq!(github.source, CategorySource::Auto);
        assert!(db.category("missing.com").expect("get").is_none());
    }

    #[test]
    fn override_replaces_resolved_row() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.save_resolved(&[(domain("x.com"), Category::Other)])
            .expect("save");
        db.save_override(&domain("x.com"), Category::Social)
            .expect("override");

        let categories = db.load_categories().expect("load");
        assert_eq!(categories.get("x.com"), Some(&Category::Social));
        assert_eq!(db.list_categories().expect("list").len(), 1);
    }

    #[test]
    fn corrupt_category_is_reported() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.conn
            .execute(
                "INSERT INTO domain_categories VALUES ('a.com', 'Gaming', 'auto', '2025-01-15T00:00:00Z')",
                [],
            )
            .expect("insert");
        assert!(matches!(
            db.list_categories(),
            Err(DbError::InvalidValue {
                column: "category",
                ..
            })
        ));
    }
}
