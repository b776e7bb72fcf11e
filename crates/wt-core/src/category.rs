//! Domain categorization backed by a write-through cache.
//!
//! Reads are synchronous and cache-only: [`Categorizer::classify`] never
//! waits on the network and answers [`Category::Other`] for unknown domains.
//! Misses are filled by [`Categorizer::resolve_batch`], which asks an
//! external [`Classifier`] once per batch and caches every requested domain,
//! falling back to `Other` for anything the classifier could not answer.
//! A domain is therefore resolved at most once; only
//! [`Categorizer::set_category`] changes a cached value afterwards.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use crate::types::{Category, Domain};

/// Default upper bound for one classification round trip.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(20);

/// External service that assigns categories to domains.
///
/// Responses may be partial: domains missing from the returned map are
/// treated as unclassifiable.
pub trait Classifier {
    type Error: std::error::Error + Send + Sync + 'static;

    fn classify_domains(
        &self,
        domains: &[Domain],
    ) -> impl Future<Output = Result<HashMap<Domain, Category>, Self::Error>> + Send;
}

/// Durable storage for cached categories.
pub trait CategoryStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load_categories(&self) -> Result<HashMap<Domain, Category>, Self::Error>;

    /// Persists automatically resolved categories, keeping existing rows.
    fn save_resolved(&mut self, resolved: &[(Domain, Category)]) -> Result<(), Self::Error>;

    /// Persists a manual override, replacing any existing row.
    fn save_override(&mut self, domain: &Domain, category: Category) -> Result<(), Self::Error>;
}

/// In-memory domain to category map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCache {
    entries: HashMap<Domain, Category>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached category, or `Other` on a miss.
    pub fn classify(&self, domain: &str) -> Category {
        self.get(domain).unwrap_or_default()
    }

    pub fn get(&self, domain: &str) -> Option<Category> {
        self.entries.get(domain).copied()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.entries.contains_key(domain)
    }

    /// Overwrites unconditionally.
    pub fn set(&mut self, domain: Domain, category: Category) {
        self.entries.insert(domain, category);
    }

    /// Inserts only when absent. Returns whether the entry was written.
    pub fn insert_if_absent(&mut self, domain: Domain, category: Category) -> bool {
        match self.entries.entry(domain) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(category);
                true
            }
        }
    }

    /// Distinct domains from `domains` that have no cached category, in
    /// first-seen order.
    pub fn uncached<I>(&self, domains: I) -> Vec<Domain>
    where
        I: IntoIterator<Item = Domain>,
    {
        let mut seen = HashSet::new();
        domains
            .into_iter()
            .filter(|domain| !self.contains(domain.as_str()))
            .filter(|domain| seen.insert(domain.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<HashMap<Domain, Category>> for CategoryCache {
    fn from(entries: HashMap<Domain, Category>) -> Self {
        Self { entries }
    }
}

/// Outcome of one [`Categorizer::resolve_batch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Uncached domains sent to the classifier.
    pub requested: usize,
    /// Domains the classifier answered for.
    pub classified: usize,
    /// Domains cached as `Other` because no answer was usable.
    pub fallback: usize,
}

/// Cache plus its backing store.
#[derive(Debug)]
pub struct Categorizer<S> {
    cache: CategoryCache,
    store: S,
    timeout: Duration,
}

impl<S: CategoryStore> Categorizer<S> {
    /// Loads the cache from `store`.
    pub fn load(store: S) -> Result<Self, S::Error> {
        let cache = CategoryCache::from(store.load_categories()?);
        Ok(Self {
            cache,
            store,
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        })
    }

    /// Bounds how long [`Self::resolve_batch`] waits for the classifier.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub const fn cache(&self) -> &CategoryCache {
        &self.cache
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn classify(&self, domain: &str) -> Category {
        self.cache.classify(domain)
    }

    /// Manual override. Always wins over automatic resolution.
    ///
    /// The cached value changes even when persisting fails; the store error
    /// is returned so the caller can report it.
    pub fn set_category(&mut self, domain: Domain, category: Category) -> Result<(), S::Error> {
        let saved = self.store.save_override(&domain, category);
        self.cache.set(domain, category);
        saved
    }

    /// Resolves every uncached domain in `domains` through `classifier`.
    ///
    /// Never fails: classifier errors, malformed or partial answers and
    /// timeouts all degrade to caching `Other`. Fully cached input makes no
    /// classifier call.
    pub async fn resolve_batch<C, I>(&mut self, classifier: &C, domains: I) -> Resolution
    where
        C: Classifier + Sync,
        I: IntoIterator<Item = Domain>,
    {
        let pending = self.cache.uncached(domains);
        if pending.is_empty() {
            return Resolution::default();
        }

        let answers =
            match tokio::time::timeout(self.timeout, classifier.classify_domains(&pending)).await {
                Ok(Ok(answers)) => answers,
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, count = pending.len(), "classification failed");
                    HashMap::new()
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = self.timeout.as_secs(),
                        count = pending.len(),
                        "classification timed out"
                    );
                    HashMap::new()
                }
            };

        let mut resolution = Resolution {
            requested: pending.len(),
            ..Resolution::default()
        };
        let mut resolved = Vec::with_capacity(pending.len());
        for domain in pending {
            let category = if let Some(category) = answers.get(&domain) {
                resolution.classified += 1;
                *category
            } else {
                resolution.fallback += 1;
                Category::Other
            };
            if self.cache.insert_if_absent(domain.clone(), category) {
                resolved.push((domain, category));
            }
        }

        if let Err(err) = self.store.save_resolved(&resolved) {
            tracing::warn!(error = %err, count = resolved.len(), "failed to persist categories");
        }
        tracing::info!(
            requested = resolution.requested,
            classified = resolution.classified,
            fallback = resolution.fallback,
            "resolved domain categories"
        );
        resolution
    }
}
