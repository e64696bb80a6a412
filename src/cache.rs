use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::context::AnalysisContext;
use crate::error::EngineError;
use crate::types::{AnalysisReport, CouplingEdge, DriftItem, HistorySearchOutput, Importer, SiblingGuidance, VolatilityResult};

const TTL: Duration = Duration::from_secs(5 * 60);
const CAPACITY: u64 = 100;

/// A single keyed, TTL+LRU, single-flight cache for one result type.
///
/// Grounded on `ruizrica-drift`'s `moka`-based `ParseCache`: moka's
/// `try_get_with` collapses concurrent misses on the same key into one
/// `init` future (§4.2, §5, testable property 7), and `time_to_live` +
/// `max_capacity` approximate the spec's literal TTL+LRU contract (moka's
/// eviction is TinyLFU-based admission with LRU-like recency weighting, not
/// a textbook LRU list — documented in DESIGN.md as an accepted
/// approximation).
pub struct Cache<V: Clone + Send + Sync + 'static> {
    inner: moka::future::Cache<String, V>,
}

impl<V: Clone + Send + Sync + 'static> Cache<V> {
    fn new() -> Self {
        Self {
            inner: moka::future::Cache::builder()
                .time_to_live(TTL)
                .max_capacity(CAPACITY)
                .support_invalidation_closures()
                .build(),
        }
    }

    /// Single-flight get-or-compute. If `compute` fails the failure is
    /// returned to all waiters and nothing is cached (§4.2).
    pub async fn get_or_compute<F, Fut>(&self, key: String, compute: F) -> Result<V, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, EngineError>>,
    {
        self.inner
            .try_get_with(key, compute())
            .await
            .map_err(|arc_err| (*arc_err).clone())
    }

    pub fn invalidate_prefix(&self, prefix: &str) {
        let prefix = prefix.to_string();
        let _ = self
            .inner
            .invalidate_entries_if(move |k, _v| k.starts_with(prefix.as_str()));
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    #[cfg(test)]
    pub async fn peek(&self, key: &str) -> Option<V> {
        self.inner.get(key).await
    }
}

/// Process-wide store. One `Cache<V>` per result shape, sharing identical
/// TTL/capacity/single-flight policy; this is the one explicit Cache value
/// owned by the process boundary (§9: no module-level globals) — engines
/// receive `&CacheStore` rather than reaching for statics.
pub struct CacheStore {
    /// One `AnalysisContext` per canonical `repoRoot`, shared across
    /// concurrent requests (§4.5, §5: "AnalysisContext construction is
    /// atomic per repoRoot").
    pub contexts: Cache<Arc<AnalysisContext>>,
    pub volatility: Cache<VolatilityResult>,
    pub coupling: Cache<Vec<CouplingEdge>>,
    pub drift: Cache<Vec<DriftItem>>,
    pub importers: Cache<Vec<Importer>>,
    pub type_coupling: Cache<Vec<CouplingEdge>>,
    pub content_coupling: Cache<Vec<CouplingEdge>>,
    pub api_coupling: Cache<Vec<CouplingEdge>>,
    pub test_coupling: Cache<Vec<CouplingEdge>>,
    pub transitive_coupling: Cache<Vec<CouplingEdge>>,
    pub siblings: Cache<Option<SiblingGuidance>>,
    pub report: Cache<AnalysisReport>,
    pub history: Cache<HistorySearchOutput>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self {
            contexts: Cache::new(),
            volatility: Cache::new(),
            coupling: Cache::new(),
            drift: Cache::new(),
            importers: Cache::new(),
            type_coupling: Cache::new(),
            content_coupling: Cache::new(),
            api_coupling: Cache::new(),
            test_coupling: Cache::new(),
            transitive_coupling: Cache::new(),
            siblings: Cache::new(),
            report: Cache::new(),
            history: Cache::new(),
        }
    }
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wired to the `invalidate_cache` JSON-RPC method (§4.2 "Explicit
    /// invalidation"); drops every cached context along with every engine
    /// result.
    pub fn clear(&self) {
        self.contexts.clear();
        self.volatility.clear();
        self.coupling.clear();
        self.drift.clear();
        self.importers.clear();
        self.type_coupling.clear();
        self.content_coupling.clear();
        self.api_coupling.clear();
        self.test_coupling.clear();
        self.transitive_coupling.clear();
        self.siblings.clear();
        self.report.clear();
        self.history.clear();
    }

    /// Wired to the `invalidate_cache` JSON-RPC method when called with a
    /// `prefix`.
    pub fn invalidate(&self, prefix: &str) {
        self.contexts.invalidate_prefix(prefix);
        self.volatility.invalidate_prefix(prefix);
        self.coupling.invalidate_prefix(prefix);
        self.drift.invalidate_prefix(prefix);
        self.importers.invalidate_prefix(prefix);
        self.type_coupling.invalidate_prefix(prefix);
        self.content_coupling.invalidate_prefix(prefix);
        self.api_coupling.invalidate_prefix(prefix);
        self.test_coupling.invalidate_prefix(prefix);
        self.transitive_coupling.invalidate_prefix(prefix);
        self.siblings.invalidate_prefix(prefix);
        self.report.invalidate_prefix(prefix);
        self.history.invalidate_prefix(prefix);
    }
}

/// Canonical, stable cache keys (§4.2). Paths must already be absolute and
/// canonicalized by the caller.
pub fn volatility_key(path: &Path) -> String {
    format!("volatility:{}", path.display())
}

pub fn coupling_key(path: &Path) -> String {
    format!("coupling:{}", path.display())
}

pub fn drift_key(path: &Path) -> String {
    format!("drift:{}", path.display())
}

pub fn importers_key(path: &Path) -> String {
    format!("importers:{}", path.display())
}

pub fn type_coupling_key(path: &Path) -> String {
    format!("type-coupling:{}", path.display())
}

pub fn content_coupling_key(path: &Path) -> String {
    format!("content-coupling:{}", path.display())
}

pub fn api_coupling_key(path: &Path) -> String {
    format!("api-coupling:{}", path.display())
}

pub fn test_coupling_key(path: &Path) -> String {
    format!("test-coupling:{}", path.display())
}

pub fn transitive_coupling_key(path: &Path) -> String {
    format!("transitive-coupling:{}", path.display())
}

pub fn siblings_key(path: &Path, config_key: &str) -> String {
    format!("siblings:{}:{}", path.display(), config_key)
}

pub fn report_key(path: &Path) -> String {
    format!("report:{}", path.display())
}

pub fn context_key(repo_root: &Path) -> String {
    format!("config:{}", repo_root.display())
}

pub fn history_key(
    query: &str,
    path: Option<&str>,
    mode: &str,
    line_range: Option<(u32, u32)>,
) -> String {
    let path = path.unwrap_or("");
    match line_range {
        Some((a, b)) => format!("history:{query}:{path}:{mode}:L{a}-{b}"),
        None => format!("history:{query}:{path}:{mode}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn single_flight_collapses_concurrent_misses() {
        let cache: Arc<Cache<u32>> = Arc::new(Cache::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(async move {
                cache
                    .get_or_compute("k".to_string(), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok(42)
                    })
                    .await
            });
        }
        let results = futures::future::join_all(handles).await;
        for r in results {
            assert_eq!(r.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_compute_is_not_cached() {
        let cache: Cache<u32> = Cache::new();
        let first = cache
            .get_or_compute("k".to_string(), || async {
                Err(EngineError::GitTransient {
                    reason: "boom".into(),
                })
            })
            .await;
        assert!(first.is_err());
        assert!(cache.peek("k").await.is_none());
    }

    #[test]
    fn keys_follow_documented_conventions() {
        let p = Path::new("/repo/src/a.ts");
        assert_eq!(volatility_key(p), "volatility:/repo/src/a.ts");
        assert_eq!(coupling_key(p), "coupling:/repo/src/a.ts");
        assert_eq!(
            history_key("foo", Some("src/a.ts"), "diff", Some((10, 50))),
            "history:foo:src/a.ts:diff:L10-50"
        );
    }
}
