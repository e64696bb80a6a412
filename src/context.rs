use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::cache::{context_key, CacheStore};
use crate::config::{max_window_env_cap, Config, Thresholds};
use crate::error::{EngineError, EngineResult};
use crate::git::GitDriver;
use crate::ignore_filter::IgnoreFilter;
use crate::types::CommitWindow;

/// Per-request shared state (§4.5): resolved config, ignore filter, a
/// lazily-parsed commit window, and a handle to `GitDriver`. Scoped to one
/// logical `analyze_file` call; nested analyses on the same file reuse the
/// parent context rather than re-parsing the window.
pub struct AnalysisContext {
    pub repo_root: PathBuf,
    pub config: Config,
    pub ignore: IgnoreFilter,
    pub git: GitDriver,
    window: OnceCell<CommitWindow>,
}

impl AnalysisContext {
    pub fn build(repo_root: &Path) -> EngineResult<Self> {
        let repo_root = repo_root
            .canonicalize()
            .map_err(|_| EngineError::Environment {
                root: repo_root.to_path_buf(),
            })?;
        let config = Config::load(&repo_root).unwrap_or_default();
        let ignore = IgnoreFilter::build(&repo_root, &config);
        let git = GitDriver::new(&repo_root)?;
        Ok(Self {
            repo_root,
            config,
            ignore,
            git,
            window: OnceCell::new(),
        })
    }

    /// Memoized by canonical `repoRoot` (§4.5, §5): concurrent requests
    /// against the same repo share one `AnalysisContext`, and therefore one
    /// `CommitWindow` parse, via `CacheStore`'s single-flight `contexts`
    /// cache.
    pub async fn shared(cache: &CacheStore, repo_root: &Path) -> EngineResult<Arc<Self>> {
        let canon = repo_root
            .canonicalize()
            .map_err(|_| EngineError::Environment {
                root: repo_root.to_path_buf(),
            })?;
        let key = context_key(&canon);
        cache
            .contexts
            .get_or_compute(key, || async move { Self::build(&canon).map(Arc::new) })
            .await
    }

    /// Window size for the initial `git log` call: explicit config override,
    /// else the 50-commit default, clamped by `MEMORIA_MAX_WINDOW` and the
    /// hard 1..200 bound (§3, §6). This value seeds the single `log_window`
    /// call; the *adaptive* model in `Config::adaptive_thresholds` then
    /// derives couplingThreshold/driftDays from the commits it actually
    /// found, rather than re-sizing the window retroactively — see
    /// DESIGN.md for this Open-Question resolution.
    fn initial_window_size(&self) -> u32 {
        let configured = self
            .config
            .configured_window()
            .unwrap_or(Thresholds::default().analysis_window);
        let capped = max_window_env_cap().unwrap_or(200);
        configured.clamp(1, capped.min(200))
    }

    /// Lazily computed on first access; concurrent accessors on the same
    /// context observe one parse (`tokio::sync::OnceCell` semantics).
    pub async fn commit_window(&self) -> EngineResult<&CommitWindow> {
        self.window
            .get_or_try_init(|| async {
                let n = self.initial_window_size();
                self.git.log_window(n, &self.ignore).await
            })
            .await
    }

    /// Velocity-derived coupling/drift thresholds for the window already
    /// fetched, with explicit config overrides applied.
    pub async fn thresholds(&self) -> EngineResult<Thresholds> {
        let window = self.commit_window().await?;
        let commits_per_week = commits_per_week(window);
        Ok(self
            .config
            .adaptive_thresholds(commits_per_week, window.commits.len() as u32))
    }
}

fn commits_per_week(window: &CommitWindow) -> f64 {
    let commits = &window.commits;
    if commits.len() < 2 {
        return 0.0;
    }
    let newest = commits.first().unwrap().committed_at;
    let oldest = commits.last().unwrap().committed_at;
    let span_days = (newest - oldest).num_seconds() as f64 / 86_400.0;
    if span_days <= 0.0 {
        return commits.len() as f64 * 7.0;
    }
    commits.len() as f64 / (span_days / 7.0)
}
