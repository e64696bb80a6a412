use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

use crate::config::{Config, UNIVERSAL_IGNORE};

/// Composes the universal ignore set, the repository's `.gitignore`, and
/// user patterns from `Config` into a single matcher (§4.4).
///
/// Built once per `AnalysisContext` and shared by reference; `matches` is
/// pure and safe to call from any engine without synchronization.
pub struct IgnoreFilter {
    matcher: Gitignore,
}

impl IgnoreFilter {
    pub fn build(repo_root: &Path, config: &Config) -> Self {
        let mut builder = GitignoreBuilder::new(repo_root);
        for pattern in UNIVERSAL_IGNORE {
            // Patterns are static and known-valid; a builder error here would
            // indicate a typo in UNIVERSAL_IGNORE itself.
            let _ = builder.add_line(None, pattern);
        }
        let gitignore_path = repo_root.join(".gitignore");
        if gitignore_path.is_file() {
            // add() returns an Option<Error> for I/O problems reading the
            // file; a missing or unreadable .gitignore degrades to "no
            // additional patterns" rather than failing the whole filter.
            let _ = builder.add(gitignore_path);
        }
        for pattern in &config.ignore {
            let _ = builder.add_line(None, pattern);
        }
        let matcher = builder.build().unwrap_or_else(|_| Gitignore::empty());
        Self { matcher }
    }

    /// Whether `path` (repo-relative) should be excluded from any
    /// CommitWindow.changedFiles, coupling output, importers, or siblings.
    pub fn matches(&self, path: &str) -> bool {
        self.matcher
            .matched(path, path.ends_with('/'))
            .is_ignore()
    }

    pub fn retain_allowed<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        paths
            .into_iter()
            .filter(|p| !self.matches(p))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn universal_set_matches_lockfiles() {
        let dir = TempDir::new().unwrap();
        let filter = IgnoreFilter::build(dir.path(), &Config::default());
        assert!(filter.matches("package-lock.json"));
        assert!(filter.matches("node_modules/left-pad/index.js"));
        assert!(!filter.matches("src/main.rs"));
    }

    #[test]
    fn repo_gitignore_is_respected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "*.generated.ts\n").unwrap();
        let filter = IgnoreFilter::build(dir.path(), &Config::default());
        assert!(filter.matches("src/schema.generated.ts"));
    }

    #[test]
    fn user_patterns_from_config_apply() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.ignore = vec!["fixtures/".to_string()];
        let filter = IgnoreFilter::build(dir.path(), &config);
        assert!(filter.matches("fixtures/sample.json"));
    }

    #[test]
    fn decisions_stable_under_rule_order_permutation() {
        let dir = TempDir::new().unwrap();
        let mut config_a = Config::default();
        config_a.ignore = vec!["*.tmp".to_string(), "scratch/".to_string()];
        let mut config_b = Config::default();
        config_b.ignore = vec!["scratch/".to_string(), "*.tmp".to_string()];
        let filter_a = IgnoreFilter::build(dir.path(), &config_a);
        let filter_b = IgnoreFilter::build(dir.path(), &config_b);
        for path in ["a.tmp", "scratch/file.rs", "src/main.rs"] {
            assert_eq!(filter_a.matches(path), filter_b.matches(path));
        }
    }
}
