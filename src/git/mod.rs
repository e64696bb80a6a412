mod parse;

pub use parse::{has_breaking_change, infer_change_type, LOG_FORMAT};

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::ignore_filter::IgnoreFilter;
use crate::types::{ChangeType, Commit, CommitWindow, DiffSummary};

/// Runs git rooted at a discovered repository root and turns its stdout
/// into structured records (§4.1). Grounded on `bobbin`'s
/// `index/git.rs::GitAnalyzer`: a thin subprocess wrapper rather than
/// `git2`, since that is the teacher's own idiom for git interaction.
///
/// Every public operation spawns the actual subprocess on a blocking
/// worker thread (`tokio::task::spawn_blocking`) so the fan-out described
/// in §5 gets real OS-level concurrency rather than serializing behind
/// the async runtime's worker threads.
#[derive(Clone)]
pub struct GitDriver {
    repo_root: PathBuf,
}

impl GitDriver {
    /// Verifies the repo root is git-discoverable. A missing `git`
    /// executable or a non-repository root both surface as
    /// `EngineError::Environment`, which callers cache for the process
    /// lifetime per §7.
    pub fn new(repo_root: &Path) -> EngineResult<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--git-dir"])
            .current_dir(repo_root)
            .output()
            .map_err(|_| EngineError::Environment {
                root: repo_root.to_path_buf(),
            })?;

        if !output.status.success() {
            return Err(EngineError::Environment {
                root: repo_root.to_path_buf(),
            });
        }

        Ok(Self {
            repo_root: repo_root.to_path_buf(),
        })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Runs git, retrying once on a transient (non-zero-exit, no
    /// recognizable cause) failure. Persistent failure returns
    /// `GitTransient` with a `reason` for the caller to attach (§7).
    fn run_blocking(repo_root: &Path, args: &[String]) -> EngineResult<Output> {
        for attempt in 0..2 {
            match Command::new("git").args(args).current_dir(repo_root).output() {
                Ok(output) if output.status.success() => return Ok(output),
                Ok(output) => {
                    if attempt == 0 {
                        warn!(args = ?args, "git command failed, retrying once");
                        continue;
                    }
                    let reason = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    return Err(EngineError::GitTransient {
                        reason: if reason.is_empty() {
                            "git failed".to_string()
                        } else {
                            reason
                        },
                    });
                }
                Err(_) => {
                    if attempt == 0 {
                        continue;
                    }
                    return Err(EngineError::GitTransient {
                        reason: "git failed".to_string(),
                    });
                }
            }
        }
        unreachable!("loop always returns within two attempts")
    }

    async fn spawn(repo_root: PathBuf, args: Vec<String>) -> EngineResult<Output> {
        tokio::task::spawn_blocking(move || Self::run_blocking(&repo_root, &args))
            .await
            .unwrap_or_else(|_| {
                Err(EngineError::GitTransient {
                    reason: "git worker task panicked".to_string(),
                })
            })
    }

    /// Last `n` commits on the current branch, changed-files filtered
    /// through `ignore`. An empty branch yields an empty window rather
    /// than an error (§4.1).
    pub async fn log_window(&self, n: u32, ignore: &IgnoreFilter) -> EngineResult<CommitWindow> {
        let args = vec![
            "log".to_string(),
            "-n".to_string(),
            n.to_string(),
            format!("--format={LOG_FORMAT}"),
            "--name-only".to_string(),
        ];
        let output = match Self::spawn(self.repo_root.clone(), args).await {
            Ok(output) => output,
            Err(EngineError::GitTransient { .. }) => return Ok(CommitWindow::default()),
            Err(e) => return Err(e),
        };
        let raw = String::from_utf8_lossy(&output.stdout);
        let mut commits = parse::parse_log_window(&raw);
        for commit in &mut commits {
            commit.changed_files = ignore.retain_allowed(commit.changed_files.iter().map(String::as_str));
        }
        // §3 invariant: commits touching more than 15 files after filtering
        // are dropped from coupling scoring but retained for volatility —
        // enforced by CouplingEngine at consumption time, not here, since
        // VolatilityEngine still needs the full commit.
        Ok(CommitWindow { commits })
    }

    /// Unified diff of `file` at `sha` against its parent, parsed into a
    /// `DiffSummary` (§4.1). Additions/removals capped at 10 lines, each
    /// ≤120 chars with an ellipsis.
    pub async fn show_diff(&self, sha: &str, file: &str) -> EngineResult<DiffSummary> {
        let args = vec![
            "show".to_string(),
            "--unified=0".to_string(),
            "--format=".to_string(),
            sha.to_string(),
            "--".to_string(),
            file.to_string(),
        ];
        let output = match Self::spawn(self.repo_root.clone(), args).await {
            Ok(output) => output,
            Err(EngineError::GitTransient { .. }) => return Ok(empty_diff_summary()),
            Err(e) => return Err(e),
        };
        let raw = String::from_utf8_lossy(&output.stdout);
        let diff = parse::parse_unified_diff(&raw);

        let has_breaking_change = has_breaking_change(&diff.removals);
        let change_type = infer_change_type(file, &diff.additions, &diff.removals);
        let net_change = diff.additions.len() as i32 - diff.removals.len() as i32;

        Ok(DiffSummary {
            additions: cap_lines(diff.additions),
            removals: cap_lines(diff.removals),
            hunks: diff.hunks,
            net_change,
            has_breaking_change,
            change_type,
        })
    }

    /// `git grep -l -E <pattern>`, returning matching repo-relative paths.
    pub async fn grep_index(&self, pattern: &str) -> EngineResult<Vec<String>> {
        let args = vec!["grep".to_string(), "-l".to_string(), "-E".to_string(), pattern.to_string()];
        match Self::spawn(self.repo_root.clone(), args).await {
            Ok(output) => Ok(parse::parse_path_list(&String::from_utf8_lossy(&output.stdout))),
            Err(EngineError::GitTransient { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// `git log -S/-G <query> [-- pathFilter] -n limit`, parsed into
    /// `Commit` records (changed files unfiltered — callers apply
    /// IgnoreFilter if needed).
    pub async fn log_pickaxe(&self, query: &str, path_filter: Option<&str>, limit: u32) -> EngineResult<Vec<Commit>> {
        let flag = if is_regex_query(query) { "-G" } else { "-S" };
        let mut args = vec![
            "log".to_string(),
            flag.to_string(),
            query.to_string(),
            "-n".to_string(),
            limit.to_string(),
            format!("--format={LOG_FORMAT}"),
            "--name-only".to_string(),
        ];
        if let Some(path) = path_filter {
            args.push("--".to_string());
            args.push(path.to_string());
        }
        match Self::spawn(self.repo_root.clone(), args).await {
            Ok(output) => Ok(parse::parse_log_window(&String::from_utf8_lossy(&output.stdout))),
            Err(EngineError::GitTransient { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// `git log -L start,end:file -n limit`.
    pub async fn log_line_range(&self, file: &str, start: u32, end: u32, limit: u32) -> EngineResult<Vec<Commit>> {
        let args = vec![
            "log".to_string(),
            format!("-L{start},{end}:{file}"),
            "-n".to_string(),
            limit.to_string(),
            format!("--format={LOG_FORMAT}"),
        ];
        match Self::spawn(self.repo_root.clone(), args).await {
            Ok(output) => Ok(parse::parse_log_window(&String::from_utf8_lossy(&output.stdout))),
            Err(EngineError::GitTransient { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

fn is_regex_query(query: &str) -> bool {
    query.chars().any(|c| "[](){}.*+?^$|\\".contains(c))
}

fn cap_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .take(10)
        .map(|l| {
            if l.chars().count() > 120 {
                let truncated: String = l.chars().take(117).collect();
                format!("{truncated}...")
            } else {
                l
            }
        })
        .collect()
}

fn empty_diff_summary() -> DiffSummary {
    DiffSummary {
        additions: Vec::new(),
        removals: Vec::new(),
        hunks: 0,
        net_change: 0,
        has_breaking_change: false,
        change_type: ChangeType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn setup_test_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        let run = |args: &[&str]| {
            StdCommand::new("git")
                .args(args)
                .current_dir(dir.path())
                .output()
                .unwrap();
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "Test"]);
        dir
    }

    fn commit_file(dir: &TempDir, path: &str, content: &str, message: &str) {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full, content).unwrap();
        StdCommand::new("git").args(["add", "."]).current_dir(dir.path()).output().unwrap();
        StdCommand::new("git")
            .args(["commit", "-q", "-m", message])
            .current_dir(dir.path())
            .output()
            .unwrap();
    }

    #[test]
    fn new_fails_on_non_repository() {
        let dir = TempDir::new().unwrap();
        assert!(GitDriver::new(dir.path()).is_err());
    }

    #[test]
    fn new_succeeds_on_repository() {
        let dir = setup_test_repo();
        assert!(GitDriver::new(dir.path()).is_ok());
    }

    #[tokio::test]
    async fn log_window_empty_branch_returns_empty() {
        let dir = setup_test_repo();
        let driver = GitDriver::new(dir.path()).unwrap();
        let ignore = IgnoreFilter::build(dir.path(), &crate::config::Config::default());
        let window = driver.log_window(50, &ignore).await.unwrap();
        assert!(window.commits.is_empty());
    }

    #[tokio::test]
    async fn log_window_parses_real_commits() {
        let dir = setup_test_repo();
        commit_file(&dir, "a.ts", "one", "first commit");
        commit_file(&dir, "b.ts", "two", "second commit");
        let driver = GitDriver::new(dir.path()).unwrap();
        let ignore = IgnoreFilter::build(dir.path(), &crate::config::Config::default());
        let window = driver.log_window(50, &ignore).await.unwrap();
        assert_eq!(window.commits.len(), 2);
        assert_eq!(window.commits[0].message, "second commit");
        assert_eq!(window.commits[0].changed_files, vec!["b.ts"]);
    }

    #[tokio::test]
    async fn grep_index_finds_matching_files() {
        let dir = setup_test_repo();
        commit_file(&dir, "a.ts", "import { widget } from './widget';", "add a");
        let driver = GitDriver::new(dir.path()).unwrap();
        let hits = driver.grep_index("widget").await.unwrap();
        assert_eq!(hits, vec!["a.ts".to_string()]);
    }

    #[tokio::test]
    async fn show_diff_reports_additions_and_removals() {
        let dir = setup_test_repo();
        commit_file(&dir, "a.ts", "line one\n", "init");
        commit_file(&dir, "a.ts", "line one\nline two\n", "add line");
        let driver = GitDriver::new(dir.path()).unwrap();
        let output = StdCommand::new("git")
            .args(["log", "--format=%H"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        let sha = String::from_utf8_lossy(&output.stdout).lines().next().unwrap().to_string();
        let summary = driver.show_diff(&sha, "a.ts").await.unwrap();
        assert_eq!(summary.additions, vec!["line two"]);
        assert!(summary.removals.is_empty());
    }
}
