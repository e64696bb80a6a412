use crate::cache::{history_key, CacheStore};
use crate::context::AnalysisContext;
use crate::error::EngineResult;
use crate::types::{HistoryMatch, HistoryMode, HistorySearchOutput};

const DEFAULT_LIMIT: u32 = 20;

/// `ask_history` (§6, §8 S6): searches commit messages and/or diffs for
/// `query`, optionally scoped to `path` and a line range. `startLine >
/// endLine` is treated as a vacuous range and short-circuits to an empty
/// result without touching git.
#[allow(clippy::too_many_arguments)]
pub async fn ask_history(
    ctx: &AnalysisContext,
    cache: &CacheStore,
    query: &str,
    path: Option<&str>,
    mode: HistoryMode,
    limit: Option<u32>,
    line_range: Option<(u32, u32)>,
) -> EngineResult<HistorySearchOutput> {
    if let Some((start, end)) = line_range {
        if start > end {
            return Ok(HistorySearchOutput {
                results: Vec::new(),
                total_found: 0,
            });
        }
    }

    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    let mode_key = mode_str(mode);
    let key = history_key(query, path, mode_key, line_range);

    cache
        .history
        .get_or_compute(key, || compute(ctx, query, path, mode, limit, line_range))
        .await
}

async fn compute(
    ctx: &AnalysisContext,
    query: &str,
    path: Option<&str>,
    mode: HistoryMode,
    limit: u32,
    line_range: Option<(u32, u32)>,
) -> EngineResult<HistorySearchOutput> {
    let commits = match (line_range, path) {
        (Some((start, end)), Some(p)) => ctx.git.log_line_range(p, start, end, limit).await?,
        _ => ctx.git.log_pickaxe(query, path, limit).await?,
    };

    let mut results = Vec::with_capacity(commits.len());
    for commit in &commits {
        let diff = if matches!(mode, HistoryMode::Diff | HistoryMode::Both) {
            match path {
                Some(p) => ctx.git.show_diff(&commit.sha, p).await.ok(),
                None => None,
            }
        } else {
            None
        };
        results.push(HistoryMatch {
            sha: commit.sha.clone(),
            message: commit.message.clone(),
            match_type: mode,
            diff,
        });
    }

    let total_found = results.len() as u32;
    Ok(HistorySearchOutput { results, total_found })
}

fn mode_str(mode: HistoryMode) -> &'static str {
    match mode {
        HistoryMode::Message => "message",
        HistoryMode::Diff => "diff",
        HistoryMode::Both => "both",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_str_matches_wire_names() {
        assert_eq!(mode_str(HistoryMode::Message), "message");
        assert_eq!(mode_str(HistoryMode::Diff), "diff");
        assert_eq!(mode_str(HistoryMode::Both), "both");
    }
}
