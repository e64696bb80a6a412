use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::context::AnalysisContext;
use crate::error::EngineResult;
use crate::types::{CouplingEdge, CouplingSource};

const MAX_CHANGED_FILES_PER_COMMIT: usize = 15;
const MAX_EDGES: usize = 5;
const EVIDENCE_FAN_OUT_CAP: usize = 4;

/// Co-change coupling for `target` (§4.7): up to 5 ranked edges with
/// diff evidence attached, fetched with a bounded fan-out so evidence
/// fetches do not starve the other engines running alongside it.
pub async fn analyze(target: &str, ctx: &AnalysisContext) -> EngineResult<Vec<CouplingEdge>> {
    let window = ctx.commit_window().await?;
    let history = window.file_history(target);
    let t = history.len();

    if t < 3 {
        return Ok(Vec::new());
    }

    let thresholds = ctx.thresholds().await?;

    // file -> (co-change count, most recent shared commit sha + subject)
    let mut cochange: HashMap<String, (u32, String, String)> = HashMap::new();
    for commit in &history {
        if commit.changed_files.len() > MAX_CHANGED_FILES_PER_COMMIT {
            continue;
        }
        for f in &commit.changed_files {
            if f == target {
                continue;
            }
            let entry = cochange
                .entry(f.clone())
                .or_insert((0, commit.sha.clone(), commit.message.clone()));
            entry.0 += 1;
            // history is newest-first, so the first commit seen per file is
            // already the most recent; do not overwrite on later (older) hits.
        }
    }

    let mut edges: Vec<(String, u32, String, String)> = cochange
        .into_iter()
        .map(|(file, (count, sha, subject))| {
            let score = ((count as f64 / t as f64) * 100.0).round() as u32;
            (file, score, sha, subject)
        })
        .filter(|(_, score, _, _)| *score >= thresholds.coupling_percent)
        .collect();

    edges.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    edges.truncate(MAX_EDGES);

    let semaphore = Arc::new(Semaphore::new(EVIDENCE_FAN_OUT_CAP));
    let mut tasks = Vec::with_capacity(edges.len());
    for (file, score, sha, subject) in edges {
        let semaphore = semaphore.clone();
        let file_for_diff = file.clone();
        let sha_for_diff = sha.clone();
        tasks.push(async move {
            let _permit = semaphore.acquire().await.expect("semaphore not closed");
            let evidence = ctx.git.show_diff(&sha_for_diff, &file_for_diff).await.ok();
            let change_type = evidence
                .as_ref()
                .map(|e| e.change_type.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let truncated_subject = truncate(&subject, 72);
            CouplingEdge {
                file,
                score,
                reason: format!("co-changed in \"{truncated_subject}\" ({change_type})"),
                source: CouplingSource::Git,
                evidence,
            }
        });
    }

    Ok(futures::future::join_all(tasks).await)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_leaves_short_strings_untouched() {
        assert_eq!(truncate("short", 72), "short");
    }

    #[test]
    fn truncate_ellipsizes_long_strings() {
        let long = "x".repeat(100);
        let result = truncate(&long, 10);
        assert_eq!(result.chars().count(), 10);
        assert!(result.ends_with("..."));
    }
}
