use std::collections::HashMap;

use crate::context::AnalysisContext;
use crate::error::EngineResult;
use crate::types::{AuthorShare, PanicCommit, RecencyDecay, VolatilityResult};

const MAX_WEIGHT: f64 = 3.0;
const HALF_LIFE_DAYS: f64 = 30.0;

/// Per-file panic score, authorship breakdown, and recency decay (§4.6).
/// Never fails: an empty history yields an all-zero result.
pub async fn analyze(target: &str, ctx: &AnalysisContext) -> EngineResult<VolatilityResult> {
    let window = ctx.commit_window().await?;
    let history = window.file_history(target);

    if history.is_empty() {
        return Ok(VolatilityResult::default());
    }

    let now = chrono::Utc::now();
    let keywords = ctx.config.effective_panic_keywords();
    let n = history.len().min(20) as f64;

    let mut weighted_score = 0.0;
    let mut scored: Vec<(f64, f64, &crate::types::Commit)> = Vec::with_capacity(history.len());
    for commit in &history {
        let panic_weight = panic_weight_for(&commit.message, &keywords);
        let days_since = (now - commit.committed_at).num_seconds() as f64 / 86_400.0;
        let decay = 0.5_f64.powf(days_since.max(0.0) / HALF_LIFE_DAYS);
        weighted_score += panic_weight * decay;
        scored.push((panic_weight, decay, commit));
    }

    let panic_score = ((weighted_score / (n * MAX_WEIGHT) * 100.0).min(100.0)).round() as u32;

    // Authorship: group by (name, email).
    let mut authors: HashMap<(String, String), Vec<&crate::types::Commit>> = HashMap::new();
    for commit in &history {
        authors
            .entry((commit.author_name.clone(), commit.author_email.clone()))
            .or_default()
            .push(commit);
    }
    let total = history.len() as f64;
    let mut author_details: Vec<AuthorShare> = authors
        .into_iter()
        .map(|((name, email), commits)| {
            let first_commit = commits.iter().map(|c| c.committed_at).min().unwrap();
            let last_commit = commits.iter().map(|c| c.committed_at).max().unwrap();
            AuthorShare {
                name,
                email,
                commits: commits.len() as u32,
                percentage: (commits.len() as f64 / total * 100.0).round(),
                first_commit,
                last_commit,
            }
        })
        .collect();
    author_details.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.name.cmp(&b.name)));
    let top_author = author_details.first().cloned();

    let oldest = history.iter().map(|c| c.committed_at).min().unwrap();
    let newest = history.iter().map(|c| c.committed_at).max().unwrap();
    let newest_decay = 0.5_f64.powf(((now - newest).num_seconds() as f64 / 86_400.0).max(0.0) / HALF_LIFE_DAYS);
    let recency_decay = RecencyDecay {
        oldest_commit_days: ((now - oldest).num_seconds() / 86_400).max(0) as u32,
        newest_commit_days: ((now - newest).num_seconds() / 86_400).max(0) as u32,
        decay_factor: newest_decay,
    };

    scored.sort_by(|a, b| {
        (b.0 * b.1)
            .partial_cmp(&(a.0 * a.1))
            .unwrap()
            .then_with(|| b.2.committed_at.cmp(&a.2.committed_at))
    });
    let panic_commits: Vec<PanicCommit> = scored
        .into_iter()
        .take(5)
        .map(|(weight, decay, commit)| PanicCommit {
            sha: commit.sha.clone(),
            message: commit.message.clone(),
            weight: weight * decay,
            committed_at: commit.committed_at,
        })
        .collect();

    Ok(VolatilityResult {
        panic_score,
        commit_count: history.len() as u32,
        author_details,
        top_author,
        recency_decay,
        panic_commits,
    })
}

fn panic_weight_for(message: &str, keywords: &HashMap<String, f64>) -> f64 {
    let lowered = message.to_lowercase();
    keywords
        .iter()
        .filter(|(kw, _)| lowered.contains(kw.as_str()))
        .map(|(_, weight)| *weight)
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    #[test]
    fn panic_weight_picks_highest_matching_keyword() {
        let mut kw = Map::new();
        kw.insert("fix".to_string(), 1.0);
        kw.insert("security".to_string(), 3.0);
        assert_eq!(panic_weight_for("fix: security hole", &kw), 3.0);
    }

    #[test]
    fn panic_weight_zero_when_no_keyword_matches() {
        let kw = Map::new();
        assert_eq!(panic_weight_for("add feature", &kw), 0.0);
    }
}
