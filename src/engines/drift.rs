use std::path::Path;
use std::time::SystemTime;

use crate::context::AnalysisContext;
use crate::error::EngineResult;
use crate::types::{CouplingEdge, DriftItem};

const MAX_ITEMS: usize = 5;
const SECONDS_PER_DAY: u64 = 86_400;

/// Staleness between `target` and its already-computed coupled edges
/// (§4.8): files that co-change with `target` but have not been touched
/// in a long time relative to it.
pub async fn analyze(
    target: &str,
    coupled: &[CouplingEdge],
    ctx: &AnalysisContext,
) -> EngineResult<Vec<DriftItem>> {
    let thresholds = ctx.thresholds().await?;
    let drift_seconds = thresholds.drift_days as u64 * SECONDS_PER_DAY;

    let target_mtime = match mtime(&ctx.repo_root.join(target)) {
        Some(m) => m,
        None => return Ok(Vec::new()),
    };

    let mut items = Vec::new();
    for edge in coupled {
        let Some(other_mtime) = mtime(&ctx.repo_root.join(&edge.file)) else {
            // Coupled by history but no longer present on disk; dropped silently.
            continue;
        };
        let delta = target_mtime.abs_diff(other_mtime);
        if delta < drift_seconds {
            continue;
        }
        items.push(DriftItem {
            file: edge.file.clone(),
            days_old: (delta / SECONDS_PER_DAY) as u32,
        });
    }

    items.sort_by(|a, b| b.days_old.cmp(&a.days_old).then_with(|| a.file.cmp(&b.file)));
    items.truncate(MAX_ITEMS);
    Ok(items)
}

fn mtime(path: &Path) -> Option<u64> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    modified.duration_since(SystemTime::UNIX_EPOCH).ok().map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_none() {
        assert!(mtime(Path::new("/nonexistent/does-not-exist-xyz")).is_none());
    }
}
