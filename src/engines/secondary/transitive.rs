use std::path::Path;

use regex::Regex;

use super::{candidate_files, read_text, MAX_EDGES};
use crate::context::AnalysisContext;
use crate::error::EngineResult;
use crate::types::{CouplingEdge, CouplingSource};

/// Barrel (`index.*`) re-exports of `target`, and the files that import
/// those barrels rather than `target` directly (§4.10, Transitive
/// channel). Surfaces coupling that a direct-import search would miss.
pub async fn analyze(target: &str, ctx: &AnalysisContext) -> EngineResult<Vec<CouplingEdge>> {
    let stem = file_stem(target);
    if stem.is_empty() {
        return Ok(Vec::new());
    }

    let files = candidate_files(ctx, target);
    let mut barrels = Vec::new();
    let mut edges = Vec::new();

    for file in &files {
        if !is_barrel(file) {
            continue;
        }
        let Some(content) = read_text(ctx, file) else {
            continue;
        };
        if re_exports(&content, &stem) {
            barrels.push(file.clone());
            edges.push(CouplingEdge {
                file: file.clone(),
                score: 100,
                reason: "re-exports via barrel".to_string(),
                source: CouplingSource::Transitive,
                evidence: None,
            });
        }
    }

    if barrels.is_empty() {
        return Ok(Vec::new());
    }

    for file in &files {
        if barrels.contains(file) || file == target {
            continue;
        }
        let Some(content) = read_text(ctx, file) else {
            continue;
        };
        for barrel in &barrels {
            if imports_barrel(&content, barrel) {
                edges.push(CouplingEdge {
                    file: file.clone(),
                    score: 80,
                    reason: format!("imports via {barrel} (indirect)"),
                    source: CouplingSource::Transitive,
                    evidence: None,
                });
                break;
            }
        }
    }

    edges.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.file.cmp(&b.file)));
    edges.truncate(MAX_EDGES);
    Ok(edges)
}

fn file_stem(path: &str) -> String {
    Path::new(path).file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string()
}

fn is_barrel(path: &str) -> bool {
    file_stem(path) == "index"
}

fn re_exports(content: &str, stem: &str) -> bool {
    let pattern = format!(r#"export\s+(\*|\{{[^}}]*\}})\s+from\s+['"]\S*{}\S*['"]"#, regex::escape(stem));
    Regex::new(&pattern).map(|re| re.is_match(content)).unwrap_or(false)
}

fn imports_barrel(content: &str, barrel_path: &str) -> bool {
    let barrel_dir = Path::new(barrel_path).parent().and_then(|p| p.to_str()).unwrap_or("");
    if barrel_dir.is_empty() {
        return false;
    }
    let dir_name = barrel_dir.rsplit('/').next().unwrap_or(barrel_dir);
    let pattern = format!(r#"from\s+['"]\S*{}(/index)?['"]"#, regex::escape(dir_name));
    Regex::new(&pattern).map(|re| re.is_match(content)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_barrel_files() {
        assert!(is_barrel("src/widgets/index.ts"));
        assert!(!is_barrel("src/widgets/button.ts"));
    }

    #[test]
    fn detects_star_and_named_reexports() {
        assert!(re_exports("export * from './button';", "button"));
        assert!(re_exports("export { Button } from './button';", "button"));
        assert!(!re_exports("export const x = 1;", "button"));
    }
}
