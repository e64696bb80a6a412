use std::path::Path;

use super::{candidate_files, MAX_EDGES};
use crate::context::AnalysisContext;
use crate::error::EngineResult;
use crate::types::{CouplingEdge, CouplingSource};

const TEST_DIRS: &[&str] = &["tests", "__tests__"];
const TEST_MARKERS: &[&str] = &[".test.", ".spec."];

/// Maps `target` to its canonical test file(s), or the reverse when
/// `target` is itself a test file (§4.10, Test channel). Never includes
/// `target` itself.
pub async fn analyze(target: &str, ctx: &AnalysisContext) -> EngineResult<Vec<CouplingEdge>> {
    let mut edges = Vec::new();
    if is_test_file(target) {
        let source_stem = source_stem_of_test(target);
        for file in candidate_files(ctx, target) {
            if is_test_file(&file) {
                continue;
            }
            if file_stem(&file) == source_stem {
                edges.push(CouplingEdge {
                    file,
                    score: 100,
                    reason: "tested by this file".to_string(),
                    source: CouplingSource::Test,
                    evidence: None,
                });
            }
        }
    } else {
        let stem = file_stem(target);
        for file in candidate_files(ctx, target) {
            if !is_test_file(&file) {
                continue;
            }
            if source_stem_of_test(&file) == stem {
                edges.push(CouplingEdge {
                    file,
                    score: 100,
                    reason: "canonical test for this file".to_string(),
                    source: CouplingSource::Test,
                    evidence: None,
                });
            }
        }
    }

    edges.sort_by(|a, b| a.file.cmp(&b.file));
    edges.truncate(MAX_EDGES);
    Ok(edges)
}

fn file_stem(path: &str) -> String {
    Path::new(path).file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string()
}

fn is_test_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    TEST_MARKERS.iter().any(|m| lower.contains(m))
        || TEST_DIRS.iter().any(|dir| lower.starts_with(&format!("{dir}/")) || lower.contains(&format!("/{dir}/")))
}

/// Strips `.test`/`.spec` markers (and the leading test directory, if
/// any) from a test file's path to recover the source stem it targets.
fn source_stem_of_test(path: &str) -> String {
    let stem = file_stem(path);
    let mut stripped = stem.clone();
    for marker in TEST_MARKERS {
        let marker_word = marker.trim_matches('.');
        if let Some(idx) = stripped.rfind(&format!(".{marker_word}")) {
            stripped.truncate(idx);
        }
    }
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_test_and_spec_suffix() {
        assert!(is_test_file("src/widgets/button.test.ts"));
        assert!(is_test_file("src/widgets/button.spec.ts"));
        assert!(is_test_file("tests/button.ts"));
        assert!(is_test_file("__tests__/button.ts"));
        assert!(!is_test_file("src/widgets/button.ts"));
    }

    #[test]
    fn source_stem_strips_markers() {
        assert_eq!(source_stem_of_test("src/button.test.ts"), "button");
        assert_eq!(source_stem_of_test("__tests__/button.ts"), "button");
    }
}
