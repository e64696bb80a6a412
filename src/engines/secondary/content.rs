use std::collections::HashSet;

use regex::Regex;

use super::{candidate_files, read_text, MAX_EDGES};
use crate::context::AnalysisContext;
use crate::error::EngineResult;
use crate::types::{CouplingEdge, CouplingSource};

const MIN_LITERAL_LEN: usize = 10;
const MIN_SHARED_LITERALS: usize = 2;

/// Shared string-literal content between `target` and other files (§4.10,
/// Content channel). Literals that look like URLs, import paths, MIME
/// types, class-name lists, or single words are excluded as too generic
/// to signal a meaningful relationship.
pub async fn analyze(target: &str, ctx: &AnalysisContext) -> EngineResult<Vec<CouplingEdge>> {
    let Some(content) = read_text(ctx, target) else {
        return Ok(Vec::new());
    };
    let literals = meaningful_literals(&content);
    if literals.len() < MIN_SHARED_LITERALS {
        return Ok(Vec::new());
    }

    let mut edges = Vec::new();
    for file in candidate_files(ctx, target) {
        let Some(other) = read_text(ctx, &file) else {
            continue;
        };
        let other_literals = meaningful_literals(&other);
        let shared = literals.intersection(&other_literals).count();
        if shared < MIN_SHARED_LITERALS {
            continue;
        }
        let score = ((shared as f64 / literals.len() as f64) * 100.0).round().min(100.0) as u32;
        edges.push(CouplingEdge {
            file,
            score,
            reason: format!("shares {shared} string literal(s)"),
            source: CouplingSource::Content,
            evidence: None,
        });
    }

    edges.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.file.cmp(&b.file)));
    edges.truncate(MAX_EDGES);
    Ok(edges)
}

fn meaningful_literals(content: &str) -> HashSet<String> {
    let re = Regex::new(r#"["']([^"'\n]{10,})["']"#).unwrap();
    re.captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .filter(|lit| !is_url(lit))
        .filter(|lit| !is_import_path(lit))
        .filter(|lit| !is_mime_type(lit))
        .filter(|lit| !is_class_name_like(lit))
        .filter(|lit| lit.split_whitespace().count() > 1)
        .collect()
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("//")
}

fn is_import_path(s: &str) -> bool {
    s.starts_with("./") || s.starts_with("../") || s.starts_with('@') || s.starts_with('/')
}

fn is_mime_type(s: &str) -> bool {
    Regex::new(r"^[a-z]+/[a-z0-9.+-]+$").unwrap().is_match(s)
}

/// Heuristic for strings that are really a space-separated list of CSS
/// class names rather than prose (e.g. `"flex items-center gap-2"`).
fn is_class_name_like(s: &str) -> bool {
    s.split_whitespace().all(|tok| tok.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_urls_and_import_paths_and_single_words() {
        let content = r#"
            const a = "https://example.com/path";
            const b = "./widgets/button";
            const c = "hello";
            const d = "Unable to load configuration";
        "#;
        let literals = meaningful_literals(content);
        assert!(!literals.contains("https://example.com/path"));
        assert!(!literals.contains("./widgets/button"));
        assert!(literals.contains("Unable to load configuration"));
    }

    #[test]
    fn excludes_class_name_lists() {
        let content = r#"const cls = "flex items-center gap-2";"#;
        let literals = meaningful_literals(content);
        assert!(literals.is_empty());
    }
}
