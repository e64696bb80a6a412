use std::collections::HashSet;

use regex::Regex;

use super::{candidate_files, read_text, MAX_EDGES};
use crate::context::AnalysisContext;
use crate::error::EngineResult;
use crate::types::{CouplingEdge, CouplingSource};

const MIN_NAME_LEN: usize = 4;
const DENYLIST: &[&str] = &["Props", "State", "Options", "Config", "Data", "Params", "Result", "Response"];

/// Declared type/interface/enum names in `target`'s current contents,
/// matched against their use in other files (§4.10, Type channel).
pub async fn analyze(target: &str, ctx: &AnalysisContext) -> EngineResult<Vec<CouplingEdge>> {
    let Some(content) = read_text(ctx, target) else {
        return Ok(Vec::new());
    };
    let names = declared_names(&content);
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let mut edges = Vec::new();
    for file in candidate_files(ctx, target) {
        let Some(other) = read_text(ctx, &file) else {
            continue;
        };
        let shared = names.iter().filter(|n| word_present(&other, n)).count();
        if shared == 0 {
            continue;
        }
        let score = ((shared as f64 / names.len() as f64) * 100.0).round().min(100.0) as u32;
        edges.push(CouplingEdge {
            file,
            score,
            reason: format!("shares {shared} declared type name(s)"),
            source: CouplingSource::Type,
            evidence: None,
        });
    }

    edges.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.file.cmp(&b.file)));
    edges.truncate(MAX_EDGES);
    Ok(edges)
}

fn declared_names(content: &str) -> Vec<String> {
    let re = Regex::new(r"\b(?:interface|enum|type)\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    let mut seen = HashSet::new();
    re.captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| name.len() > MIN_NAME_LEN.saturating_sub(1))
        .filter(|name| !DENYLIST.contains(&name.as_str()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

fn word_present(haystack: &str, word: &str) -> bool {
    let pattern = format!(r"\b{}\b", regex::escape(word));
    Regex::new(&pattern).map(|re| re.is_match(haystack)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_names_skips_denylisted_and_short() {
        let content = "interface Widget {}\ninterface Props {}\ntype Abc = number;\nenum Status {}";
        let names = declared_names(content);
        assert!(names.contains(&"Widget".to_string()));
        assert!(names.contains(&"Status".to_string()));
        assert!(!names.contains(&"Props".to_string()));
        assert!(!names.contains(&"Abc".to_string()));
    }

    #[test]
    fn word_present_respects_boundaries() {
        assert!(word_present("const w: Widget = {}", "Widget"));
        assert!(!word_present("const w: WidgetFactory = {}", "Widget"));
    }
}
