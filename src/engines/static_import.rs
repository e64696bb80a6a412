use std::collections::HashSet;
use std::path::Path;

use regex::Regex;

use crate::context::AnalysisContext;
use crate::error::EngineResult;
use crate::types::Importer;

const MAX_HITS: usize = 100;

/// Files whose text references `target`'s stem in an import-like position
/// (§4.9). Deliberately not language-specific: a single regex over
/// `import`/`from`/`require` syntax stands in for every ecosystem at once.
pub async fn analyze(target: &str, ctx: &AnalysisContext) -> EngineResult<Vec<Importer>> {
    let stem = file_stem(target);
    if stem.is_empty() {
        return Ok(Vec::new());
    }
    let pattern = import_pattern(&stem);
    let hits = ctx.git.grep_index(&pattern).await?;

    let mut seen = HashSet::new();
    let mut importers = Vec::new();
    for file in hits {
        if file == target {
            continue;
        }
        if ctx.ignore.matches(&file) {
            continue;
        }
        if seen.insert(file.clone()) {
            importers.push(file);
        }
        if importers.len() >= MAX_HITS {
            break;
        }
    }
    Ok(importers)
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

fn import_pattern(stem: &str) -> String {
    let escaped = regex::escape(stem);
    format!(r#"(import|from|require)\s+['"]\S*{escaped}\S*['"]"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_strips_extension_and_directory() {
        assert_eq!(file_stem("src/widgets/button.tsx"), "button");
    }

    #[test]
    fn import_pattern_matches_common_syntaxes() {
        let pattern = import_pattern("button");
        let re = Regex::new(&pattern).unwrap();
        assert!(re.is_match(r#"import { Button } from "./button";"#));
        assert!(re.is_match(r#"const b = require('../widgets/button');"#));
        assert!(!re.is_match("const button = 1;"));
    }
}
