use std::collections::HashMap;
use std::path::Path;

use regex::Regex;

use crate::cache::{volatility_key, CacheStore};
use crate::context::AnalysisContext;
use crate::engines::volatility;
use crate::error::EngineResult;
use crate::types::{SiblingGuidance, SiblingPattern};

const MAX_SIBLINGS: usize = 5;
const MIN_SIBLINGS_FOR_GUIDANCE: usize = 2;
const MIN_AFFIX_LEN: usize = 3;
const COMMON_IMPORT_THRESHOLD: f64 = 0.5;

/// Guidance derived from files alongside `target` that share its
/// extension, used when `target` has no history of its own (§4.11):
/// average volatility, shared test coverage, common import sources, and
/// detected naming conventions. Returns `None` when fewer than 2
/// qualifying siblings exist.
pub async fn analyze(target: &str, ctx: &AnalysisContext, cache: &CacheStore) -> EngineResult<Option<SiblingGuidance>> {
    let target_path = Path::new(target);
    let Some(ext) = target_path.extension().and_then(|e| e.to_str()) else {
        return Ok(None);
    };
    let dir = target_path.parent().unwrap_or_else(|| Path::new(""));

    let mut siblings = list_siblings(ctx, dir, ext, target);
    siblings.sort();
    if siblings.len() < MIN_SIBLINGS_FOR_GUIDANCE {
        return Ok(None);
    }
    siblings.truncate(MAX_SIBLINGS);

    let mut scores = Vec::with_capacity(siblings.len());
    for sibling in &siblings {
        let sib_abs = ctx.repo_root.join(sibling);
        let result = cache
            .volatility
            .get_or_compute(volatility_key(&sib_abs), || volatility::analyze(sibling, ctx))
            .await?;
        scores.push(result.panic_score);
    }
    let average_panic_score = if scores.is_empty() {
        0
    } else {
        (scores.iter().sum::<u32>() as f64 / scores.len() as f64).round() as u32
    };

    let has_matching_tests = siblings.iter().any(|s| has_sibling_test(ctx, s));

    let mut import_counts: HashMap<String, u32> = HashMap::new();
    let mut contents = Vec::with_capacity(siblings.len());
    for sibling in &siblings {
        let content = std::fs::read_to_string(ctx.repo_root.join(sibling)).unwrap_or_default();
        for source in import_sources(&content) {
            *import_counts.entry(source).or_insert(0) += 1;
        }
        contents.push(content);
    }
    let threshold = (siblings.len() as f64 * COMMON_IMPORT_THRESHOLD).ceil() as u32;
    let mut common_import_sources: Vec<String> = import_counts
        .into_iter()
        .filter(|(_, count)| *count as f64 / siblings.len() as f64 > COMMON_IMPORT_THRESHOLD || *count >= threshold.max(1))
        .map(|(source, _)| source)
        .collect();
    common_import_sources.sort();

    let patterns = naming_patterns(&siblings);

    Ok(Some(SiblingGuidance {
        sampled: siblings,
        average_panic_score,
        has_matching_tests,
        common_import_sources,
        patterns,
    }))
}

fn list_siblings(ctx: &AnalysisContext, dir: &Path, ext: &str, exclude: &str) -> Vec<String> {
    let abs_dir = ctx.repo_root.join(dir);
    let Ok(entries) = std::fs::read_dir(&abs_dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some(ext))
        .filter_map(|e| {
            let rel = dir.join(e.file_name());
            let rel = rel.to_string_lossy().replace('\\', "/");
            (rel != exclude && !ctx.ignore.matches(&rel)).then_some(rel)
        })
        .collect()
}

fn has_sibling_test(ctx: &AnalysisContext, path: &str) -> bool {
    let p = Path::new(path);
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let ext = p.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let dir = p.parent().unwrap_or_else(|| Path::new(""));
    for candidate in [
        dir.join(format!("{stem}.test.{ext}")),
        dir.join(format!("{stem}.spec.{ext}")),
        dir.join("__tests__").join(format!("{stem}.{ext}")),
    ] {
        if ctx.repo_root.join(&candidate).is_file() {
            return true;
        }
    }
    false
}

fn import_sources(content: &str) -> Vec<String> {
    let re = Regex::new(r#"from\s+['"]([^'"]+)['"]"#).unwrap();
    re.captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn naming_patterns(siblings: &[String]) -> Vec<SiblingPattern> {
    let stems: Vec<String> = siblings
        .iter()
        .map(|s| Path::new(s).file_stem().and_then(|x| x.to_str()).unwrap_or_default().to_string())
        .collect();
    if stems.len() < 2 {
        return Vec::new();
    }

    let mut patterns = Vec::new();
    if let Some((affix, count)) = common_prefix(&stems) {
        if affix.chars().count() >= MIN_AFFIX_LEN {
            let confidence = ((count as f64 / stems.len() as f64) * 100.0).round() as u32;
            patterns.push(SiblingPattern {
                description: format!("shared prefix \"{affix}\""),
                confidence,
            });
        }
    }
    if let Some((affix, count)) = common_suffix(&stems) {
        if affix.chars().count() >= MIN_AFFIX_LEN {
            let confidence = ((count as f64 / stems.len() as f64) * 100.0).round() as u32;
            patterns.push(SiblingPattern {
                description: format!("shared suffix \"{affix}\""),
                confidence,
            });
        }
    }
    patterns
}

/// Slices by char index, not byte index: stems may contain multi-byte
/// UTF-8 characters, and a raw `&str[..n]` byte slice would panic on a
/// non-char-boundary offset.
fn common_prefix(stems: &[String]) -> Option<(String, usize)> {
    let first = stems.first()?;
    let first_chars: Vec<char> = first.chars().collect();
    let sibling_chars: Vec<Vec<char>> = stems.iter().map(|s| s.chars().collect()).collect();
    for candidate_len in (1..=first_chars.len()).rev() {
        let prefix: String = first_chars[..candidate_len].iter().collect();
        let count = sibling_chars
            .iter()
            .filter(|chars| chars.len() >= candidate_len && chars[..candidate_len] == first_chars[..candidate_len])
            .count();
        if count == stems.len() {
            return Some((prefix, count));
        }
    }
    None
}

fn common_suffix(stems: &[String]) -> Option<(String, usize)> {
    let first = stems.first()?;
    let first_chars: Vec<char> = first.chars().collect();
    let sibling_chars: Vec<Vec<char>> = stems.iter().map(|s| s.chars().collect()).collect();
    for candidate_len in (1..=first_chars.len()).rev() {
        let start = first_chars.len() - candidate_len;
        let suffix: String = first_chars[start..].iter().collect();
        let count = sibling_chars
            .iter()
            .filter(|chars| {
                chars.len() >= candidate_len && chars[chars.len() - candidate_len..] == first_chars[start..]
            })
            .count();
        if count == stems.len() {
            return Some((suffix, count));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_prefix_detects_shared_start() {
        let stems = vec!["useButton".to_string(), "useToggle".to_string(), "useModal".to_string()];
        let (prefix, count) = common_prefix(&stems).unwrap();
        assert_eq!(prefix, "use");
        assert_eq!(count, 3);
    }

    #[test]
    fn common_suffix_detects_shared_end() {
        let stems = vec!["buttonSlice".to_string(), "modalSlice".to_string()];
        let (suffix, count) = common_suffix(&stems).unwrap();
        assert_eq!(suffix, "Slice");
        assert_eq!(count, 2);
    }

    #[test]
    fn no_common_affix_returns_none() {
        let stems = vec!["alpha".to_string(), "beta".to_string()];
        assert!(common_prefix(&stems).is_none());
        assert!(common_suffix(&stems).is_none());
    }
}
