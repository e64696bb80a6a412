use std::collections::HashSet;

use regex::Regex;

use super::{candidate_files, read_text, MAX_EDGES};
use crate::context::AnalysisContext;
use crate::error::EngineResult;
use crate::types::{CouplingEdge, CouplingSource};

/// Endpoint literals and route-definition recognition across common
/// server frameworks (§4.10, API channel). `target` is classified as
/// either a route definer or a route consumer; the opposite role is then
/// searched for among other files sharing a normalized endpoint.
pub async fn analyze(target: &str, ctx: &AnalysisContext) -> EngineResult<Vec<CouplingEdge>> {
    let Some(content) = read_text(ctx, target) else {
        return Ok(Vec::new());
    };
    let endpoints = normalized_endpoints(&content);
    if endpoints.is_empty() {
        return Ok(Vec::new());
    }
    let target_is_definer = is_route_definition(&content);

    let mut edges = Vec::new();
    for file in candidate_files(ctx, target) {
        let Some(other) = read_text(ctx, &file) else {
            continue;
        };
        let other_endpoints = normalized_endpoints(&other);
        let shared: Vec<&String> = endpoints.intersection(&other_endpoints).collect();
        if shared.is_empty() {
            continue;
        }
        let other_is_definer = is_route_definition(&other);
        // Opposite roles only: a definer pairs with consumers and vice versa.
        if target_is_definer == other_is_definer {
            continue;
        }
        let score = ((shared.len() as f64 / endpoints.len() as f64) * 100.0).round().min(100.0) as u32;
        let reason = if target_is_definer {
            format!("consumes endpoint {}", shared[0])
        } else {
            format!("defines endpoint {}", shared[0])
        };
        edges.push(CouplingEdge {
            file,
            score,
            reason,
            source: CouplingSource::Api,
            evidence: None,
        });
    }

    edges.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.file.cmp(&b.file)));
    edges.truncate(MAX_EDGES);
    Ok(edges)
}

fn normalized_endpoints(content: &str) -> HashSet<String> {
    let re = Regex::new(r#"["'](/(?:api|v1|v2)/[A-Za-z0-9/_\-:{}]*)["']"#).unwrap();
    let param = Regex::new(r"(:[A-Za-z_][A-Za-z0-9_]*|\{[A-Za-z_][A-Za-z0-9_]*\})").unwrap();
    re.captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .map(|ep| param.replace_all(ep, "*").to_string())
        .collect()
}

fn is_route_definition(content: &str) -> bool {
    let re = Regex::new(
        r"(?x)
        (app|router)\s*\.\s*(get|post|put|delete|patch)\s*\(
        | @(Get|Post|Put|Delete|Patch)Mapping?\s*\(
        | @RequestMapping\s*\(
        | class\s+\w+Controller\b
        | export\s+(default\s+)?(async\s+)?function\s+(GET|POST|PUT|DELETE|PATCH)\s*\(
        ",
    )
    .unwrap();
    re.is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dynamic_segments() {
        let content = r#"router.get("/api/users/:id/posts", handler);"#;
        let endpoints = normalized_endpoints(content);
        assert!(endpoints.contains("/api/users/*/posts"));
    }

    #[test]
    fn recognizes_express_and_nest_definitions() {
        assert!(is_route_definition(r#"router.get("/api/x", h)"#));
        assert!(is_route_definition("@GetMapping(\"/v1/x\")"));
        assert!(!is_route_definition(r#"fetch("/api/x")"#));
    }
}
