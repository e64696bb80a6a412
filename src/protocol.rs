use std::io::{BufRead, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::cache::CacheStore;
use crate::pipeline;
use crate::types::HistoryMode;

/// One newline-delimited JSON-RPC-style request (§6). `id` is echoed back
/// verbatim so callers can match responses out of order.
#[derive(Debug, Deserialize)]
struct Request {
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ResponseError>,
}

#[derive(Debug, Serialize)]
struct ResponseError {
    code: i32,
    message: String,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    fn err(id: Value, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ResponseError { code: -32000, message: message.into() }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeFileParams {
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvalidateCacheParams {
    #[serde(default)]
    prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AskHistoryParams {
    query: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    mode: Option<HistoryMode>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    start_line: Option<u32>,
    #[serde(default)]
    end_line: Option<u32>,
}

/// Runs the stdio server loop: one JSON request per line on stdin, one
/// JSON response per line on stdout. Stdout carries only protocol
/// frames; all diagnostics go to stderr via `tracing` (§6).
pub async fn run(repo_root: PathBuf) -> anyhow::Result<()> {
    let cache = CacheStore::new();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    info!(repo_root = %repo_root.display(), "memoria stdio server ready");

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(err) => {
                warn!(error = %err, "discarding malformed request line");
                continue;
            }
        };

        let response = dispatch(&repo_root, &cache, request).await;
        let serialized = serde_json::to_string(&response)?;
        writeln!(stdout, "{serialized}")?;
        stdout.flush()?;
    }

    Ok(())
}

async fn dispatch(repo_root: &std::path::Path, cache: &CacheStore, request: Request) -> Response {
    let Request { id, method, params } = request;

    match method.as_str() {
        "analyze_file" => match serde_json::from_value::<AnalyzeFileParams>(params) {
            Ok(p) => match pipeline::analyze_file(repo_root, &p.path, cache).await {
                Ok(report) => serde_json::to_value(report)
                    .map(|v| Response::ok(id.clone(), v))
                    .unwrap_or_else(|e| Response::err(id.clone(), e.to_string())),
                Err(e) => {
                    error!(error = %e, "analyze_file failed");
                    Response::err(id, e.to_string())
                }
            },
            Err(e) => Response::err(id, format!("invalid params: {e}")),
        },
        "ask_history" => match serde_json::from_value::<AskHistoryParams>(params) {
            Ok(p) => match handle_ask_history(repo_root, cache, p).await {
                Ok(output) => serde_json::to_value(output)
                    .map(|v| Response::ok(id.clone(), v))
                    .unwrap_or_else(|e| Response::err(id.clone(), e.to_string())),
                Err(e) => {
                    error!(error = %e, "ask_history failed");
                    Response::err(id, e.to_string())
                }
            },
            Err(e) => Response::err(id, format!("invalid params: {e}")),
        },
        "invalidate_cache" => match serde_json::from_value::<InvalidateCacheParams>(params) {
            Ok(p) => {
                match p.prefix {
                    Some(prefix) => cache.invalidate(&prefix),
                    None => cache.clear(),
                }
                Response::ok(id, serde_json::json!({ "invalidated": true }))
            }
            Err(e) => Response::err(id, format!("invalid params: {e}")),
        },
        other => Response::err(id, format!("unknown method: {other}")),
    }
}

async fn handle_ask_history(
    repo_root: &std::path::Path,
    cache: &CacheStore,
    params: AskHistoryParams,
) -> crate::error::EngineResult<crate::types::HistorySearchOutput> {
    let ctx = crate::context::AnalysisContext::shared(cache, repo_root).await?;
    let line_range = match (params.start_line, params.end_line) {
        (Some(s), Some(e)) => Some((s, e)),
        _ => None,
    };
    crate::engines::history::ask_history(
        &ctx,
        cache,
        &params.query,
        params.path.as_deref(),
        params.mode.unwrap_or_default(),
        params.limit,
        line_range,
    )
    .await
}
