use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::cache::CacheStore;
use crate::context::AnalysisContext;
use crate::engines::history;
use crate::types::HistoryMode;

#[derive(Args)]
pub struct HistoryArgs {
    /// Repository root
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Search query (use "" to list history unfiltered by a pickaxe term)
    query: String,

    /// Scope the search to a single file
    #[arg(long)]
    path: Option<String>,

    /// "message", "diff", or "both"
    #[arg(long, default_value = "message")]
    mode: String,

    /// Maximum number of matches
    #[arg(long, short = 'n')]
    limit: Option<u32>,

    /// Inclusive start line for a `-L` line-range search (requires `--path`)
    #[arg(long)]
    start_line: Option<u32>,

    /// Inclusive end line for a `-L` line-range search (requires `--path`)
    #[arg(long)]
    end_line: Option<u32>,
}

pub async fn run(args: HistoryArgs) -> Result<()> {
    let repo_root = args
        .repo
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("invalid path: {e}"))?;
    let cache = CacheStore::new();
    let ctx = AnalysisContext::shared(&cache, &repo_root).await?;

    let mode = match args.mode.as_str() {
        "message" => HistoryMode::Message,
        "diff" => HistoryMode::Diff,
        "both" => HistoryMode::Both,
        other => anyhow::bail!("unknown mode '{other}', expected message/diff/both"),
    };
    let line_range = match (args.start_line, args.end_line) {
        (Some(s), Some(e)) => Some((s, e)),
        _ => None,
    };

    let output = history::ask_history(&ctx, &cache, &args.query, args.path.as_deref(), mode, args.limit, line_range).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
