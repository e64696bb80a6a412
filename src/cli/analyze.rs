use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::cache::CacheStore;
use crate::pipeline;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Repository root
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Repo-relative path of the file to analyze
    path: String,
}

pub async fn run(args: AnalyzeArgs) -> Result<()> {
    let repo_root = args
        .repo
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("invalid path: {e}"))?;
    let cache = CacheStore::new();
    let report = pipeline::analyze_file(&repo_root, &args.path, &cache).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
