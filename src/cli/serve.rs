use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ServeArgs {
    /// Repository to serve (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let repo_root = args
        .path
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("invalid path: {e}"))?;
    crate::protocol::run(repo_root).await
}
