use anyhow::Result;
use clap::Parser;

mod cache;
mod cli;
mod config;
mod context;
mod engines;
mod error;
mod git;
mod ignore_filter;
mod pipeline;
mod protocol;
mod types;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    cli.run().await
}
