mod analyze;
mod history;
mod serve;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "memoria")]
#[command(about = "Local code-forensics engine: volatility, coupling, drift and risk analysis")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the stdio JSON-RPC server
    Serve(serve::ServeArgs),

    /// Produce a one-shot AnalysisReport for a single file
    Analyze(analyze::AnalyzeArgs),

    /// Search commit history for a query
    History(history::HistoryArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => serve::run(args).await,
            Commands::Analyze(args) => analyze::run(args).await,
            Commands::History(args) => history::run(args).await,
        }
    }
}
