use clap::Parser;
use connectivity_processor::cli::{run, Cli};
use connectivity_processor::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
