use anyhow::Result;
use clap::Parser;

use utilp::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
