//! ## vanet-cli
//! **Command-line interface of the telemetry analysis pipeline**
//!
//! `vanet analyze` ingests simulation outputs and writes metric tables,
//! `vanet collision-risk` extracts gap/TTC proxies from a netstate dump and
//! `vanet compare` lines up a baseline and a lossy incident run.

use clap::Parser;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run_command(cli).await
}
