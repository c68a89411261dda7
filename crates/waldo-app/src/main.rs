//! waldo — an interactive terminal assistant
//!
//! Reads commands from a REPL, routes model calls to the backend selected by
//! the current model identifier and renders streamed completions as they
//! arrive. A local inference server is spawned once in the background at
//! startup; cloud backends are reached with keys supplied by the
//! environment.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

mod cli;
mod commands;
mod config;
mod images;
mod logging;
mod render;
mod repl;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up MODEL and API keys from a .env file if one exists.
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();
    let config = config::from_env(&cli);

    // Long-lived sibling process; dispatch never joins it.
    let _server = if cli.no_serve {
        None
    } else {
        server::spawn_local_server(&config.ollama_host)
    };

    println!("{}", "waldo.".bright_white().bold());
    repl::run(&cli, config).await
}
