use clap::Parser;

/// CLI arguments for waldo
#[derive(Debug, Parser)]
#[command(name = "waldo")]
#[command(about = "Ask questions, search the Internet and query images from your terminal")]
#[command(version)]
pub struct Cli {
    /// Model to start with (overrides MODEL from the environment)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// host:port of the local inference server (overrides OLLAMA_HOST)
    #[arg(long, value_name = "ADDR")]
    pub ollama_host: Option<String>,

    /// Do not spawn the local inference server at startup
    #[arg(long)]
    pub no_serve: bool,

    /// Print request and stream details
    #[arg(short, long)]
    pub verbose: bool,
}
