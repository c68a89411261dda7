use std::process::Stdio;

use colored::Colorize;
use tokio::process::{Child, Command};

/// Spawn the local inference server as a detached background child.
///
/// The server is a long-lived sibling of the REPL: no dispatch call manages
/// or joins it, and the two only talk over the configured address. A missing
/// binary is reported once and waldo keeps running against whatever is
/// already listening there.
pub fn spawn_local_server(host: &str) -> Option<Child> {
    match Command::new("ollama")
        .arg("serve")
        .env("OLLAMA_HOST", host)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => Some(child),
        Err(e) => {
            eprintln!(
                "{} could not start local server: {}",
                "warning:".yellow(),
                e
            );
            None
        }
    }
}
