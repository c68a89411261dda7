use std::io::{self, Write};
use std::time::Duration;

use colored::Colorize;
use futures_util::StreamExt;
use waldo_api::{BackendError, ChunkStream};

/// How completion text is painted while streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    Highlight,
}

/// Print chunks the moment they arrive, strictly in arrival order, and close
/// with the cyan elapsed-time trailer once the terminal chunk is observed.
/// Returns the accumulated response text for the transcript.
pub async fn render_stream(mut stream: ChunkStream, style: Style) -> Result<String, BackendError> {
    let mut accumulated = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if !chunk.text_delta.is_empty() {
            match style {
                Style::Plain => print!("{}", chunk.text_delta),
                Style::Highlight => print!("{}", chunk.text_delta.bright_yellow()),
            }
            let _ = io::stdout().flush();
            accumulated.push_str(&chunk.text_delta);
        }
        if chunk.is_final {
            if let Some(timing) = &chunk.timing {
                print!(
                    "{}",
                    format!("\n\n({})", format_elapsed(timing.elapsed)).cyan()
                );
            }
            println!();
            break;
        }
    }
    Ok(accumulated)
}

/// Compact two-unit rendering of a duration, e.g. "1m 23s" or "4s 120ms".
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if seconds > 0 {
        format!("{seconds}s {millis}ms")
    } else {
        format!("{millis}ms")
    }
}
