use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use waldo_api::{extract_image_query, CallOptions, Dispatcher, DEFAULT_EXTRACT_MODEL};
use waldo_types::{render_decision, Backend, Config, ProgressRender, ResponseFormat, Session};

use crate::images;
use crate::logging::ConversationLogger;
use crate::render::{self, Style};

const ASK_PROMPT: &str = "Give immediate, precise and clear answers to questions asked. \
If you do not know the answer, say \"I don't know the answer to this.\".";

const SEARCH_PROMPT: &str = "The following search results has come back from a search engine \
given the query that came from a user. Respond to the original query using the search results. \
Do not add any additional information. Assume the person you are explaining to doesn't know \
anything about the answer. End the response with a list of URLs returned.";

const IMAGE_PROMPT: &str = "Answer the question about a given image. Provide clear details in \
paragraph form, do not answer in point form or with numbered bullets. Only answer what you \
know, do not add any additional details that you do not have the answer to.";

/// Application state shared by the REPL commands.
pub struct App {
    pub session: Session,
    pub dispatcher: Dispatcher,
    pub http: reqwest::Client,
    pub logger: Option<ConversationLogger>,
    pub verbose: bool,
    /// Cancellation token of the in-flight call, cancelled by Ctrl-C.
    active_call: Arc<Mutex<Option<CancellationToken>>>,
}

impl App {
    pub fn new(config: &Config, verbose: bool) -> Self {
        Self {
            session: Session::new(config.model.clone()),
            dispatcher: Dispatcher::new(config),
            http: reqwest::Client::new(),
            logger: None,
            verbose,
            active_call: Arc::new(Mutex::new(None)),
        }
    }

    pub fn active_call_slot(&self) -> Arc<Mutex<Option<CancellationToken>>> {
        Arc::clone(&self.active_call)
    }

    fn begin_call(&self) -> CallOptions {
        let token = CancellationToken::new();
        *self.active_call.lock().unwrap() = Some(token.clone());
        CallOptions::with_cancel(token)
    }

    pub fn end_call(&self) {
        *self.active_call.lock().unwrap() = None;
    }

    async fn log(&mut self, role: &str, content: &str, with_model: bool) {
        let model = with_model.then(|| self.session.model().to_string());
        if let Some(logger) = &mut self.logger {
            logger.log(role, content, model.as_deref()).await;
        }
    }
}

/// Answer a direct question with the current model.
pub async fn ask(app: &mut App, line: &str) -> Result<()> {
    let opts = app.begin_call();
    let stream = app
        .dispatcher
        .dispatch(
            app.session.model(),
            ASK_PROMPT,
            line,
            ResponseFormat::FreeText,
            &opts,
        )
        .await?;
    let answer = render::render_stream(stream, Style::Plain).await?;

    app.log("user", line, false).await;
    app.log("assistant", &answer, true).await;
    Ok(())
}

/// Search the Internet and answer grounded in the results.
///
/// When the search backend is unavailable the call ends here; no augmented
/// prompt is ever dispatched.
pub async fn search(app: &mut App, line: &str) -> Result<()> {
    let results = waldo_search::search(&app.http, line).await?;
    if app.verbose {
        println!(
            "{}",
            format!("{} search hits", results.hits.len()).bright_black()
        );
    }

    let urls: Vec<&str> = results.hits.iter().map(|h| h.url.as_str()).collect();
    let context = serde_json::json!({
        "query": line,
        "search_result": results.formatted,
        "urls": urls,
    })
    .to_string();

    let opts = app.begin_call();
    let stream = app
        .dispatcher
        .dispatch(
            app.session.model(),
            SEARCH_PROMPT,
            &context,
            ResponseFormat::FreeText,
            &opts,
        )
        .await?;
    let answer = render::render_stream(stream, Style::Plain).await?;

    app.log("user", line, false).await;
    app.log("assistant", &answer, true).await;
    Ok(())
}

/// Answer a question about one or more image files named in the utterance.
pub async fn image(app: &mut App, line: &str) -> Result<()> {
    let opts = app.begin_call();

    // Extraction always goes through the local backend.
    let extract_model = if Backend::for_model(app.session.model()) == Backend::Ollama {
        app.session.model().to_string()
    } else {
        DEFAULT_EXTRACT_MODEL.to_string()
    };
    let query =
        extract_image_query(app.dispatcher.local(), &extract_model, line, &opts).await?;
    if app.verbose {
        println!(
            "{}",
            format!(
                "query: {:?} files: {:?}",
                query.instruction, query.file_references
            )
            .bright_black()
        );
    }

    let attachments = images::load_images(&query.file_references)?;
    let stream = app
        .dispatcher
        .dispatch_with_images(
            app.session.model(),
            IMAGE_PROMPT,
            &query.instruction,
            attachments,
            &opts,
        )
        .await?;
    let answer = render::render_stream(stream, Style::Highlight).await?;

    app.log("user", line, false).await;
    app.log("assistant", &answer, true).await;
    Ok(())
}

/// Run a shell tool with combined output capture.
pub fn shell(line: &str) {
    let mut parts = line.split_whitespace();
    let Some(tool) = parts.next() else { return };
    let args: Vec<&str> = parts.collect();
    println!(
        "{} {} {}",
        "executing>".yellow(),
        tool.bright_green().bold(),
        args.join(" ").bright_green().bold()
    );
    match std::process::Command::new(tool).args(&args).output() {
        Ok(output) => {
            if !output.stdout.is_empty() {
                println!("{}", String::from_utf8_lossy(&output.stdout).bright_yellow());
            }
            if !output.status.success() {
                println!("{}", String::from_utf8_lossy(&output.stderr).red());
            }
        }
        Err(e) => println!("{}", e.to_string().red()),
    }
}

/// Pull a model into the local server, rendering monotonic progress.
pub async fn add(app: &mut App, name: &str) -> Result<()> {
    let opts = app.begin_call();
    let elapsed = app
        .dispatcher
        .local()
        .pull(name, &opts, |progress| match render_decision(progress) {
            ProgressRender::Percent(pct) => {
                print!("\r\x1B[K");
                print!("{}", format!("downloading ... {pct:.1}%").cyan());
                let _ = io::stdout().flush();
            }
            ProgressRender::Status(status) => println!("{}", status.cyan()),
            ProgressRender::Done => {
                print!("\r\x1B[K");
                println!("{}", "success".cyan());
            }
            ProgressRender::Skip => {}
        })
        .await?;
    println!("{}", format!("({})", render::format_elapsed(elapsed)).cyan());
    Ok(())
}

/// Print session information.
pub fn info(app: &App) {
    println!(
        "{}",
        "Waldo is a simple command line assistant that can answer questions, \
         search the Internet and look at images."
            .bright_yellow()
    );
    println!("{} {}", "LLM:".bright_yellow(), app.session.model().cyan());
}
