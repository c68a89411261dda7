use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use waldo_types::Config;

use crate::cli::Cli;
use crate::commands::{self, App};
use crate::logging::ConversationLogger;

const PROMPT: &str = "waldo> ";

#[derive(Debug, Clone, Copy)]
enum SubCommand {
    Ask,
    Search,
    Image,
    Shell,
}

impl SubCommand {
    fn prompt(&self) -> &'static str {
        match self {
            SubCommand::Ask => "ask> ",
            SubCommand::Search => "search> ",
            SubCommand::Image => "image> ",
            SubCommand::Shell => "shell> ",
        }
    }

    fn exit_message(&self) -> &'static str {
        match self {
            SubCommand::Shell => "no command, will exit.",
            _ => "no question, will exit.",
        }
    }
}

/// Run the interactive command loop until `exit` or end of input.
pub async fn run(cli: &Cli, config: Config) -> Result<()> {
    let mut app = App::new(&config, cli.verbose);
    app.logger = match ConversationLogger::new(&std::env::current_dir()?).await {
        Ok(logger) => Some(logger),
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            None
        }
    };

    // One Ctrl-C handler for the whole session: cancels the in-flight call
    // instead of killing the process.
    let active_call = app.active_call_slot();
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                break;
            }
            if let Some(token) = active_call.lock().unwrap().as_ref() {
                token.cancel();
            }
        }
    });

    println!(
        "{}",
        "Type 'help' for commands, 'exit' to leave.\n".bright_black()
    );

    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(&line);

        match line.as_str() {
            "exit" | "quit" => break,
            "ask" => command_loop(&mut app, &mut rl, SubCommand::Ask).await?,
            "search" => command_loop(&mut app, &mut rl, SubCommand::Search).await?,
            "image" => command_loop(&mut app, &mut rl, SubCommand::Image).await?,
            "shell" => command_loop(&mut app, &mut rl, SubCommand::Shell).await?,
            "switch" => {
                if let Err(e) = switch(&mut app, &mut rl).await {
                    println!("{}", e.to_string().red());
                    println!("{}", "model not switched.".red());
                }
            }
            "add" => {
                if let Err(e) = add(&mut app, &mut rl).await {
                    println!("{}", e.to_string().red());
                }
                app.end_call();
            }
            "info" => commands::info(&app),
            "help" => help(),
            other => {
                println!("{} {}", "unknown command:".red(), other);
                help();
            }
        }
    }

    if let Some(logger) = &mut app.logger {
        logger.shutdown().await;
    }
    Ok(())
}

/// Repeat one sub-prompt until an empty line or `exit` backs out of it.
async fn command_loop(app: &mut App, rl: &mut DefaultEditor, sub: SubCommand) -> Result<()> {
    loop {
        let line = match rl.readline(sub.prompt()) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim().to_string();
        if line.is_empty() || line == "exit" {
            println!("{}", sub.exit_message().red());
            break;
        }
        let _ = rl.add_history_entry(&line);

        let result = match sub {
            SubCommand::Ask => commands::ask(app, &line).await,
            SubCommand::Search => commands::search(app, &line).await,
            SubCommand::Image => commands::image(app, &line).await,
            SubCommand::Shell => {
                commands::shell(&line);
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("{}", e.to_string().red());
        }
        app.end_call();
    }
    Ok(())
}

/// List installed local models and switch the session to the chosen one.
async fn switch(app: &mut App, rl: &mut DefaultEditor) -> Result<()> {
    let models = app.dispatcher.local().tags().await?;
    let names = models.names();
    if names.is_empty() {
        println!("{}", "no local models installed.".yellow());
        return Ok(());
    }

    println!("{}", "Which model to use?".cyan());
    for (i, name) in names.iter().enumerate() {
        println!("  {}) {}", i + 1, name);
    }
    let choice = rl.readline("choice> ")?;
    match choice.trim().parse::<usize>() {
        Ok(n) if (1..=names.len()).contains(&n) => {
            app.session.switch_model(names[n - 1].clone());
            println!(
                "{} {}",
                "switched to".cyan(),
                app.session.model().bright_white().bold()
            );
        }
        _ => println!("{}", "model not switched.".red()),
    }
    Ok(())
}

/// Prompt for a model name and pull it into the local server.
async fn add(app: &mut App, rl: &mut DefaultEditor) -> Result<()> {
    let name = rl.readline("model name? ")?;
    let name = name.trim().to_string();
    if name.is_empty() || name == "exit" {
        println!("{}", "no model provided, will exit.".red());
        return Ok(());
    }
    commands::add(app, &name).await
}

fn help() {
    println!("{}", "commands:".bright_black());
    println!("  ask      ask waldo a question");
    println!("  search   search the Internet and answer from the results");
    println!("  image    ask about one or more image files");
    println!("  shell    run shell commands");
    println!("  switch   switch to a different model");
    println!("  add      pull a new model into the local server");
    println!("  info     information about waldo");
    println!("  exit     leave waldo");
}
