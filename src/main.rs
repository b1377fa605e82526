mod accumulator;
mod commands;
mod conversation;
mod data;
mod error;
mod inference;
mod models;
mod params;
mod response;

use clipboard::{ClipboardContext, ClipboardProvider};
use commands::{handle_command, is_command};
use console::style;
use data::CommandCompletion;
use dialoguer::{theme::ColorfulTheme, BasicHistory, Input};
use indicatif::{ProgressBar, ProgressStyle};
use inference::InferenceClient;
use models::Turn;
use params::GenerationConfig;
use std::io::Write;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

const DEFAULT_SYSTEM_MESSAGE: &str = "\
You are an advanced AI assistant specialized in coding tasks.
- You deliver precise, error-free code in multiple programming languages.
- Analyze queries for logical accuracy and provide optimized solutions.
- Ensure clarity, brevity, and adherence to programming standards.

Guidelines:
1. Prioritize accurate, functional code.
2. Provide explanations only when necessary for understanding.
3. Handle tasks ethically, respecting user intent and legal constraints.

Thank you for using this system. Please proceed with your query.";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}", style(format!("Failed to start runtime: {e}")).red());
            std::process::exit(1);
        }
    };

    let client = match InferenceClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", style(e.to_string()).red());
            std::process::exit(1);
        }
    };

    // Validated once up front so a bad override fails before the first
    // prompt; respond() re-checks per request regardless.
    let config = match GenerationConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", style(e.to_string()).red());
            std::process::exit(1);
        }
    };

    let system_message =
        std::env::var("ZEPHYR_SYSTEM_MESSAGE").unwrap_or_else(|_| DEFAULT_SYSTEM_MESSAGE.to_string());

    println!("Chatting with {}. /exit to quit, /sys to see the system message.", client.model());

    // Session history lives and dies with the process.
    let mut turns: Vec<Turn> = Vec::new();
    let mut prompt_history = BasicHistory::new().max_entries(99).no_duplicates(false);
    let completion = CommandCompletion::default();
    let username = whoami::username();

    loop {
        let mut code_blocks: Vec<String> = Vec::new();
        let input = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(username.as_str())
            .completion_with(&completion)
            .history_with(&mut prompt_history)
            .interact_text();
        let Ok(mut input) = input else { break };

        if is_command(&input) {
            if input.trim() == "/paste" {
                let clipboard: Result<ClipboardContext, _> = ClipboardProvider::new();
                match clipboard.and_then(|mut cb| cb.get_contents()) {
                    Ok(paste_content) => {
                        print!("\n{}", paste_content);
                        let _ = std::io::stdout().flush();

                        let additional = Input::<String>::with_theme(&ColorfulTheme::default())
                            .with_prompt("Add additional details")
                            .allow_empty(true)
                            .interact_text()
                            .unwrap_or_default();

                        input = paste_content;
                        input.push_str(&additional);
                    }
                    Err(err) => {
                        eprintln!("{}", style(format!("Failed to read clipboard: {err}")).red());
                        continue;
                    }
                }
            } else {
                handle_command(&input, &code_blocks, &mut turns, &system_message);
                continue;
            }
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
        spinner.set_message("thinking...");
        spinner.enable_steady_tick(Duration::from_millis(80));

        let stream = rt.block_on(client.respond(
            &input,
            &turns,
            &system_message,
            config.max_tokens,
            config.temperature,
            config.top_p,
        ));
        spinner.finish_and_clear();

        match stream {
            Ok(stream) => {
                let result =
                    rt.block_on(response::process_response(stream, &mut code_blocks));
                match result {
                    Ok(resp) => turns.push(Turn::new(input, resp)),
                    Err(err) => {
                        eprintln!("{}", style(err.to_string()).red());
                        // Keep the question; the answer never finished.
                        turns.push(Turn {
                            user: Some(input),
                            assistant: None,
                        });
                    }
                }
            }
            Err(err) => eprintln!("{}", style(format!("Request failed: {err}")).red()),
        }

        if !code_blocks.is_empty() {
            if let Ok(command_input) = Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt("Enter command")
                .allow_empty(true)
                .interact_text()
            {
                if is_command(&command_input) {
                    handle_command(&command_input, &code_blocks, &mut turns, &system_message);
                }
            }
        }
        println!();
        let _ = std::io::stdout().flush();
    }
}
