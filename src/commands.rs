use crate::models::Turn;
use clipboard::{ClipboardContext, ClipboardProvider};
use console::style;
use dialoguer::{theme::ColorfulTheme, Select};
use std::process;

/// Everything tab completion offers; each entry must parse.
pub const COMMAND_NAMES: &[&str] = &[
    "/exit", "/quit", "/clear", "/reset", "/sys", "/paste", "/copy", "/copy_all",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    Clear,
    Reset,
    Sys,
    Paste,
    Copy,
    CopyAll,
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "/exit" | "/quit" => Some(Command::Exit),
            "/clear" => Some(Command::Clear),
            "/reset" => Some(Command::Reset),
            "/sys" => Some(Command::Sys),
            "/paste" => Some(Command::Paste),
            "/copy" => Some(Command::Copy),
            "/copy_all" => Some(Command::CopyAll),
            _ => None,
        }
    }
}

pub fn is_command(input: &str) -> bool {
    input.starts_with('/') && !input.strip_prefix('/').unwrap_or("").contains(' ')
}

pub fn handle_command(
    cmd: &str,
    code_blocks: &[String],
    history: &mut Vec<Turn>,
    system_message: &str,
) {
    match Command::parse(cmd) {
        Some(Command::Exit) => process::exit(0),
        Some(Command::Clear) => println!("\x1B[2J\x1B[1;1H"),
        Some(Command::Reset) => {
            history.clear();
            println!("Conversation history cleared.");
        }
        Some(Command::Sys) => println!("{}", style(system_message).dim()),
        // The chat prompt intercepts /paste before it gets here.
        Some(Command::Paste) => println!("/paste composes a message; use it at the chat prompt."),
        Some(Command::Copy) => {
            if code_blocks.is_empty() {
                println!("No code blocks to copy.");
                return;
            }

            let selections: Vec<&str> = code_blocks.iter().map(|s| s.as_str()).collect();
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Select code block to copy")
                .items(&selections)
                .default(0)
                .interact();

            let Ok(selection) = selection else { return };
            match copy_to_clipboard(&code_blocks[selection]) {
                Ok(()) => println!("Code block copied to clipboard"),
                Err(e) => eprintln!("{}", style(format!("Clipboard error: {e}")).red()),
            }
        }
        Some(Command::CopyAll) => {
            if code_blocks.is_empty() {
                println!("No code blocks to copy.");
                return;
            }

            match copy_to_clipboard(&code_blocks.join("\n\n")) {
                Ok(()) => println!("All code blocks copied to clipboard"),
                Err(e) => eprintln!("{}", style(format!("Clipboard error: {e}")).red()),
            }
        }
        None => println!("Unknown command: {}", cmd),
    }
}

fn copy_to_clipboard(content: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut clipboard: ClipboardContext = ClipboardProvider::new()?;
    clipboard.set_contents(content.to_string())?;
    Ok(())
}
