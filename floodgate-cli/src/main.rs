//! Floodgate CLI - operator tool for Pay2 webhooks and anti-flood counters.
//!
//! Usage:
//!   floodgate-cli decrypt --signature <b64> [--payload <json>]
//!   floodgate-cli seal --payload '{"invoice_number":"IN1","status":"paid"}'
//!   floodgate-cli antiflood status --actor 42 --action login
//!   floodgate-cli antiflood reset --actor 203.0.113.7 --action login

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{AntifloodCommand, Cli, Commands};
use colored::Colorize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Decrypt(args) => commands::decrypt::run(args)?,
        Commands::Seal(args) => commands::seal::run(args)?,
        Commands::Antiflood { command } => match command {
            AntifloodCommand::Status(args) => commands::antiflood::status(args).await?,
            AntifloodCommand::Reset(args) => commands::antiflood::reset(args).await?,
        },
    }

    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "→".blue(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    println!("{} {}", "✗".red().bold(), message);
}
