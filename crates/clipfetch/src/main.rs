// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clipfetch - a Telegram bot that turns Instagram and TikTok links into
//! downloaded media.
//!
//! This is the binary entry point.

mod serve;
mod shutdown;

use clap::{Parser, Subcommand};

/// Clipfetch - Telegram media relay bot.
#[derive(Parser, Debug)]
#[command(name = "clipfetch", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot: long polling, worker pool, and sweepers.
    Serve,
    /// Print the resolved configuration and exit.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match clipfetch_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            clipfetch_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("clipfetch serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("cannot render config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("clipfetch: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    #[test]
    #[serial]
    fn binary_loads_config_defaults() {
        let config = clipfetch_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.bot.name, "clipfetch");
    }
}
