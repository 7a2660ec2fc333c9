// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ravyn - a Telegram gateway for several AI providers with token accounting.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod credit;
mod payment;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ravyn_config::RavynConfig;

/// Ravyn - a Telegram gateway for several AI providers with token accounting.
#[derive(Parser, Debug)]
#[command(name = "ravyn", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server and background tasks (default).
    Serve,
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Credit tokens to a user, as an operator top-up.
    Credit {
        user_id: i64,
        #[arg(value_parser = clap::value_parser!(i64).range(1..))]
        amount: i64,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Validate configuration and print a summary.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ravyn_config::load_and_validate_path(path),
        None => ravyn_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ravyn_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Config {
            action: ConfigAction::Check,
        } => {
            print!("{}", config_summary(&config));
            Ok(())
        }
        Commands::Credit { user_id, amount } => {
            credit::run_credit(&config, user_id, amount).await
        }
    };

    if let Err(e) = result {
        eprintln!("ravyn: {e}");
        std::process::exit(1);
    }
}

/// Human-readable summary printed by `ravyn config check`.
fn config_summary(config: &RavynConfig) -> String {
    let mut out = String::from("configuration is valid\n\n");
    out.push_str(&format!("agent:      {}\n", config.agent.name));
    out.push_str(&format!(
        "admin:      {}\n",
        config.agent.admin_username.as_deref().unwrap_or("(none)")
    ));
    out.push_str(&format!("database:   {}\n", config.storage.database_path));
    out.push_str(&format!(
        "webhook:    {}:{}{}\n",
        config.telegram.bind_address, config.telegram.port, config.telegram.webhook_path
    ));
    out.push_str(&format!(
        "rate limit: {} requests / {}s\n",
        config.limits.max_requests, config.limits.window_secs
    ));
    out.push_str(&format!(
        "providers:  default {} (timeout {}s)\n",
        config.providers.default, config.providers.timeout_secs
    ));
    for (name, entry) in config.providers.entries() {
        let state = if entry.enabled { "enabled" } else { "disabled" };
        out.push_str(&format!(
            "  {name:<8} {state:<9} model {}\n",
            entry.default_model
        ));
    }
    out.push_str(&format!(
        "images:     {}\n",
        if config.image.enabled {
            config.image.model.as_str()
        } else {
            "disabled"
        }
    ));
    let tiers: Vec<&str> = config
        .subscription
        .tiers
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    out.push_str(&format!("tiers:      {}\n", tiers.join(", ")));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_loads_config_defaults() {
        let config = ravyn_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.agent.name, "ravyn");
    }

    #[test]
    fn summary_lists_providers_and_tiers() {
        let config = ravyn_config::load_and_validate_str(
            "[providers.mistral]\nenabled = false\n",
        )
        .unwrap();
        let summary = config_summary(&config);
        assert!(summary.starts_with("configuration is valid"));
        assert!(summary.contains("gpt      enabled   model gpt-4o"));
        assert!(summary.contains("mistral  disabled"));
        assert!(summary.contains("tiers:      basic, standard, premium"));
    }

    #[test]
    fn cli_defaults_to_serve() {
        let cli = Cli::parse_from(["ravyn"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["ravyn", "credit", "42", "100"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Credit {
                user_id: 42,
                amount: 100
            })
        ));
        assert!(Cli::try_parse_from(["ravyn", "credit", "42", "0"]).is_err());
    }
}
