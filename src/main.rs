//! # Personal Hub CLI (`hub`)
//!
//! The `hub` binary answers queries from the command line and runs the
//! HTTP server for the web front end.
//!
//! ## Usage
//!
//! ```bash
//! hub --config ./config/hub.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hub ask "<query>"` | Answer one query and print the JSON response |
//! | `hub classify "<query>"` | Show which intent a query maps to |
//! | `hub context [query]` | Gather the aggregated context and print the briefing |
//! | `hub sources` | List integrations and whether they are configured |
//! | `hub serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Direct intent, answered without the language model
//! hub ask "how many hours do I have in Portal 2"
//!
//! # Free-form question, answered by the model with context
//! hub ask "what should I play tonight?"
//!
//! # Start the server on [server].bind
//! hub serve --config ./config/hub.toml
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`). Logs go to stderr so
//! command output on stdout stays machine-readable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hub_core::intent::Intent;
use personal_hub::config;
use personal_hub::dispatch::Assistant;
use personal_hub::{server, sources};

/// Personal Hub: a local-first assistant over your notes, games, music and
/// code.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing default config falls back to built-in defaults plus
/// environment variables.
#[derive(Parser)]
#[command(
    name = "hub",
    about = "Personal Hub: a local-first personal assistant gateway",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a query.
    ///
    /// Prints the JSON response. When the language model is unreachable the
    /// fallback warning is also printed to stderr.
    Ask {
        /// The query text.
        query: String,
    },

    /// Classify a query without running it.
    Classify {
        /// The query text.
        query: String,
    },

    /// Gather the aggregated context from every configured source.
    Context {
        /// Optional query; sources currently ignore it.
        #[arg(default_value = "")]
        query: String,
    },

    /// List integrations and their status.
    Sources,

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        // Classification needs no configuration.
        Commands::Classify { query } => {
            let output = match hub_core::intent::classify_with_rule(&query) {
                Some((rule, intent)) => serde_json::json!({ "rule": rule, "intent": intent }),
                None => serde_json::json!({ "rule": null, "intent": Intent::None }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Ask { query } => {
            let cfg = config::load_config_or_default(&cli.config)?;
            let assistant = Assistant::from_config(&cfg)?;
            let answer = assistant.answer(&query).await?;
            if answer.is_degraded() {
                eprintln!("warning: {}", answer.warning.as_deref().unwrap_or_default());
            }
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::Context { query } => {
            let cfg = config::load_config_or_default(&cli.config)?;
            let assistant = Assistant::from_config(&cfg)?;
            let context = assistant.aggregator().gather(&query).await;
            println!("{}", serde_json::to_string_pretty(&context)?);
            if context.is_empty() {
                eprintln!("(no context available)");
            } else {
                println!("{}", context.briefing());
            }
        }
        Commands::Sources => {
            let cfg = config::load_config_or_default(&cli.config)?;
            sources::list_sources(&cfg)?;
        }
        Commands::Serve => {
            let cfg = config::load_config_or_default(&cli.config)?;
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
