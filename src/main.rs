//! Rubrica CLI Entry Point
//!
//! Two subcommands:
//! - `serve` - run the contacts web service
//! - `check` - validate and probe a connection profile once, without serving
//!
//! `check` prints a JSON envelope to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

use rubrica::config::AppConfig;
use rubrica::output::{ErrorEnvelope, Metadata, SuccessEnvelope};
use rubrica::probe::{ConnectionProbe, MySqlProbe};
use rubrica::profile::ConnectionProfile;
use rubrica::RubricaError;

/// Rubrica - contacts service with runtime database provisioning
#[derive(Parser)]
#[command(name = "rubrica")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web service
    Serve {
        /// Address to listen on (overrides configuration)
        #[arg(long)]
        bind: Option<std::net::SocketAddr>,
    },

    /// Validate and probe a connection profile
    Check {
        #[arg(long)]
        host: String,

        #[arg(long, default_value_t = 3306)]
        port: u32,

        #[arg(long)]
        database: String,

        #[arg(long)]
        username: String,

        /// Prompted for interactively when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.log_level)?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            rubrica::web::run_server(config).await
        }
        Commands::Check { host, port, database, username, password } => {
            let password = match password {
                Some(password) => password,
                None => dialoguer::Password::new()
                    .with_prompt("Database password")
                    .allow_empty_password(true)
                    .interact()
                    .context("Failed to read password")?,
            };
            let profile = ConnectionProfile::new(&host, port, &database, &username, password);
            let ok = check(&profile, &config).await;
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Validate then probe, printing the outcome as a JSON envelope
async fn check(profile: &ConnectionProfile, config: &AppConfig) -> bool {
    let start = Instant::now();
    let outcome = match profile.validate() {
        Ok(()) => MySqlProbe
            .probe(profile, config.probe_timeout)
            .await
            .map_err(RubricaError::from),
        Err(e) => Err(RubricaError::from(e)),
    };

    let (json, ok) = match outcome {
        Ok(report) => {
            let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            let envelope = SuccessEnvelope::new("check", report, Metadata::new(elapsed));
            (serde_json::to_string_pretty(&envelope), true)
        }
        Err(e) => (serde_json::to_string_pretty(&ErrorEnvelope::from_error("check", &e)), false),
    };

    match json {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "failed to serialize check output"),
    }
    ok
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
