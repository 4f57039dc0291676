//! Command-line interface for snapwatch.
//!
//! Provides commands for serving the HTTP API, running one-off polls
//! against the configured snapshot and inspecting the resolved config.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::{self, ResolvedConfig};
use crate::server::{self, AppState};

/// snapwatch - Evidence-only freshness reporter for a JSON snapshot
#[derive(Parser, Debug)]
#[command(name = "snapwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to (overrides config and SNAPWATCH_BIND)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Poll the snapshot once and print the status report
    Status,

    /// Print the snapshot verbatim
    Latest,

    /// Print readiness checks and metrics
    Health,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;

        match self.command {
            Commands::Serve { bind } => {
                serve(&cfg, bind).await
            }
            Commands::Status => {
                let state = app_state(&cfg);
                let report = state.reporter.status().await;
                print_json(&state.envelope("/status", report))
            }
            Commands::Latest => {
                let state = app_state(&cfg);
                let report = state.reporter.latest().await;
                print_json(&state.envelope("/latest", report))
            }
            Commands::Health => {
                let state = app_state(&cfg);
                let report = state.health.check().await;
                print_json(&state.envelope("/health", report))
            }
            Commands::Config => {
                show_config(&cfg);
                Ok(())
            }
        }
    }
}

fn app_state(cfg: &ResolvedConfig) -> Arc<AppState> {
    Arc::new(AppState::new(
        cfg.storage(),
        cfg.reporter_settings(),
        Utc::now(),
    ))
}

/// Start HTTP server
async fn serve(cfg: &ResolvedConfig, bind: Option<String>) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(bind) = bind {
        cfg.bind = bind;
    }
    server::start_server(&cfg).await
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

/// Show resolved configuration
fn show_config(cfg: &ResolvedConfig) {
    println!("snapwatch configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Snapshot: {}", cfg.snapshot.display());
    println!("  Audit:    {}", cfg.audit_file.display());
    println!("  State:    {}", cfg.state_file.display());
    println!();
    println!("Thresholds:");
    println!("  Expected interval: {}s", cfg.thresholds.expected_interval_seconds);
    println!("  Staleness limit:   {}s", cfg.thresholds.staleness_limit_seconds);
    println!("  Change cooldown:   {}s", cfg.thresholds.state_change_cooldown_seconds);
    println!("  Local offset:      {}", cfg.local_offset);
    println!();
    println!("Identity:");
    println!("  Version: {}", cfg.identity.version);
    println!("  Pack ID: {}", cfg.identity.pack_id);
    println!();
    println!("Server bind: {}", cfg.bind);
}
