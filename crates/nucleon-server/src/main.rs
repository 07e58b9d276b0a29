// ============================================
// File: crates/nucleon-server/src/main.rs
// ============================================
//! # Nucleon Server Entry Point
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading and validation
//! - Server execution
//!
//! ## Usage
//! ```bash
//! # Start the server
//! nucleon-server start --config /etc/nucleon/server.toml
//!
//! # Validate a configuration file
//! nucleon-server validate --config /etc/nucleon/server.toml
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nucleon_server::{Server, ServerConfig};

// ============================================
// CLI Definition
// ============================================

/// Nucleon Server
///
/// Registers this server with the Nucleus authority and exposes it through
/// a reverse tunnel once authenticated.
#[derive(Parser, Debug)]
#[command(name = "nucleon-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/nucleon/server.toml")]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/nucleon/server.toml")]
        config: PathBuf,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging("info");

    let result = match cli.command {
        Commands::Start { config } => cmd_start(config).await,
        Commands::Validate { config } => cmd_validate(config).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Starts the server.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<()> {
    let config = if config_path.exists() {
        ServerConfig::load(&config_path).await?
    } else {
        info!("Config file not found, using defaults");
        ServerConfig::default()
    };

    // Re-initialize logging with the configured level.
    init_logging(&config.logging.level);

    if config.identity.license_key_token.is_empty() {
        info!("No license key token configured; Nucleus registration will wait until one is set");
    }

    let server = Server::new(config);
    server.run().await?;

    Ok(())
}

/// Validates a configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Server will use default values.");
        return Ok(());
    }

    let config = ServerConfig::load(&config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Primary Port:  {}", config.network.primary_port);
    if !config.network.ip_override.is_empty() {
        println!("   IP Override:   {}", config.network.ip_override);
    }
    println!();
    println!("Nucleus:");
    println!("   Endpoint:      {}", config.nucleus.register_url);
    println!("   Relay:         {}", config.nucleus.relay_addr);
    println!();
    println!("Identity:");
    if config.identity.project_name.is_empty() {
        println!("   Project Name:  (unset)");
    } else {
        println!("   Project Name:  {}", config.identity.project_name);
    }

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}
