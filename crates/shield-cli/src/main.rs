//! Swarm Shield CLI
//!
//! Runs the detection, verification and gate flow in-process:
//! - analyze a single release without minting anything
//! - run the full scan, verify and gate flow over an in-memory bus
//! - check a stored credential's proof, issuer and expiry
//! - generate Ed25519 issuer keys

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use shield_agents::ShieldConfig;

#[derive(Parser)]
#[command(name = "swarm-shield")]
#[command(about = "Swarm Shield - credential-gated package release defense", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SHIELD_CONFIG")]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "SHIELD_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "SHIELD_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the detection checks on one release
    Analyze(commands::ReleaseArgs),

    /// Scan, verify and gate one release end to end
    Run {
        #[command(flatten)]
        release: commands::ReleaseArgs,

        /// Project asking the gate
        #[arg(long, default_value = "default")]
        project: String,

        /// Record this remediation if the incident is verified
        #[arg(long)]
        remediate: Option<String>,
    },

    /// Validate a credential JSON file
    VerifyCredential {
        /// Path to the credential
        path: String,

        /// Issuers to trust; defaults to the configured verifiers and scanners
        #[arg(long = "trust")]
        trusted: Vec<String>,
    },

    /// Generate an Ed25519 key pair for an issuer
    Keygen {
        /// Issuer id the key belongs to
        issuer: String,
    },

    /// Show the effective configuration and gate policy
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = ShieldConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze(release) => commands::analyze(&config, &release),
        Commands::Run {
            release,
            project,
            remediate,
        } => commands::run(&config, &release, &project, remediate.as_deref()).await,
        Commands::VerifyCredential { path, trusted } => {
            commands::verify_credential(&config, &path, &trusted)
        }
        Commands::Keygen { issuer } => commands::keygen(&issuer),
        Commands::Config => commands::show_config(&config),
    }
}
