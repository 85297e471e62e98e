mod config_commands;
mod normalize_commands;

use std::path::{Path, PathBuf};

use {
    clap::{Parser, Subcommand},
    courier_config::CourierConfig,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "courier", about = "Courier: outbound reply normalization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a reply payload read as JSON and print the result.
    Normalize(normalize_commands::NormalizeArgs),
    /// Validate the configuration file and report errors/warnings.
    Validate {
        /// Config file to check (defaults to the discovered one).
        #[arg(long, env = "COURIER_CONFIG")]
        config: Option<PathBuf>,
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

/// Logs go to stderr; stdout carries command output only.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load an explicit config file, or fall back to discovery.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<CourierConfig> {
    match path {
        Some(path) => {
            let mut config = courier_config::load_config(path)?;
            courier_config::apply_env_overrides(&mut config);
            Ok(config)
        },
        None => Ok(courier_config::discover_and_load()),
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "courier starting");

    match cli.command {
        Commands::Normalize(args) => normalize_commands::handle_normalize(args),
        Commands::Validate { config, verbose } => {
            config_commands::handle_validate(config.as_deref(), verbose)
        },
    }
}
