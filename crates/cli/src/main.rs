mod auth_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tokenrelay_config::TokenRelayConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "tokenrelay", about = "tokenrelay: OAuth 2.0 PKCE token relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML, YAML or JSON). Defaults to ./tokenrelay.* or the user config dir.
    #[arg(long, global = true, env = "TOKENRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server.
    Gateway {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Credential management.
    Auth {
        #[command(subcommand)]
        action: auth_commands::AuthAction,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
}

/// Logs go to stderr so `auth token` output stays clean on stdout.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "tokenrelay starting");

    let mut config = tokenrelay_config::discover_and_load(cli.config.as_deref())?;

    match cli.command {
        Commands::Gateway { bind, port } => {
            apply_server_flags(&mut config, bind, port);
            tokenrelay_gateway::start_gateway(&config).await
        },
        Commands::Auth { action } => auth_commands::handle_auth(action, &config).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(())
            },
        },
    }
}

/// Command-line flags win over file and environment.
fn apply_server_flags(config: &mut TokenRelayConfig, bind: Option<String>, port: Option<u16>) {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
}
