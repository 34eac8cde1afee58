//! Telegram Roster Bot CLI - main entry point
//!
//! Runs the bot or performs one-off roster and broadcast operations.

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use telegram_roster::commands::{self, OutputFormat};
use telegram_roster::{bot, metrics, Config, UserRecord};
use tracing::warn;

#[derive(Parser)]
#[command(name = "telegram_roster")]
#[command(about = "Telegram roster bot: records users and broadcasts messages with photos", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Config file (defaults to ./config.yml, then ../config.yml)
    #[arg(short, long, env = "ROSTER_CONFIG")]
    config: Option<PathBuf>,

    /// Roster CSV file, overrides roster.path from the config
    #[arg(long, env = "ROSTER_PATH")]
    roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot: collect known chats, announce, then poll for commands
    Run,

    /// Add a user to the roster or fill their missing fields
    Upsert {
        /// Telegram username (without @)
        #[arg(short, long)]
        username: Option<String>,

        /// Salutation used in messages (e.g. Mr., Ms.)
        #[arg(short, long)]
        gender: Option<String>,

        /// Last name
        #[arg(short, long)]
        lastname: Option<String>,

        /// Telegram chat id
        #[arg(long, allow_hyphen_values = true)]
        chat_id: Option<i64>,
    },

    /// Print the roster
    List {
        /// Output format: table | json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Send the message and photos to every roster user
    Broadcast {
        /// Resolve recipients and photo windows without sending
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Send a text to every chat id stored in the roster
    Notify {
        /// Message text
        text: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Run => "run",
            Commands::Upsert { .. } => "upsert",
            Commands::List { .. } => "list",
            Commands::Broadcast { .. } => "broadcast",
            Commands::Notify { .. } => "notify",
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load_from_file(path).map_err(|e| anyhow!(e))?,
        None => Config::new(),
    };
    if let Some(roster) = &cli.roster {
        config.roster_path = roster.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("telegram_roster=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = load_config(&cli)?;
    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(cli.command, config).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}

async fn execute_command(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Run => {
            bot::run(config).await?;
        }
        Commands::Upsert {
            username,
            gender,
            lastname,
            chat_id,
        } => {
            let record = UserRecord {
                handle: username,
                display_gender: gender,
                display_name: lastname,
                numeric_id: chat_id,
            };
            commands::upsert::run(&config.roster_path, &record)?;
        }
        Commands::List { format } => {
            commands::list::run(&config.roster_path, OutputFormat::parse(&format))?;
        }
        Commands::Broadcast { dry_run } => {
            commands::broadcast::run(config, dry_run).await?;
        }
        Commands::Notify { text } => {
            commands::notify::run(config, &text).await?;
        }
    }

    Ok(())
}
