//! Domain Scout: chat bot for DNS, WHOIS and HTTP liveness lookups.
//!
//! Two subcommands:
//! - `domain-scout run`: poll Telegram and answer chat commands
//! - `domain-scout query`: dispatch one command text locally and print the reply

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use domain_scout::{
    run_polling, Chat, LiveBot, LiveLookups, Message, PreferenceStore, Renderer, ScoutBot,
    ScoutConfig, TelegramClient,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Domain Scout: chat bot for DNS, WHOIS and HTTP liveness lookups.
#[derive(Parser)]
#[command(
    name = "domain-scout",
    version,
    about = "Domain Scout: chat bot for DNS, WHOIS and HTTP liveness lookups"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot and answer messages until Ctrl-C
    Run {
        /// Path to scout.toml [default: ./scout.toml or ~/.config/domain-scout/scout.toml]
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run one chat command locally (e.g. `query !dns example.com`) and print the reply
    Query {
        /// Path to scout.toml; built-in defaults are used when none is found
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print lookup results as a txt/json attachment instead of inline text
        #[arg(short, long, value_parser = ["txt", "json", "html"])]
        output: Option<String>,
        /// Message text, as it would be typed in the chat
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with env filter (RUST_LOG controls verbosity)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            print_banner();
            let path = resolve_config(config).ok_or_else(|| {
                anyhow::anyhow!(
                    "No scout.toml found. Searched ./scout.toml and ~/.config/domain-scout/scout.toml. \
                     Use --config to specify a path."
                )
            })?;
            let config = load_config(&path).await?;
            run_bot(config).await?;
        }
        Commands::Query {
            config,
            output,
            text,
        } => {
            let config = match resolve_config(config) {
                Some(path) => load_config(&path).await?,
                None => ScoutConfig::default(),
            };
            run_query(config, output.as_deref(), &text.join(" ")).await?;
        }
    }

    Ok(())
}

/// Build the live bot from config and poll until Ctrl-C.
async fn run_bot(config: ScoutConfig) -> Result<()> {
    config
        .validate_for_bot()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let lookups = LiveLookups::from_config(&config.lookup)
        .map_err(|e| anyhow::anyhow!("Failed to set up lookups: {}", e))?;
    let telegram = TelegramClient::from_config(&config.bot)
        .map_err(|e| anyhow::anyhow!("Failed to set up Telegram client: {}", e))?;

    let bot: LiveBot = ScoutBot::new(
        lookups,
        Arc::new(PreferenceStore::new()),
        Renderer::new(config.output.temp_dir.clone()),
        telegram,
    );

    let cancel = CancellationToken::new();

    // Ctrl-C cancels the root token
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down Domain Scout...");
        cancel_for_signal.cancel();
    });

    run_polling(&bot, &config.bot, cancel)
        .await
        .map_err(|e| anyhow::anyhow!("Polling loop failed: {}", e))?;

    tracing::info!("Domain Scout stopped");
    Ok(())
}

/// Chat id used for the single local conversation in `query`.
const QUERY_CHAT_ID: i64 = 0;

/// Handle a single message text exactly as the bot would, printing replies to stdout.
///
/// `output` stands in for a prior `!output` command, since preferences do not
/// persist between invocations.
async fn run_query(config: ScoutConfig, output: Option<&str>, text: &str) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let lookups = LiveLookups::from_config(&config.lookup)
        .map_err(|e| anyhow::anyhow!("Failed to set up lookups: {}", e))?;
    let bot = ScoutBot::new(
        lookups,
        Arc::new(PreferenceStore::new()),
        Renderer::new(config.output.temp_dir.clone()),
        ConsoleMessenger,
    );

    if let Some(format) = output {
        let confirmation = bot
            .preferences()
            .set_preference(QUERY_CHAT_ID, &format!("!output {}", format))
            .await;
        tracing::debug!(%confirmation, "query output format set");
    }

    let message = Message {
        message_id: 0,
        chat: Chat { id: QUERY_CHAT_ID },
        from: None,
        text: Some(text.to_string()),
    };
    bot.handle_message(&message)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to print reply: {}", e))
}

/// Messenger for `query`: inline replies and attachments go to stdout.
struct ConsoleMessenger;

impl domain_scout::Messenger for ConsoleMessenger {
    async fn send_text(
        &self,
        _chat_id: i64,
        _reply_to: Option<i64>,
        text: &str,
    ) -> domain_scout::Result<()> {
        println!("{}", text);
        Ok(())
    }

    async fn send_document(
        &self,
        _chat_id: i64,
        _reply_to: Option<i64>,
        file_name: &str,
        contents: Vec<u8>,
    ) -> domain_scout::Result<()> {
        println!("--- {} ---", file_name);
        println!("{}", String::from_utf8_lossy(&contents));
        Ok(())
    }
}

/// Resolve config file path: explicit flag → ./scout.toml → ~/.config/domain-scout/scout.toml.
fn resolve_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }

    let local = Path::new("scout.toml");
    if local.exists() {
        return Some(local.to_path_buf());
    }

    if let Some(config_dir) = dirs::config_dir() {
        let xdg = config_dir.join("domain-scout").join("scout.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }

    None
}

/// Load and parse a scout.toml config file.
async fn load_config(config_path: &Path) -> Result<ScoutConfig> {
    let content = tokio::fs::read_to_string(config_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", config_path, e))?;
    let config: ScoutConfig = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file {:?}: {}", config_path, e))?;
    Ok(config)
}

/// Print a one-line startup banner to stderr.
///
/// Skipped when stderr is not a terminal; plain text when NO_COLOR is set.
fn print_banner() {
    use std::io::IsTerminal;

    if !std::io::stderr().is_terminal() {
        return;
    }

    let version = env!("CARGO_PKG_VERSION");
    if std::env::var_os("NO_COLOR").is_some() {
        eprintln!("\n    - Domain Scout v{} -\n", version);
    } else {
        eprintln!(
            "\n    \x1b[1;38;2;64;170;160m- Domain Scout -\x1b[0m  \x1b[2mv{}  ·  DNS · WHOIS · STATUS\x1b[0m\n",
            version
        );
    }
}
