//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments, installs logging, opens the
//! stores and dispatches to the chat screen or one of the plain subcommands.

pub mod say;
pub mod settings;


use std::error::Error;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::say::run_say;
use crate::cli::settings::{apply_setting, print_history, print_summary};
use crate::core::app::App;
use crate::core::chat::ChatController;
use crate::core::config::Config;
use crate::core::dictation::from_command;
use crate::core::gemini::GeminiBackend;
use crate::core::llm::LlmClient;
use crate::core::storage::Storage;
use crate::ui::chat_loop::run_chat;

pub const LOG_ENV: &str = "VULCAN_LOG";

#[derive(Parser, Debug)]
#[command(name = "vulcan", version)]
#[command(about = "A terminal roast-chat client for the Gemini API")]
#[command(
    long_about = "VULCAN is a full-screen terminal chat that streams sarcastic, persona-styled \
replies from Google's Gemini API and offers three follow-up suggestions after every reply.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY    Your Gemini API key (the variable name is configurable via api_key_env)\n\
  VULCAN_LOG        Log filter for --log output (e.g. debug, vulcan=trace)\n\n\
Controls:\n\
  Enter             Send the message, or stop a reply in flight\n\
  Alt+Enter         Insert a newline\n\
  Alt+1..4          Send a suggestion\n\
  Esc               Stop the reply / cancel an edit / close a dialog\n\
  PageUp/PageDown   Scroll the transcript\n\
  Ctrl+T            Toggle theme (neon / obsidian)\n\
  Ctrl+G            Cycle reply language\n\
  Ctrl+O            Open the CALIBRATE dialog\n\
  Ctrl+E            Edit one of your earlier messages\n\
  Ctrl+Y            Copy the last reply\n\
  Ctrl+L            Clear the conversation\n\
  Ctrl+D            Toggle dictation (needs dictation_command)\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Keep history, persona and theme in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Override the Gemini model for this run
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send one message and stream the roast to stdout
    Say {
        /// Message to send; multiple words are joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Change a setting: sarcasm, edge, language, fast-reply, theme, model, suggest-after-cancel
    Set {
        /// Setting to change
        key: String,
        /// New value
        value: String,
    },
    /// Show the current persona, theme, model and storage paths
    Show,
    /// Print the stored conversation
    History,
    /// Delete the stored conversation
    Clear,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let command = args.command.clone().unwrap_or(Commands::Chat);
    init_tracing(&command, args.log.as_deref())?;

    let mut config = Config::load()?;
    if let Some(model) = args.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        config.model = Some(model.to_string());
    }
    let storage = open_storage(&config, args.ephemeral)?;

    match command {
        Commands::Chat => {
            let chat = build_controller(&config, storage)?;
            let theme = chat.storage().load_theme();
            let app = App::new(chat, theme, from_command(&config.dictation_command));
            info!(model = config.model(), "starting chat screen");
            run_chat(app, config.stream_idle_timeout()).await
        }
        Commands::Say { prompt } => {
            let chat = build_controller(&config, storage)?;
            run_say(chat, prompt).await
        }
        Commands::Set { key, value } => {
            // Reload so a --model override is not written back.
            let mut stored = Config::load()?;
            let applied = apply_setting(&key, &value, &mut stored, &storage)?;
            if applied.config_changed {
                stored.save()?;
            }
            println!("✅ {}", applied.message);
            Ok(())
        }
        Commands::Show => {
            print_summary(&config, &storage, args.ephemeral);
            Ok(())
        }
        Commands::History => {
            print_history(&storage);
            Ok(())
        }
        Commands::Clear => {
            storage.clear_history()?;
            println!("✅ Chat cleared");
            Ok(())
        }
    }
}

/// The chat screen logs only to a file; plain subcommands log warnings to stderr.
fn init_tracing(command: &Commands, log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match (command, log_file) {
        (_, Some(path)) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("info"))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        (Commands::Chat, None) => {}
        (_, None) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("warn"))
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn open_storage(config: &Config, ephemeral: bool) -> Result<Storage, Box<dyn Error>> {
    if ephemeral {
        return Ok(Storage::in_memory());
    }
    Ok(Storage::on_disk(config.resolve_data_dir()?))
}

/// Wire the Gemini backend into a controller restored from `storage`.
pub fn build_controller(config: &Config, storage: Storage) -> Result<ChatController, Box<dyn Error>> {
    let api_key = config.api_key_from_env().ok_or_else(|| {
        format!(
            "{} is not set\n\nExport your Gemini API key first:\n  export {}=\"your-api-key-here\"",
            config.api_key_env(),
            config.api_key_env()
        )
    })?;

    let backend = GeminiBackend::from_config(config, api_key)?;
    let llm = LlmClient::new(Arc::new(backend)).with_request_timeout(config.request_timeout());
    Ok(ChatController::new(llm, storage).with_suggest_after_cancel(config.suggest_after_cancel()))
}
