#![deny(unsafe_code)]

mod common;
mod config;
mod daemon;
mod input;
mod notification;
mod shortcut;
mod x11;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::shortcut::{KeySequence, ShortcutRegistry};
use crate::x11::{X11Context, X11Grabber};

#[derive(Parser, Debug)]
#[command(name = "clipdesk")]
#[command(version)]
#[command(about = "Global shortcuts and notification popups for X11", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Check whether a key sequence can be grabbed
    Check {
        /// Key sequence such as "Ctrl+Alt+V"
        sequence: String,
    },
    /// Show a notification and wait until it is closed
    Notify {
        title: String,
        #[arg(default_value = "")]
        message: String,
        /// Close automatically after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter_directives = if cli.debug {
        // Keep x11rb at info, it logs every request at debug
        "info,clipdesk=debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directives));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    match cli.command {
        Some(Commands::Check { sequence }) => check_sequence(&sequence),
        Some(Commands::Notify {
            title,
            message,
            timeout_ms,
        }) => {
            let config = load_config(cli.config)?;
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to build Tokio runtime")?;
            rt.block_on(daemon::run_single_notification(
                config,
                &title,
                &message,
                timeout_ms.map(Duration::from_millis),
            ))
        }
        None => {
            let config = load_config(cli.config)?;
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to build Tokio runtime")?;
            rt.block_on(daemon::run_daemon(config))
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => Config::default_path()?,
    };
    Config::load_or_default(&path)
}

/// Parse `text`, then grab and release it once to see if another client owns it
fn check_sequence(text: &str) -> Result<()> {
    let sequence = KeySequence::parse(text).context(format!("Invalid key sequence '{text}'"))?;
    println!("Sequence:  {sequence}");

    let app_ctx = X11Context::connect(None)?;
    let mut registry = ShortcutRegistry::new(Some(X11Grabber::new(&app_ctx)?));
    let id = registry.create();
    let result = registry.set_sequence(id, sequence);

    if let Some(native) = registry.native(id) {
        println!("Key code:  {}", native.keycode);
        println!("Modifiers: {:#06x}", native.modifiers);
    }
    match result {
        Ok(()) => println!("Available"),
        Err(e) => println!("Not available: {e}"),
    }
    registry.teardown();
    Ok(())
}
