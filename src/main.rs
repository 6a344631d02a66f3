mod app;
mod config;
mod error;
mod events;
mod reply;
mod scheduler;
mod ui;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::ui::conversation::get_help_text;

#[derive(Parser)]
#[command(name = "parley")]
#[command(version = "0.1.0")]
#[command(about = "Terminal chat with a slash-command palette", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.parley/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the simulated reply delay, in milliseconds
    #[arg(long)]
    reply_delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the slash commands offered by the palette
    Commands {
        /// Print the command list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the effective settings to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(delay_ms) = cli.reply_delay_ms {
        config.reply.delay_ms = delay_ms;
    }
    config.validate()?;
    Ok(config)
}

/// Log to ~/.parley/parley.log so output never lands on the alternate screen
fn init_logging() -> Result<()> {
    let dir = Config::home_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("parley.log"))
        .context("failed to open log file")?;

    let filter = EnvFilter::try_from_env("PARLEY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Alternate screen plus mouse and bracketed paste reporting
fn enter_screen<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)
}

fn leave_screen<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, LeaveAlternateScreen, DisableMouseCapture, DisableBracketedPaste)
}

fn setup_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = leave_screen(&mut io::stdout());
        original_hook(panic_info);
    }));
}

fn print_commands(config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&config.commands)?);
    } else {
        println!("{}", get_help_text(&config.commands));
    }
    Ok(())
}

fn init_config(cli: &Cli, config: &Config, force: bool) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    if path.exists() && !force {
        bail!("{} already exists, pass --force to overwrite", path.display());
    }

    config.save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run_tui(config: &Config) -> Result<()> {
    setup_panic_hook();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    enter_screen(&mut stdout)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app::run(&mut terminal, config).await;

    disable_raw_mode()?;
    leave_screen(terminal.backend_mut())?;
    terminal.show_cursor()?;

    res
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Some(Commands::Commands { json }) => print_commands(&config, *json),
        Some(Commands::Init { force }) => init_config(&cli, &config, *force),
        None => {
            init_logging()?;
            run_tui(&config).await
        }
    }
}
