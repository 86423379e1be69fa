//! Storyloop CLI
//!
//! Play an interactive story narrated by a language model.

use clap::Parser;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use storyloop::protocol::{self, SurfaceCommand, SurfaceEvent};
use storyloop::session::{self, Exchange, SessionSurface};
use storyloop::tui::{help_text, parse_command, App, StoryCommand};
use storyloop::{gateway, ProviderKind, StorageKind, StoryConfig};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Storyloop - interactive fiction with an LLM narrator
#[derive(Parser, Debug)]
#[command(name = "storyloop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.storyloop/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session whose story is played
    #[arg(short, long)]
    session_id: Option<String>,

    /// Turn log backend: file or memory
    #[arg(long)]
    storage: Option<StorageKind>,

    /// Directory for file-backed turn logs
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Generation API: ollama or chat
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Model name passed to the provider
    #[arg(short, long)]
    model: Option<String>,

    /// Provider base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Narrative template file with {chat_history} and {human_input} slots
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Give up on a turn after this many seconds
    #[arg(long)]
    turn_timeout: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable TUI and use plain text mode
    #[arg(long)]
    no_tui: bool,
}

impl Cli {
    /// Command-line flags win over the file and environment.
    fn apply(&self, mut config: StoryConfig) -> StoryConfig {
        if let Some(id) = &self.session_id {
            config = config.with_session_id(id.clone());
        }
        if let Some(storage) = self.storage {
            config = config.with_storage(storage);
        }
        if let Some(dir) = &self.storage_dir {
            config = config.with_storage_dir(dir.clone());
        }
        if let Some(provider) = self.provider {
            config = config.with_provider(provider);
        }
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(path) = &self.template {
            config = config.with_template_file(path.clone());
        }
        if let Some(secs) = self.turn_timeout {
            config = config.with_turn_timeout_secs(secs);
        }
        config
    }

    /// `RUST_LOG` when set, else `debug` with `--verbose`, else `info`.
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_level()))
    }

    fn default_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = cli.apply(StoryConfig::load(cli.config.as_deref()).await?);

    if cli.no_tui {
        tracing_subscriber::fmt()
            .with_env_filter(cli.filter())
            .with_target(false)
            .with_writer(io::stderr)
            .init();
        run_plain_mode(config).await
    } else {
        // The TUI owns the terminal, so logs go to a file.
        if let Some(parent) = config.log_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        tracing_subscriber::fmt()
            .with_env_filter(cli.filter())
            .with_ansi(false)
            .with_writer(Mutex::new(log_file))
            .init();
        run_tui_mode(config).await
    }
}

/// Build the surface and report which backend it talks to.
async fn build_surface(config: &StoryConfig) -> anyhow::Result<(SessionSurface, String)> {
    let template = session::template_from_config(config).await?;
    let log = session::turn_log_from_config(config).await?;
    let gateway = gateway::from_config(config)?;
    let backend = gateway.name().to_string();
    let orchestrator = session::orchestrator_with(config, template, gateway, log);
    Ok((SessionSurface::new(orchestrator), backend))
}

async fn run_tui_mode(config: StoryConfig) -> anyhow::Result<()> {
    info!("Starting storyloop (TUI) for session {}", config.session_id);
    let (surface, backend) = build_surface(&config).await?;

    let (commands_tx, commands_rx) = mpsc::channel::<SurfaceCommand>(8);
    let (events_tx, events_rx) = mpsc::channel::<SurfaceEvent>(32);
    let session_handle = tokio::spawn(protocol::serve(surface, commands_rx, events_tx));

    commands_tx.send(SurfaceCommand::Open).await?;

    let mut app = App::new(config.session_id.clone(), backend, commands_tx, events_rx)?;
    app.run().await?;
    drop(app);

    session_handle.abort();
    Ok(())
}

async fn run_plain_mode(config: StoryConfig) -> anyhow::Result<()> {
    info!("Starting storyloop (plain mode) for session {}", config.session_id);
    let (surface, backend) = build_surface(&config).await?;
    info!("Narrator: {}", backend);

    let (commands_tx, commands_rx) = mpsc::channel::<SurfaceCommand>(8);
    let (events_tx, mut events_rx) = mpsc::channel::<SurfaceEvent>(32);
    let session_handle = tokio::spawn(protocol::serve(surface, commands_rx, events_tx));

    // Spawn blocking thread to read from stdin
    let (line_tx, mut line_rx) = mpsc::channel::<String>(8);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    let mut printed = 0usize;
    commands_tx.send(SurfaceCommand::Open).await?;

    loop {
        match next_result(&mut events_rx).await {
            Some(SurfaceEvent::Transcript {
                exchanges,
                terminated,
            }) => {
                print_new_exchanges(&exchanges, &mut printed)?;
                if terminated {
                    println!("The story has ended.");
                    break;
                }
            }
            Some(SurfaceEvent::Failed { message, .. }) => {
                eprintln!("! {}", message);
            }
            Some(SurfaceEvent::Busy) => {}
            None => {
                error!("Session task stopped unexpectedly");
                break;
            }
        }

        let command = loop {
            print!("> ");
            io::stdout().flush()?;
            let Some(line) = line_rx.recv().await else {
                break None;
            };
            match parse_command(&line) {
                Some(StoryCommand::Quit) => break None,
                Some(StoryCommand::Help) => println!("{}", help_text()),
                Some(StoryCommand::Reset) => {
                    printed = 0;
                    break Some(SurfaceCommand::Open);
                }
                None if line.trim().is_empty() => {}
                None => break Some(SurfaceCommand::Submit(line)),
            }
        };

        let Some(command) = command else {
            break;
        };
        commands_tx.send(command).await?;
    }

    session_handle.abort();
    Ok(())
}

/// Wait for the outcome of the last command, skipping progress notices.
async fn next_result(events: &mut mpsc::Receiver<SurfaceEvent>) -> Option<SurfaceEvent> {
    while let Some(event) = events.recv().await {
        if event != SurfaceEvent::Busy {
            return Some(event);
        }
    }
    None
}

fn print_new_exchanges(exchanges: &[Exchange], printed: &mut usize) -> io::Result<()> {
    let mut out = io::stdout().lock();
    write_new_exchanges(&mut out, exchanges, printed)?;
    out.flush()
}

/// Write the narration the player has not seen yet. A shorter transcript
/// than before means the story was restarted.
fn write_new_exchanges(
    out: &mut impl Write,
    exchanges: &[Exchange],
    printed: &mut usize,
) -> io::Result<()> {
    if exchanges.len() < *printed {
        *printed = 0;
    }
    for exchange in &exchanges[*printed..] {
        writeln!(out, "\n{}\n", exchange.narrator)?;
    }
    *printed = exchanges.len();
    Ok(())
}
