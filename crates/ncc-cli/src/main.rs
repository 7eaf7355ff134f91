//! `ncc` — terminal console for the NCC labor-negotiation backend.
//!
//! # Usage
//!
//! ```
//! ncc login --user ana
//! ncc --url http://localhost:3000
//! ncc --config ~/.config/ncc/config.toml
//! ncc logout
//! ```

mod app;
mod client;
mod form;
mod pages;
mod session;
mod ui;

#[cfg(test)]
mod tests;

use std::{
  fs::{self, OpenOptions},
  io,
  path::{Path, PathBuf},
  sync::Mutex,
  time::Duration,
};

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use session::Session;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ncc", version, about = "Terminal console for the NCC negotiation backend")]
struct Args {
  /// Path to a TOML config file (url, session_file, timeout_secs).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  /// Base URL of the backend (default: http://localhost:3000).
  #[arg(long, env = "NCC_URL", global = true)]
  url: Option<String>,

  /// Where the session token is kept
  /// (default: ~/.local/state/ncc/session.json).
  #[arg(long, env = "NCC_SESSION_FILE", value_name = "FILE", global = true)]
  session_file: Option<PathBuf>,

  /// Request timeout in seconds.
  #[arg(long, global = true)]
  timeout_secs: Option<u64>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Open the console (the default).
  Console,
  /// Sign in and store the session.
  Login {
    /// Login handle or email.
    #[arg(short, long)]
    user:     String,
    /// Password; read from stdin when omitted.
    #[arg(long, env = "NCC_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// Forget the stored session.
  Logout,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:          String,
  #[serde(default)]
  session_file: Option<PathBuf>,
  #[serde(default)]
  timeout_secs: Option<u64>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    timeout:  Duration::from_secs(
      args
        .timeout_secs
        .or(file_cfg.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS),
    ),
  };
  let session_path = args
    .session_file
    .or(file_cfg.session_file)
    .map(|p| expand_tilde(&p))
    .unwrap_or_else(default_session_path);

  init_tracing(&session_path)?;
  tracing::debug!(url = %api_config.base_url, "starting");

  let session = Session::load(&session_path).context("loading session")?;
  let client = ApiClient::new(api_config, session.into_handle())?;

  match args.command.unwrap_or(Command::Console) {
    Command::Console => run_console(client).await,
    Command::Login { user, password } => {
      let password = match password {
        Some(p) => p,
        None => read_password()?,
      };
      let grant = client.login(&user, &password).await?;
      let name = grant
        .profile
        .map(|p| p.display_name())
        .filter(|n| !n.is_empty())
        .unwrap_or(user);
      println!("Signed in as {name}.");
      Ok(())
    }
    Command::Logout => {
      client.logout()?;
      println!("Signed out.");
      Ok(())
    }
  }
}

fn default_session_path() -> PathBuf {
  expand_tilde(Path::new("~/.local/state/ncc/session.json"))
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

/// Log to `ncc.log` beside the session file so the terminal UI stays clean.
fn init_tracing(session_path: &Path) -> Result<()> {
  let log_path = session_path.with_file_name("ncc.log");
  if let Some(dir) = log_path.parent().filter(|d| !d.as_os_str().is_empty()) {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
  }
  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(&log_path)
    .with_context(|| format!("opening log file {}", log_path.display()))?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(Mutex::new(file))
    .with_ansi(false)
    .init();
  Ok(())
}

fn read_password() -> Result<String> {
  use std::io::{BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

// ─── Console ──────────────────────────────────────────────────────────────────

async fn run_console(client: ApiClient) -> Result<()> {
  let mut app = App::new(client);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Load initial data; failures land in the status bar.
  app.load().await;

  // Run the event loop; restore terminal even on error.
  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key).await?
    {
      break;
    }
  }

  Ok(())
}
