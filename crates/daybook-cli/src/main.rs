//! `daybook` — command-line driver for the Daybook engine.
//!
//! # Usage
//!
//! ```
//! daybook login --email alice@example.com --password secret
//! daybook whoami
//! daybook shell
//! daybook --config ~/.config/daybook/daybook.toml logout
//! ```
//!
//! Only the session is persisted (to `store_path`). Chat, habits, notes and
//! the weekly plan are seeded fresh for every `shell`.

mod app;
mod client;
mod shell;

use std::{
  io::Write as _,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use app::{App, Flow};
use clap::{Parser, Subcommand};
use client::RemoteAuth;
use daybook_core::{auth::RemotePolicy, session::SessionStore};
use daybook_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Chat, notes, habits and a weekly plan")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "daybook.toml")]
  config: PathBuf,

  /// Keep the session in memory instead of `store_path`.
  #[arg(long)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
  /// Log in and persist the session.
  Login {
    #[arg(long)]
    email:    String,
    #[arg(long, env = "DAYBOOK_PASSWORD")]
    password: String,
  },
  /// Create an account and persist the session.
  Register {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    email:    String,
    #[arg(long, env = "DAYBOOK_PASSWORD")]
    password: String,
  },
  /// Forget the persisted session.
  Logout,
  /// Show the persisted session, if any.
  Whoami,
  /// Interactive shell over seeded data.
  Shell,
}

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, from the config file and `DAYBOOK_*` variables.
#[derive(Debug, Clone, Deserialize)]
struct CliConfig {
  #[serde(default = "default_store_path")]
  store_path:    PathBuf,
  /// Base URL of the auth API. Without it every remote call fails and the
  /// remote policy decides what happens.
  #[serde(default)]
  api_url:       Option<String>,
  #[serde(default)]
  remote_policy: RemotePolicy,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/daybook/session.db") }

fn load_config(path: &Path) -> anyhow::Result<CliConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path.to_path_buf()).required(false))
    .add_source(config::Environment::with_prefix("DAYBOOK"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise CliConfig")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = load_config(&cli.config)?;

  let storage = if cli.ephemeral {
    SqliteStore::open_in_memory()
      .await
      .context("failed to open in-memory store")?
  } else {
    let path = expand_tilde(&cfg.store_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    SqliteStore::open(&path)
      .await
      .with_context(|| format!("failed to open store at {path:?}"))?
  };

  let auth = RemoteAuth::new(cfg.api_url.clone())?;
  let session = SessionStore::new(storage, auth).with_policy(cfg.remote_policy);
  session.restore().await.context("failed to restore session")?;

  let mut app = App::seeded(session);
  let mut stdout = std::io::stdout();

  let one_shot = match cli.command {
    Cmd::Login { email, password } => shell::Command::Login { email, password },
    Cmd::Register { name, email, password } => {
      shell::Command::Register { name, email, password }
    }
    Cmd::Logout => shell::Command::Logout,
    Cmd::Whoami => shell::Command::Whoami,
    Cmd::Shell => return run_shell(&mut app).await,
  };
  app.execute(one_shot, &mut stdout).await?;
  Ok(())
}

// ─── Shell loop ───────────────────────────────────────────────────────────────

async fn run_shell(app: &mut App<SqliteStore>) -> anyhow::Result<()> {
  let mut stdout = std::io::stdout();
  writeln!(stdout, "daybook shell; `help` lists commands")?;

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    write!(stdout, "> ")?;
    stdout.flush()?;

    let Some(line) = lines.next_line().await.context("reading stdin")? else {
      break;
    };

    let cmd = match shell::parse(&line) {
      Ok(Some(cmd)) => cmd,
      Ok(None) => continue,
      Err(e) => {
        writeln!(stdout, "{e}")?;
        continue;
      }
    };

    match app.execute(cmd, &mut stdout).await {
      Ok(Flow::Continue) => {}
      Ok(Flow::Quit) => break,
      // Remote and storage failures end the command, not the shell.
      Err(e) => {
        tracing::error!("{e:#}");
        writeln!(stdout, "error: {e:#}")?;
      }
    }
  }
  Ok(())
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
