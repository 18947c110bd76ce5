//! Line-oriented command parser for the interactive shell.
//!
//! List positions are 1-based and refer to the order the matching listing
//! command prints.

use daybook_core::plan::{Day, Priority};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Help,
  Quit,

  // ── Session ───────────────────────────────────────────────────────────────
  Whoami,
  Login { email: String, password: String },
  Register { name: String, email: String, password: String },
  Logout,

  // ── Chat ──────────────────────────────────────────────────────────────────
  Chat,
  Say(String),

  // ── Habits ────────────────────────────────────────────────────────────────
  Habits,
  AddHabit { name: String, description: String, weekly_goal: Option<u32> },
  ToggleHabit(usize),
  RollWeek,

  // ── Notes ─────────────────────────────────────────────────────────────────
  Notes(String),
  AddNote { title: String, body: String },
  EditNote { index: usize, body: String },
  OpenNote(usize),

  // ── Plan ──────────────────────────────────────────────────────────────────
  Plan,
  AddTask { day: Day, priority: Priority, title: String },
  ToggleTask(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
  #[error("unknown command {0:?}; try `help`")]
  Unknown(String),
  #[error("usage: {0}")]
  Usage(&'static str),
  #[error("not a list position: {0:?}")]
  Position(String),
  #[error("not a day of the week: {0:?}")]
  Day(String),
  #[error("not a priority (high, medium, low): {0:?}")]
  Priority(String),
}

pub const HELP: &str = "\
whoami | login <email> <password> | register <email> <password> <name…> | logout
chat | say <text…>
habits | habit add <name> [| description] [| goal] | habit toggle <n> | week
notes [query…] | note add <title> [| body] | note edit <n> <body…> | note open <n>
plan | task add <day> <priority> <title…> | task toggle <n>
help | quit";

/// Parse one input line. Blank lines parse to `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
  let line = line.trim();
  if line.is_empty() {
    return Ok(None);
  }
  let (head, rest) = split_word(line);

  let cmd = match head {
    "help" | "?" => Command::Help,
    "quit" | "exit" => Command::Quit,

    "whoami" => Command::Whoami,
    "logout" => Command::Logout,
    "login" => {
      let (email, rest) = split_word(rest);
      let (password, _) = split_word(rest);
      if email.is_empty() || password.is_empty() {
        return Err(ParseError::Usage("login <email> <password>"));
      }
      Command::Login { email: email.into(), password: password.into() }
    }
    "register" => {
      let (email, rest) = split_word(rest);
      let (password, name) = split_word(rest);
      if name.is_empty() {
        return Err(ParseError::Usage("register <email> <password> <name…>"));
      }
      Command::Register {
        name:     name.into(),
        email:    email.into(),
        password: password.into(),
      }
    }

    "chat" => Command::Chat,
    "say" => Command::Say(rest.into()),

    "habits" => Command::Habits,
    "week" => Command::RollWeek,
    "habit" => match split_word(rest) {
      ("add", spec) => {
        let mut fields = spec.split('|').map(str::trim);
        let name = fields.next().unwrap_or_default().to_owned();
        let description = fields.next().unwrap_or_default().to_owned();
        let weekly_goal = match fields.next() {
          Some(goal) if !goal.is_empty() => Some(
            goal
              .parse()
              .map_err(|_| ParseError::Usage("habit add <name> [| description] [| goal]"))?,
          ),
          _ => None,
        };
        Command::AddHabit { name, description, weekly_goal }
      }
      ("toggle", n) => Command::ToggleHabit(position(n)?),
      _ => return Err(ParseError::Usage("habit add … | habit toggle <n>")),
    },

    "notes" => Command::Notes(rest.into()),
    "note" => match split_word(rest) {
      ("add", spec) => {
        let (title, body) = spec.split_once('|').unwrap_or((spec, ""));
        Command::AddNote { title: title.trim().into(), body: body.trim().into() }
      }
      ("edit", spec) => {
        let (n, body) = split_word(spec);
        Command::EditNote { index: position(n)?, body: body.into() }
      }
      ("open", n) => Command::OpenNote(position(n)?),
      _ => return Err(ParseError::Usage("note add … | note edit <n> … | note open <n>")),
    },

    "plan" => Command::Plan,
    "task" => match split_word(rest) {
      ("add", spec) => {
        let (day, spec) = split_word(spec);
        let (priority, title) = split_word(spec);
        Command::AddTask {
          day:      day.parse().map_err(|_| ParseError::Day(day.into()))?,
          priority: priority
            .parse()
            .map_err(|_| ParseError::Priority(priority.into()))?,
          title:    title.into(),
        }
      }
      ("toggle", n) => Command::ToggleTask(position(n)?),
      _ => return Err(ParseError::Usage("task add … | task toggle <n>")),
    },

    other => return Err(ParseError::Unknown(other.into())),
  };
  Ok(Some(cmd))
}

/// First whitespace-delimited word and the trimmed remainder.
fn split_word(s: &str) -> (&str, &str) {
  let s = s.trim_start();
  match s.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (s, ""),
  }
}

fn position(s: &str) -> Result<usize, ParseError> {
  match s.trim().parse::<usize>() {
    Ok(n) if n > 0 => Ok(n),
    _ => Err(ParseError::Position(s.trim().into())),
  }
}
