//! Application state and command dispatcher.
//!
//! The five managers stay independent; [`App`] only routes commands to them
//! and renders their views.

use std::io::Write;

use anyhow::Result;
use chrono::{Local, NaiveDate, Utc};
use daybook_core::{
  fixtures,
  habit::HabitTracker,
  note::{NotePatch, NoteStore},
  plan::{NewTask, WeeklyPlanner},
  session::{SessionState, SessionStore},
  storage::KeyValueStore,
  timeline::MessageTimeline,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  client::RemoteAuth,
  shell::{Command, HELP},
};

/// Whether the shell should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
  Continue,
  Quit,
}

/// A 1-based list position with nothing behind it.
#[derive(Debug, Error)]
#[error("no {kind} at position {position}")]
pub struct NoSuchPosition {
  kind:     &'static str,
  position: usize,
}

/// Top-level application state.
pub struct App<S: KeyValueStore> {
  pub session:  SessionStore<S, RemoteAuth>,
  pub timeline: MessageTimeline,
  pub habits:   HabitTracker,
  pub notes:    NoteStore,
  pub plan:     WeeklyPlanner,
  /// Ids of the notes printed by the last `notes` listing, for positional
  /// commands.
  note_listing: Vec<Uuid>,
}

impl<S: KeyValueStore> App<S> {
  /// Wrap `session` and seed the in-memory managers with fixtures.
  pub fn seeded(session: SessionStore<S, RemoteAuth>) -> Self {
    let today = Local::now().date_naive();
    let notes = fixtures::notes();
    let note_listing = notes.notes().iter().map(|n| n.id).collect();
    Self {
      session,
      timeline: fixtures::timeline(Utc::now()),
      habits: fixtures::habits(today),
      notes,
      plan: fixtures::plan(),
      note_listing,
    }
  }

  /// Run one command, writing any output to `out`.
  ///
  /// Rejected input and unknown targets are reported to `out` and leave
  /// state unchanged; only I/O and storage failures are returned as errors.
  pub async fn execute(
    &mut self,
    cmd: Command,
    out: &mut impl Write,
  ) -> Result<Flow> {
    let outcome = self.dispatch(cmd, out).await;
    match outcome {
      Ok(flow) => Ok(flow),
      Err(e) => {
        if let Some(missing) = e.downcast_ref::<NoSuchPosition>() {
          tracing::debug!(error = %missing, "command was a no-op");
          writeln!(out, "! {missing}")?;
          return Ok(Flow::Continue);
        }
        match e.downcast_ref::<daybook_core::Error>() {
          Some(core) if core.is_noop() => {
            tracing::debug!(error = %core, "command was a no-op");
            writeln!(out, "! {core}")?;
            Ok(Flow::Continue)
          }
          _ => Err(e),
        }
      }
    }
  }

  async fn dispatch(
    &mut self,
    cmd: Command,
    out: &mut impl Write,
  ) -> Result<Flow> {
    match cmd {
      Command::Help => writeln!(out, "{HELP}")?,
      Command::Quit => return Ok(Flow::Quit),

      // ── Session ───────────────────────────────────────────────────────────
      Command::Whoami => self.render_session(out)?,
      Command::Login { email, password } => {
        self.session.login(&email, &password).await?;
        self.render_session(out)?;
      }
      Command::Register { name, email, password } => {
        self.session.register(&name, &email, &password).await?;
        self.render_session(out)?;
      }
      Command::Logout => {
        self.session.logout().await?;
        writeln!(out, "logged out")?;
      }

      // ── Chat ──────────────────────────────────────────────────────────────
      Command::Chat => self.render_chat(out)?,
      Command::Say(body) => {
        let subject = self.session.subject();
        self.timeline.send(subject.as_ref(), &body)?;
        self.render_chat(out)?;
      }

      // ── Habits ────────────────────────────────────────────────────────────
      Command::Habits => self.render_habits(out)?,
      Command::AddHabit { name, description, weekly_goal } => {
        self.habits.add(&name, &description, weekly_goal)?;
        self.render_habits(out)?;
      }
      Command::ToggleHabit(n) => {
        let id = nth_id(self.habits.habits().iter().map(|h| h.id), n, "habit")?;
        self.habits.toggle(id)?;
        self.render_habits(out)?;
      }
      Command::RollWeek => {
        if self.habits.roll_week(today()) {
          writeln!(out, "new week: weekly counters reset")?;
        } else {
          writeln!(out, "still the same week")?;
        }
      }

      // ── Notes ─────────────────────────────────────────────────────────────
      Command::Notes(query) => self.render_notes(&query, out)?,
      Command::AddNote { title, body } => {
        self.notes.create(&title, &body)?;
        self.render_notes("", out)?;
      }
      Command::EditNote { index, body } => {
        let id = self.listed_note(index)?;
        self.notes.update(id, NotePatch { body: Some(body), ..Default::default() })?;
        self.notes.select(id)?;
        self.render_selected(out)?;
      }
      Command::OpenNote(index) => {
        let id = self.listed_note(index)?;
        self.notes.select(id)?;
        self.render_selected(out)?;
      }

      // ── Plan ──────────────────────────────────────────────────────────────
      Command::Plan => self.render_plan(out)?,
      Command::AddTask { day, priority, title } => {
        let mut input = NewTask::new(title, day);
        input.priority = priority;
        self.plan.add(input)?;
        self.render_plan(out)?;
      }
      Command::ToggleTask(n) => {
        let ids = self.plan_order();
        let id = nth_id(ids.into_iter(), n, "task")?;
        self.plan.toggle(id)?;
        self.render_plan(out)?;
      }
    }
    Ok(Flow::Continue)
  }

  fn listed_note(&self, index: usize) -> Result<Uuid, NoSuchPosition> {
    nth_id(self.note_listing.iter().copied(), index, "note")
  }

  /// Task ids in the order `render_plan` prints them.
  fn plan_order(&self) -> Vec<Uuid> {
    self
      .plan
      .week()
      .into_iter()
      .flat_map(|(_, tasks)| tasks.into_iter().map(|t| t.id))
      .collect()
  }

  // ── Rendering ─────────────────────────────────────────────────────────────

  fn render_session(&self, out: &mut impl Write) -> Result<()> {
    match self.session.state() {
      SessionState::Authenticated(s) => writeln!(
        out,
        "{} <{}> (id {})",
        s.subject.name, s.subject.email, s.subject.id
      )?,
      SessionState::Loading => writeln!(out, "signing in…")?,
      SessionState::Unauthenticated => writeln!(out, "not logged in")?,
    }
    Ok(())
  }

  fn render_chat(&self, out: &mut impl Write) -> Result<()> {
    let me = self.session.subject().map(|s| s.id);
    for bucket in self.timeline.group_by_day() {
      writeln!(out, "── {} ──", bucket.label)?;
      for m in bucket.messages {
        let time = m.created_at.with_timezone(&Local).format("%I:%M %p");
        if m.is_system() {
          writeln!(out, "   * {} *", m.body)?;
        } else if me.as_deref().is_some_and(|id| m.is_own(id)) {
          writeln!(out, "{time}  you: {}", m.body)?;
        } else {
          writeln!(out, "{time}  {}: {}", m.author_name, m.body)?;
        }
      }
    }
    Ok(())
  }

  fn render_habits(&self, out: &mut impl Write) -> Result<()> {
    for (i, h) in self.habits.habits().iter().enumerate() {
      let mark = if h.completed_today { "x" } else { " " };
      writeln!(
        out,
        "{:>2}. [{mark}] {} — {} day streak, {} this week",
        i + 1,
        h.name,
        h.streak,
        h.progress()
      )?;
    }
    let s = self.habits.summary();
    writeln!(
      out,
      "{}/{} done today, longest streak {}",
      s.completed_today, s.habits, s.longest_streak
    )?;
    Ok(())
  }

  fn render_notes(&mut self, query: &str, out: &mut impl Write) -> Result<()> {
    let hits = self.notes.search(query);
    self.note_listing = hits.iter().map(|n| n.id).collect();
    if hits.is_empty() {
      writeln!(out, "no notes match {query:?}")?;
    }
    let selected = self.notes.selected().map(|n| n.id);
    for (i, n) in hits.iter().enumerate() {
      let mark = if Some(n.id) == selected { ">" } else { " " };
      writeln!(
        out,
        "{mark}{:>2}. {} ({})",
        i + 1,
        n.title,
        n.updated_at.with_timezone(&Local).format("%b %-d")
      )?;
    }
    Ok(())
  }

  fn render_selected(&self, out: &mut impl Write) -> Result<()> {
    if let Some(n) = self.notes.selected() {
      writeln!(out, "# {}\n{}", n.title, n.body)?;
    }
    Ok(())
  }

  fn render_plan(&self, out: &mut impl Write) -> Result<()> {
    let mut position = 0;
    for (day, tasks) in self.plan.week() {
      let (done, total) = self.plan.day_progress(day);
      writeln!(out, "{day} ({done}/{total})")?;
      for t in tasks {
        position += 1;
        let mark = if t.completed { "x" } else { " " };
        let estimate = t.estimated_time.as_deref().unwrap_or("-");
        writeln!(
          out,
          "  {position:>2}. [{mark}] {} [{}] {estimate}",
          t.title, t.priority
        )?;
      }
    }
    Ok(())
  }
}

fn today() -> NaiveDate { Local::now().date_naive() }

/// The id at 1-based position `n`.
fn nth_id(
  mut ids: impl Iterator<Item = Uuid>,
  n: usize,
  kind: &'static str,
) -> Result<Uuid, NoSuchPosition> {
  n.checked_sub(1)
    .and_then(|i| ids.nth(i))
    .ok_or(NoSuchPosition { kind, position: n })
}
