//! [`MessageTimeline`] — the append-only chat log and its day-bucketed view.

use std::{fmt, iter::FusedIterator};

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

use crate::{Error, Result, session::Subject};

/// Author id reserved for messages generated by the application itself.
pub const SYSTEM_AUTHOR_ID: &str = "system";

// ─── Message ─────────────────────────────────────────────────────────────────

/// Position of a message in its timeline. Strictly increasing in append
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A chat message. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
  pub id:          MessageId,
  pub author_id:   String,
  pub author_name: String,
  /// Trimmed, never empty.
  pub body:        String,
  pub created_at:  DateTime<Utc>,
}

impl ChatMessage {
  /// System messages get distinct rendering but are grouped like any other.
  pub fn is_system(&self) -> bool { self.author_id == SYSTEM_AUTHOR_ID }

  /// Whether `subject_id` wrote this message.
  pub fn is_own(&self, subject_id: &str) -> bool {
    self.author_id == subject_id
  }
}

// ─── Timeline ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MessageTimeline {
  messages: Vec<ChatMessage>,
  next_id:  u64,
}

impl MessageTimeline {
  pub fn new() -> Self { Self::default() }

  /// Append a message stamped with the current time.
  pub fn append(
    &mut self,
    author_id: &str,
    author_name: &str,
    body: &str,
  ) -> Result<&ChatMessage> {
    self.append_at(author_id, author_name, body, Utc::now())
  }

  /// Append a message with an explicit timestamp. The message still goes to
  /// the end of the log regardless of `created_at`.
  pub fn append_at(
    &mut self,
    author_id: &str,
    author_name: &str,
    body: &str,
    created_at: DateTime<Utc>,
  ) -> Result<&ChatMessage> {
    let body = body.trim();
    if body.is_empty() {
      return Err(Error::ValidationRejected("body"));
    }
    if author_id.is_empty() {
      return Err(Error::NoSession);
    }

    let id = MessageId(self.next_id);
    self.next_id += 1;
    self.messages.push(ChatMessage {
      id,
      author_id: author_id.to_owned(),
      author_name: author_name.to_owned(),
      body: body.to_owned(),
      created_at,
    });
    tracing::debug!(%id, author_id, "message appended");
    Ok(&self.messages[self.messages.len() - 1])
  }

  /// Send `body` as the logged-in subject, if there is one.
  pub fn send(
    &mut self,
    subject: Option<&Subject>,
    body: &str,
  ) -> Result<&ChatMessage> {
    let subject = subject.ok_or(Error::NoSession)?;
    self.append(&subject.id, &subject.name, body)
  }

  pub fn messages(&self) -> &[ChatMessage] { &self.messages }

  pub fn len(&self) -> usize { self.messages.len() }

  pub fn is_empty(&self) -> bool { self.messages.is_empty() }

  /// Group the log by local calendar date, relative to today.
  pub fn group_by_day(&self) -> DayGroups<'_, Local> {
    self.group_by_day_in(Local, Local::now().date_naive())
  }

  /// Group the log by calendar date in `tz`, labelling relative to `today`.
  ///
  /// The returned iterator is lazy and recomputed on every call. Buckets
  /// appear in the order their date is first seen while scanning the log;
  /// a date that reappears later (e.g. after a clock change) joins its
  /// existing bucket.
  pub fn group_by_day_in<Tz: TimeZone>(
    &self,
    tz: Tz,
    today: NaiveDate,
  ) -> DayGroups<'_, Tz> {
    DayGroups {
      messages: &self.messages,
      tz,
      today,
      cursor: 0,
      seen: Vec::new(),
    }
  }
}

// ─── Day grouping ────────────────────────────────────────────────────────────

/// Heading for a [`DayBucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayLabel {
  Today,
  Yesterday,
  /// Rendered as a short month and day, e.g. `Jan 15`.
  Date(NaiveDate),
}

impl DayLabel {
  fn relative_to(date: NaiveDate, today: NaiveDate) -> Self {
    if date == today {
      Self::Today
    } else if today.pred_opt() == Some(date) {
      Self::Yesterday
    } else {
      Self::Date(date)
    }
  }
}

impl fmt::Display for DayLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Today => f.write_str("Today"),
      Self::Yesterday => f.write_str("Yesterday"),
      Self::Date(d) => write!(f, "{}", d.format("%b %-d")),
    }
  }
}

/// All messages sharing one local calendar date, in log order.
#[derive(Debug, Clone)]
pub struct DayBucket<'a> {
  pub date:     NaiveDate,
  pub label:    DayLabel,
  pub messages: Vec<&'a ChatMessage>,
}

/// Iterator returned by [`MessageTimeline::group_by_day_in`].
pub struct DayGroups<'a, Tz: TimeZone> {
  messages: &'a [ChatMessage],
  tz:       Tz,
  today:    NaiveDate,
  cursor:   usize,
  seen:     Vec<NaiveDate>,
}

impl<Tz: TimeZone> DayGroups<'_, Tz> {
  fn local_date(&self, message: &ChatMessage) -> NaiveDate {
    message.created_at.with_timezone(&self.tz).date_naive()
  }
}

impl<'a, Tz: TimeZone> Iterator for DayGroups<'a, Tz> {
  type Item = DayBucket<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    let messages = self.messages;
    while let Some(first) = messages.get(self.cursor) {
      self.cursor += 1;
      let date = self.local_date(first);
      if self.seen.contains(&date) {
        continue;
      }
      self.seen.push(date);

      let rest = &messages[self.cursor..];
      let bucket = std::iter::once(first)
        .chain(rest.iter().filter(|m| self.local_date(m) == date))
        .collect();
      return Some(DayBucket {
        date,
        label: DayLabel::relative_to(date, self.today),
        messages: bucket,
      });
    }
    None
  }
}

impl<Tz: TimeZone> FusedIterator for DayGroups<'_, Tz> {}
