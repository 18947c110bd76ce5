//! [`NoteStore`] — notes kept most-recent-first, with in-place editing and
//! substring search.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
  pub id:         Uuid,
  pub title:      String,
  pub body:       String,
  pub created_at: DateTime<Utc>,
  /// Never earlier than `created_at`.
  pub updated_at: DateTime<Utc>,
}

impl Note {
  fn matches(&self, needle: &str) -> bool {
    self.title.to_lowercase().contains(needle)
      || self.body.to_lowercase().contains(needle)
  }
}

/// Partial update for [`NoteStore::update`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
  pub title: Option<String>,
  pub body:  Option<String>,
}

#[derive(Debug, Default)]
pub struct NoteStore {
  notes:    Vec<Note>,
  /// The note the presentation layer currently has open.
  selected: Option<Uuid>,
}

impl NoteStore {
  pub fn new() -> Self { Self::default() }

  /// Create a note at the front of the store and select it.
  pub fn create(&mut self, title: &str, body: &str) -> Result<&Note> {
    let title = title.trim();
    if title.is_empty() {
      return Err(Error::ValidationRejected("title"));
    }

    let now = Utc::now();
    let note = Note {
      id:         Uuid::new_v4(),
      title:      title.to_owned(),
      body:       body.to_owned(),
      created_at: now,
      updated_at: now,
    };
    tracing::debug!(note_id = %note.id, "note created");
    self.selected = Some(note.id);
    self.notes.insert(0, note);
    Ok(&self.notes[0])
  }

  /// Add an existing note at the back of the store, e.g. from fixtures.
  pub fn insert(&mut self, note: Note) { self.notes.push(note); }

  /// Apply `patch` to a note and refresh its `updated_at`. A patched title
  /// is trimmed and must not be blank, as in [`create`](Self::create).
  pub fn update(&mut self, note_id: Uuid, patch: NotePatch) -> Result<&Note> {
    let note = self
      .notes
      .iter_mut()
      .find(|n| n.id == note_id)
      .ok_or(Error::NoteNotFound(note_id))?;

    let title = match patch.title.as_deref().map(str::trim) {
      Some("") => return Err(Error::ValidationRejected("title")),
      other => other.map(str::to_owned),
    };

    if let Some(title) = title {
      note.title = title;
    }
    if let Some(body) = patch.body {
      note.body = body;
    }
    note.updated_at = Utc::now().max(note.created_at);
    Ok(note)
  }

  /// Notes whose title or body contains `query`, ignoring case, in store
  /// order. An empty query returns everything.
  pub fn search(&self, query: &str) -> Vec<&Note> {
    let needle = query.to_lowercase();
    self.notes.iter().filter(|n| n.matches(&needle)).collect()
  }

  pub fn get(&self, note_id: Uuid) -> Option<&Note> {
    self.notes.iter().find(|n| n.id == note_id)
  }

  pub fn notes(&self) -> &[Note] { &self.notes }

  // ── Selection ────────────────────────────────────────────────────────────

  pub fn select(&mut self, note_id: Uuid) -> Result<&Note> {
    let note = self
      .notes
      .iter()
      .find(|n| n.id == note_id)
      .ok_or(Error::NoteNotFound(note_id))?;
    self.selected = Some(note_id);
    Ok(note)
  }

  pub fn selected(&self) -> Option<&Note> {
    self.selected.and_then(|id| self.get(id))
  }

  pub fn clear_selection(&mut self) { self.selected = None; }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_title_creates_nothing() {
    let mut s = NoteStore::new();
    assert!(matches!(s.create("", "body"), Err(Error::ValidationRejected("title"))));
    assert!(s.notes().is_empty());
    assert!(s.selected().is_none());
  }

  #[test]
  fn create_puts_note_first_and_selects_it() {
    let mut s = NoteStore::new();
    s.create("Older", "x").unwrap();
    let id = s.create("Title", "body").unwrap().id;

    assert_eq!(s.notes()[0].id, id);
    assert_eq!(s.selected().unwrap().id, id);
    let hits = s.search("title");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
  }

  #[test]
  fn search_matches_title_or_body_case_insensitively() {
    let mut s = NoteStore::new();
    s.create("Groceries", "Milk and EGGS").unwrap();
    s.create("Standup", "talked about eggs").unwrap();
    s.create("Plans", "nothing here").unwrap();

    let all = s.search("");
    assert_eq!(all.len(), 3);

    let eggs = s.search("Eggs");
    let titles: Vec<_> = eggs.iter().map(|n| n.title.as_str()).collect();
    // Store order, most recent first.
    assert_eq!(titles, ["Standup", "Groceries"]);
    for note in &eggs {
      assert!(all.iter().any(|a| a.id == note.id));
      assert!(
        note.title.to_lowercase().contains("eggs")
          || note.body.to_lowercase().contains("eggs")
      );
    }

    assert!(s.search("zzz").is_empty());
  }

  #[test]
  fn update_patches_fields_and_touches_timestamp() {
    let mut s = NoteStore::new();
    let created = s.create("Draft", "v1").unwrap().clone();

    let updated = s
      .update(created.id, NotePatch { body: Some("v2".into()), ..Default::default() })
      .unwrap();
    assert_eq!(updated.title, "Draft");
    assert_eq!(updated.body, "v2");
    assert!(updated.updated_at >= created.updated_at);
    assert!(updated.updated_at >= updated.created_at);
  }

  #[test]
  fn update_trims_title_and_rejects_blank() {
    let mut s = NoteStore::new();
    let id = s.create("Draft", "v1").unwrap().id;

    let updated = s
      .update(id, NotePatch { title: Some("  Final  ".into()), ..Default::default() })
      .unwrap();
    assert_eq!(updated.title, "Final");

    let before = s.notes().to_vec();
    let err = s
      .update(id, NotePatch { title: Some("   ".into()), body: Some("v2".into()) })
      .unwrap_err();
    assert!(matches!(err, Error::ValidationRejected("title")));
    assert_eq!(s.notes(), before.as_slice());
  }

  #[test]
  fn update_unknown_is_not_found() {
    let mut s = NoteStore::new();
    s.create("A", "").unwrap();
    let before = s.notes().to_vec();
    let err = s.update(Uuid::new_v4(), NotePatch::default()).unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(_)));
    assert_eq!(s.notes(), before.as_slice());
  }

  #[test]
  fn selection_is_independent_of_notes() {
    let mut s = NoteStore::new();
    let a = s.create("A", "").unwrap().id;
    s.create("B", "").unwrap();
    s.select(a).unwrap();
    assert_eq!(s.selected().unwrap().title, "A");
    s.clear_selection();
    assert!(s.selected().is_none());
    assert!(s.select(Uuid::new_v4()).is_err());
  }
}
