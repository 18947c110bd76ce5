//! [`HabitTracker`] — habits, streaks and weekly progress.
//!
//! Streak and weekly count move in lock-step with the completed-today flag:
//! checking a habit adds one to both, unchecking takes one from both with a
//! floor of zero. The weekly count is never clamped against the goal.
//!
//! Weekly counters reset only through [`HabitTracker::roll_week`], which
//! compares ISO weeks. There is no daily rollover.

use chrono::{DateTime, Datelike as _, IsoWeek, Local, NaiveDate, Utc};
use uuid::Uuid;

use crate::{Error, Result};

pub const DEFAULT_WEEKLY_GOAL: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Habit {
  pub id:                  Uuid,
  pub name:                String,
  pub description:         String,
  pub streak:              u32,
  pub completed_today:     bool,
  /// Always positive.
  pub weekly_goal:         u32,
  pub completed_this_week: u32,
  pub created_at:          DateTime<Utc>,
}

impl Habit {
  pub fn progress(&self) -> WeeklyProgress {
    WeeklyProgress {
      completed: self.completed_this_week,
      goal:      self.weekly_goal,
    }
  }
}

/// `completed/goal` for the current week. `completed` may exceed `goal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyProgress {
  pub completed: u32,
  pub goal:      u32,
}

impl WeeklyProgress {
  pub fn goal_met(&self) -> bool { self.completed >= self.goal }
}

impl std::fmt::Display for WeeklyProgress {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.completed, self.goal)
  }
}

/// Aggregate figures across every habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerSummary {
  pub habits:          usize,
  pub completed_today: usize,
  pub longest_streak:  u32,
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct HabitTracker {
  habits: Vec<Habit>,
  /// The ISO week whose completions `completed_this_week` counts.
  week:   IsoWeek,
}

impl Default for HabitTracker {
  fn default() -> Self { Self::new(Local::now().date_naive()) }
}

impl HabitTracker {
  /// An empty tracker counting the week that contains `today`.
  pub fn new(today: NaiveDate) -> Self {
    Self { habits: Vec::new(), week: today.iso_week() }
  }

  /// Add a habit with a zero streak. `weekly_goal` defaults to
  /// [`DEFAULT_WEEKLY_GOAL`].
  pub fn add(
    &mut self,
    name: &str,
    description: &str,
    weekly_goal: Option<u32>,
  ) -> Result<&Habit> {
    let name = name.trim();
    if name.is_empty() {
      return Err(Error::ValidationRejected("name"));
    }
    let weekly_goal = weekly_goal.unwrap_or(DEFAULT_WEEKLY_GOAL);
    if weekly_goal == 0 {
      return Err(Error::NotPositive("weekly goal"));
    }

    self.habits.push(Habit {
      id: Uuid::new_v4(),
      name: name.to_owned(),
      description: description.trim().to_owned(),
      streak: 0,
      completed_today: false,
      weekly_goal,
      completed_this_week: 0,
      created_at: Utc::now(),
    });
    let habit = &self.habits[self.habits.len() - 1];
    tracing::debug!(habit_id = %habit.id, "habit added");
    Ok(habit)
  }

  /// Insert a fully-formed habit, e.g. from fixtures.
  pub fn insert(&mut self, habit: Habit) { self.habits.push(habit); }

  /// Flip today's completion and move streak and weekly count with it.
  pub fn toggle(&mut self, habit_id: Uuid) -> Result<&Habit> {
    let habit = self
      .habits
      .iter_mut()
      .find(|h| h.id == habit_id)
      .ok_or(Error::HabitNotFound(habit_id))?;

    if habit.completed_today {
      habit.completed_today = false;
      habit.streak = habit.streak.saturating_sub(1);
      habit.completed_this_week = habit.completed_this_week.saturating_sub(1);
    } else {
      habit.completed_today = true;
      habit.streak += 1;
      habit.completed_this_week += 1;
    }
    tracing::debug!(
      %habit_id,
      completed_today = habit.completed_today,
      streak = habit.streak,
      "habit toggled"
    );
    Ok(habit)
  }

  /// Start a new counting week if `today` falls outside the tracked ISO
  /// week. Returns whether the counters were reset.
  pub fn roll_week(&mut self, today: NaiveDate) -> bool {
    let week = today.iso_week();
    if week == self.week {
      return false;
    }
    for habit in &mut self.habits {
      habit.completed_this_week = 0;
    }
    tracing::info!(
      year = week.year(),
      week = week.week(),
      "weekly habit counters reset"
    );
    self.week = week;
    true
  }

  pub fn get(&self, habit_id: Uuid) -> Option<&Habit> {
    self.habits.iter().find(|h| h.id == habit_id)
  }

  /// All habits in insertion order.
  pub fn habits(&self) -> &[Habit] { &self.habits }

  pub fn summary(&self) -> TrackerSummary {
    TrackerSummary {
      habits:          self.habits.len(),
      completed_today: self.habits.iter().filter(|h| h.completed_today).count(),
      longest_streak:  self.habits.iter().map(|h| h.streak).max().unwrap_or(0),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn monday() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, 4).unwrap() }

  fn tracker() -> HabitTracker { HabitTracker::new(monday()) }

  #[test]
  fn add_then_toggle_twice() {
    let mut t = tracker();
    let id = t.add("Read", "", None).unwrap().id;
    let h = t.get(id).unwrap();
    assert_eq!((h.streak, h.completed_today), (0, false));
    assert_eq!(h.weekly_goal, DEFAULT_WEEKLY_GOAL);

    let h = t.toggle(id).unwrap();
    assert_eq!((h.streak, h.completed_today, h.completed_this_week), (1, true, 1));

    let h = t.toggle(id).unwrap();
    assert_eq!((h.streak, h.completed_today, h.completed_this_week), (0, false, 0));
  }

  #[test]
  fn pair_of_toggles_restores_state_from_any_start() {
    let mut t = tracker();
    for (streak, done, week) in [(0, false, 0), (5, false, 3), (3, true, 2)] {
      let id = Uuid::new_v4();
      t.insert(Habit {
        id,
        name: "h".into(),
        description: String::new(),
        streak,
        completed_today: done,
        weekly_goal: 5,
        completed_this_week: week,
        created_at: Utc::now(),
      });
      let before = t.get(id).unwrap().clone();
      t.toggle(id).unwrap();
      t.toggle(id).unwrap();
      assert_eq!(t.get(id).unwrap(), &before);
    }
  }

  #[test]
  fn untoggle_at_zero_stays_at_zero() {
    let mut t = tracker();
    let id = Uuid::new_v4();
    t.insert(Habit {
      id,
      name: "h".into(),
      description: String::new(),
      streak: 0,
      completed_today: true,
      weekly_goal: 3,
      completed_this_week: 0,
      created_at: Utc::now(),
    });
    let h = t.toggle(id).unwrap();
    assert_eq!((h.streak, h.completed_this_week), (0, 0));
    assert!(!h.completed_today);
  }

  #[test]
  fn weekly_count_may_exceed_goal() {
    let mut t = tracker();
    let id = t.add("Stretch", "", Some(1)).unwrap().id;
    t.toggle(id).unwrap();
    t.toggle(id).unwrap();
    t.toggle(id).unwrap();
    // on, off, on: one completion counted, goal of one met.
    assert!(t.get(id).unwrap().progress().goal_met());

    let mut h = t.get(id).unwrap().clone();
    h.id = Uuid::new_v4();
    h.completed_today = false;
    h.completed_this_week = 4;
    t.insert(h.clone());
    let after = t.toggle(h.id).unwrap();
    assert_eq!(after.progress().to_string(), "5/1");
  }

  #[test]
  fn rejects_blank_name_and_zero_goal() {
    let mut t = tracker();
    assert!(matches!(t.add("  ", "x", None), Err(Error::ValidationRejected("name"))));
    let err = t.add("Run", "", Some(0)).unwrap_err();
    assert!(matches!(err, Error::NotPositive("weekly goal")));
    assert_eq!(err.to_string(), "rejected: weekly goal must be at least 1");
    assert!(t.habits().is_empty());
  }

  #[test]
  fn toggle_unknown_is_not_found() {
    let mut t = tracker();
    let id = Uuid::new_v4();
    assert!(matches!(t.toggle(id), Err(Error::HabitNotFound(x)) if x == id));
  }

  #[test]
  fn roll_week_resets_only_on_new_iso_week() {
    let mut t = tracker();
    let id = t.add("Walk", "", None).unwrap().id;
    t.toggle(id).unwrap();

    let sunday = monday() + chrono::Duration::days(6);
    assert!(!t.roll_week(sunday));
    assert_eq!(t.get(id).unwrap().completed_this_week, 1);

    let next_monday = monday() + chrono::Duration::days(7);
    assert!(t.roll_week(next_monday));
    let h = t.get(id).unwrap();
    assert_eq!(h.completed_this_week, 0);
    assert_eq!(h.streak, 1);
    assert!(h.completed_today);
  }

  #[test]
  fn summary_counts() {
    let mut t = tracker();
    let a = t.add("A", "", None).unwrap().id;
    t.add("B", "", None).unwrap();
    t.toggle(a).unwrap();

    let s = t.summary();
    assert_eq!(s, TrackerSummary { habits: 2, completed_today: 1, longest_streak: 1 });
  }
}
