//! Seed data so a fresh process has something to show.

use chrono::{DateTime, Duration, NaiveDate, TimeZone as _, Utc};
use uuid::Uuid;

use crate::{
  habit::{Habit, HabitTracker},
  note::{Note, NoteStore},
  plan::{Day, Priority, Task, WeeklyPlanner},
  timeline::{MessageTimeline, SYSTEM_AUTHOR_ID},
};

/// A welcome message from the system followed by three teammates, the last
/// one a minute before `now`.
pub fn timeline(now: DateTime<Utc>) -> MessageTimeline {
  let mut timeline = MessageTimeline::new();
  let seed = [
    (
      SYSTEM_AUTHOR_ID,
      "System",
      "Welcome to the team chat! Start collaborating with your team.",
      Duration::zero(),
    ),
    (
      "user2",
      "Alice Johnson",
      "Hey team! Just pushed the latest updates to the staging environment. Ready for review!",
      Duration::minutes(5),
    ),
    (
      "user3",
      "Bob Wilson",
      "Great work Alice! I'll run the automated tests and let you know the results.",
      Duration::minutes(3),
    ),
    (
      "user4",
      "Charlie Brown",
      "The CI/CD pipeline is running smoothly. All checks passed!",
      Duration::minutes(1),
    ),
  ];
  for (author_id, author_name, body, ago) in seed {
    // Seed bodies are non-empty literals.
    let _ = timeline.append_at(author_id, author_name, body, now - ago);
  }
  timeline
}

pub fn habits(today: NaiveDate) -> HabitTracker {
  let mut tracker = HabitTracker::new(today);
  tracker.insert(Habit {
    id:                  Uuid::new_v4(),
    name:                "Morning Exercise".into(),
    description:         "30 minutes of workout".into(),
    streak:              5,
    completed_today:     true,
    weekly_goal:         5,
    completed_this_week: 3,
    created_at:          utc_date(2024, 1, 10),
  });
  tracker.insert(Habit {
    id:                  Uuid::new_v4(),
    name:                "Read 30 minutes".into(),
    description:         "Daily reading habit".into(),
    streak:              12,
    completed_today:     false,
    weekly_goal:         7,
    completed_this_week: 4,
    created_at:          utc_date(2024, 1, 5),
  });
  tracker
}

pub fn notes() -> NoteStore {
  let mut store = NoteStore::new();
  for (title, body, at) in [
    (
      "Meeting Notes",
      "Discussed project timeline and deliverables...",
      utc_date(2024, 1, 15),
    ),
    (
      "Ideas for Blog Post",
      "Write about productivity tips and time management...",
      utc_date(2024, 1, 14),
    ),
  ] {
    store.insert(Note {
      id:         Uuid::new_v4(),
      title:      title.into(),
      body:       body.into(),
      created_at: at,
      updated_at: at,
    });
  }
  store
}

pub fn plan() -> WeeklyPlanner {
  let mut planner = WeeklyPlanner::new();
  planner.insert(Task {
    id:             Uuid::new_v4(),
    title:          "Team Meeting".into(),
    description:    "Weekly sync with the development team".into(),
    day:            Day::Monday,
    priority:       Priority::High,
    completed:      false,
    estimated_time: Some("1h".into()),
  });
  planner.insert(Task {
    id:             Uuid::new_v4(),
    title:          "Review Project Proposal".into(),
    description:    "Go through the new client proposal".into(),
    day:            Day::Tuesday,
    priority:       Priority::Medium,
    completed:      true,
    estimated_time: Some("2h".into()),
  });
  planner
}

fn utc_date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(y, m, d, 0, 0, 0)
    .single()
    .unwrap_or_default()
}
