//! [`WeeklyPlanner`] — tasks pinned to days of the week.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator as _};
use uuid::Uuid;

use crate::{Error, Result};

/// A day of the planning week. Iterates Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Day {
  Monday,
  Tuesday,
  Wednesday,
  Thursday,
  Friday,
  Saturday,
  Sunday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
  High,
  #[default]
  Medium,
  Low,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
  pub id:             Uuid,
  pub title:          String,
  pub description:    String,
  pub day:            Day,
  pub priority:       Priority,
  pub completed:      bool,
  /// Free text such as `1h` or `30m`.
  pub estimated_time: Option<String>,
}

/// Input to [`WeeklyPlanner::add`].
#[derive(Debug, Clone)]
pub struct NewTask {
  pub title:          String,
  pub description:    String,
  pub day:            Day,
  pub priority:       Priority,
  pub estimated_time: Option<String>,
}

impl NewTask {
  /// Convenience constructor with medium priority and no description.
  pub fn new(title: impl Into<String>, day: Day) -> Self {
    Self {
      title: title.into(),
      description: String::new(),
      day,
      priority: Priority::default(),
      estimated_time: None,
    }
  }
}

#[derive(Debug, Default)]
pub struct WeeklyPlanner {
  tasks: Vec<Task>,
}

impl WeeklyPlanner {
  pub fn new() -> Self { Self::default() }

  pub fn add(&mut self, input: NewTask) -> Result<&Task> {
    let title = input.title.trim();
    if title.is_empty() {
      return Err(Error::ValidationRejected("title"));
    }

    let estimated_time = input
      .estimated_time
      .map(|t| t.trim().to_owned())
      .filter(|t| !t.is_empty());

    self.tasks.push(Task {
      id: Uuid::new_v4(),
      title: title.to_owned(),
      description: input.description,
      day: input.day,
      priority: input.priority,
      completed: false,
      estimated_time,
    });
    let task = &self.tasks[self.tasks.len() - 1];
    tracing::debug!(task_id = %task.id, day = %task.day, "task added");
    Ok(task)
  }

  /// Insert a fully-formed task, e.g. from fixtures.
  pub fn insert(&mut self, task: Task) { self.tasks.push(task); }

  pub fn toggle(&mut self, task_id: Uuid) -> Result<&Task> {
    let task = self
      .tasks
      .iter_mut()
      .find(|t| t.id == task_id)
      .ok_or(Error::TaskNotFound(task_id))?;
    task.completed = !task.completed;
    Ok(task)
  }

  pub fn tasks(&self) -> &[Task] { &self.tasks }

  pub fn tasks_for(&self, day: Day) -> impl Iterator<Item = &Task> {
    self.tasks.iter().filter(move |t| t.day == day)
  }

  /// `(completed, total)` for one day.
  pub fn day_progress(&self, day: Day) -> (usize, usize) {
    self.tasks_for(day).fold((0, 0), |(done, total), t| {
      (done + usize::from(t.completed), total + 1)
    })
  }

  /// Every day Monday through Sunday with its tasks, empty days included.
  pub fn week(&self) -> Vec<(Day, Vec<&Task>)> {
    Day::iter().map(|d| (d, self.tasks_for(d).collect())).collect()
  }
}
