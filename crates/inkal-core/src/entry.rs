use chrono::{
  DateTime,
  FixedOffset,
  NaiveDate
};
use serde::{
  Deserialize,
  Serialize
};

use crate::error::EntryError;

/// A timed or all-day calendar event.
/// Timestamps are already expressed in
/// the display timezone, with midnight
/// end times pulled back to the previous
/// day by the upstream converter.
#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct Event {
  pub title: String,

  pub start: DateTime<FixedOffset>,

  pub end: DateTime<FixedOffset>,

  #[serde(default)]
  pub all_day: bool,

  #[serde(default)]
  pub is_updated: bool
}

impl Event {
  pub fn start_date(&self) -> NaiveDate {
    self.start.date_naive()
  }

  pub fn end_date(&self) -> NaiveDate {
    self.end.date_naive()
  }

  pub fn is_multiday(&self) -> bool {
    self.start_date() != self.end_date()
  }
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct Task {
  pub title: String,

  #[serde(default)]
  pub due: Option<NaiveDate>,

  #[serde(default)]
  pub is_updated: bool,

  #[serde(default)]
  pub is_completed: bool
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(
  tag = "kind",
  rename_all = "lowercase"
)]
pub enum CalendarEntry {
  Event(Event),
  Task(Task)
}

impl CalendarEntry {
  pub fn title(&self) -> &str {
    match self {
      | Self::Event(event) => &event.title,
      | Self::Task(task) => &task.title
    }
  }

  pub fn is_updated(&self) -> bool {
    match self {
      | Self::Event(event) => {
        event.is_updated
      }
      | Self::Task(task) => task.is_updated
    }
  }

  pub fn is_completed(&self) -> bool {
    match self {
      | Self::Event(_) => false,
      | Self::Task(task) => {
        task.is_completed
      }
    }
  }

  pub fn validate(
    &self
  ) -> Result<(), EntryError> {
    match self {
      | Self::Event(event)
        if event.end < event.start =>
      {
        Err(EntryError::EndBeforeStart {
          title: event.title.clone()
        })
      }
      | _ => Ok(())
    }
  }
}

impl From<Event> for CalendarEntry {
  fn from(event: Event) -> Self {
    Self::Event(event)
  }
}

impl From<Task> for CalendarEntry {
  fn from(task: Task) -> Self {
    Self::Task(task)
  }
}
