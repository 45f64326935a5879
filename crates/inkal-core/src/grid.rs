use chrono::NaiveDate;
use tracing::{
  debug,
  warn
};

use crate::datetime::{
  add_days,
  day_offset
};
use crate::entry::CalendarEntry;

pub const DAYS_PER_WEEK: usize = 7;

/// The dates covered by one render: a
/// run of `num_days` consecutive days
/// starting at `start`.
#[derive(Debug, Clone, Copy)]
pub struct GridWindow {
  pub start:    NaiveDate,
  pub num_days: usize,
  pub today:    NaiveDate
}

impl GridWindow {
  pub fn new(
    start: NaiveDate,
    num_weeks: usize,
    today: NaiveDate
  ) -> Self {
    Self {
      start,
      num_days: num_weeks * DAYS_PER_WEEK,
      today
    }
  }

  pub fn date_at(
    &self,
    index: usize
  ) -> NaiveDate {
    add_days(self.start, index as i64)
  }

  /// Bucket index of `date`, if it falls
  /// inside the window.
  pub fn index_of(
    &self,
    date: NaiveDate
  ) -> Option<usize> {
    let offset =
      day_offset(self.start, date);
    usize::try_from(offset)
      .ok()
      .filter(|idx| *idx < self.num_days)
  }
}

#[derive(Debug, Clone)]
pub struct DayBucket<'a> {
  pub date:    NaiveDate,
  pub entries: Vec<&'a CalendarEntry>
}

impl DayBucket<'_> {
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Routes entries into per-day buckets.
///
/// Entries keep their input order within
/// a bucket. A multi-day event lands on
/// both its start day and its end day,
/// each only when that day is inside the
/// window, so an event that began before
/// the window still shows where it ends.
/// Tasks without a due date and entries
/// outside the window are dropped.
#[tracing::instrument(skip(window, entries), fields(start = %window.start, num_days = window.num_days))]
pub fn allocate<'a>(
  window: &GridWindow,
  entries: &'a [CalendarEntry]
) -> Vec<DayBucket<'a>> {
  let mut buckets = (0..window.num_days)
    .map(|idx| {
      DayBucket {
        date:    window.date_at(idx),
        entries: vec![]
      }
    })
    .collect::<Vec<_>>();

  let mut placed = 0_usize;
  for entry in entries {
    if let Err(err) = entry.validate() {
      warn!(error = %err, "skipping entry");
      continue;
    }

    match entry {
      | CalendarEntry::Event(event) => {
        if let Some(idx) = window
          .index_of(event.start_date())
        {
          buckets[idx].entries.push(entry);
          placed += 1;
        }
        if event.is_multiday()
          && let Some(idx) = window
            .index_of(event.end_date())
        {
          buckets[idx].entries.push(entry);
          placed += 1;
        }
      }
      | CalendarEntry::Task(task) => {
        let Some(due) = task.due else {
          continue;
        };
        if let Some(idx) =
          window.index_of(due)
        {
          buckets[idx].entries.push(entry);
          placed += 1;
        }
      }
    }
  }

  debug!(
    entries = entries.len(),
    placements = placed,
    "allocated entries to grid"
  );
  buckets
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    NaiveDate
  };

  use super::*;
  use crate::entry::{
    Event,
    Task
  };

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn event(
    title: &str,
    start: &str,
    end: &str
  ) -> CalendarEntry {
    CalendarEntry::Event(Event {
      title:      title.to_string(),
      start:      DateTime::parse_from_rfc3339(
        start
      )
      .expect("valid start"),
      end:        DateTime::parse_from_rfc3339(end)
        .expect("valid end"),
      all_day:    false,
      is_updated: false
    })
  }

  fn task(
    title: &str,
    due: Option<NaiveDate>
  ) -> CalendarEntry {
    CalendarEntry::Task(Task {
      title: title.to_string(),
      due,
      is_updated: false,
      is_completed: false
    })
  }

  fn window() -> GridWindow {
    GridWindow::new(
      date(2026, 3, 1),
      4,
      date(2026, 3, 4)
    )
  }

  fn appearances(
    buckets: &[DayBucket<'_>],
    title: &str
  ) -> Vec<usize> {
    buckets
      .iter()
      .enumerate()
      .filter(|(_, bucket)| {
        bucket
          .entries
          .iter()
          .any(|e| e.title() == title)
      })
      .map(|(idx, _)| idx)
      .collect()
  }

  #[test]
  fn single_day_event_lands_once() {
    let entries = vec![event(
      "lunch",
      "2026-03-03T12:00:00+01:00",
      "2026-03-03T13:00:00+01:00"
    )];
    let buckets =
      allocate(&window(), &entries);

    assert_eq!(buckets.len(), 28);
    assert_eq!(
      appearances(&buckets, "lunch"),
      vec![2]
    );
  }

  #[test]
  fn multiday_event_marks_start_and_end() {
    let entries = vec![event(
      "trip",
      "2026-03-03T00:00:00+01:00",
      "2026-03-05T23:59:59+01:00"
    )];
    let buckets =
      allocate(&window(), &entries);

    assert_eq!(
      appearances(&buckets, "trip"),
      vec![2, 4]
    );
  }

  #[test]
  fn event_started_before_window_shows_on_end_day()
   {
    let entries = vec![
      event(
        "conference",
        "2026-02-26T09:00:00+01:00",
        "2026-03-02T17:00:00+01:00"
      ),
      event(
        "past",
        "2026-02-20T09:00:00+01:00",
        "2026-02-22T17:00:00+01:00"
      ),
      event(
        "beyond",
        "2026-03-28T09:00:00+01:00",
        "2026-04-02T17:00:00+01:00"
      ),
    ];
    let buckets =
      allocate(&window(), &entries);

    assert_eq!(
      appearances(&buckets, "conference"),
      vec![1]
    );
    assert!(
      appearances(&buckets, "past")
        .is_empty()
    );
    assert_eq!(
      appearances(&buckets, "beyond"),
      vec![27]
    );
  }

  #[test]
  fn events_near_midnight_keep_local_date() {
    // Europe switches to +02:00 early on
    // 2026-03-29; both events fall on the
    // previous UTC day.
    let window = GridWindow::new(
      date(2026, 3, 22),
      2,
      date(2026, 3, 25)
    );
    let entries = vec![
      event(
        "before switch",
        "2026-03-29T00:30:00+01:00",
        "2026-03-29T01:00:00+01:00"
      ),
      event(
        "after switch",
        "2026-03-30T00:30:00+02:00",
        "2026-03-30T01:00:00+02:00"
      ),
    ];
    let buckets =
      allocate(&window, &entries);

    assert_eq!(
      appearances(&buckets, "before switch"),
      vec![7]
    );
    assert_eq!(
      appearances(&buckets, "after switch"),
      vec![8]
    );
    assert_eq!(
      buckets[8].date,
      date(2026, 3, 30)
    );
  }

  #[test]
  fn tasks_outside_window_or_undated_are_dropped()
   {
    let entries = vec![
      task("inside", Some(date(2026, 3, 28))),
      task("after", Some(date(2026, 3, 29))),
      task("before", Some(date(2026, 2, 28))),
      task("undated", None),
    ];
    let buckets =
      allocate(&window(), &entries);

    assert_eq!(
      appearances(&buckets, "inside"),
      vec![27]
    );
    for title in
      ["after", "before", "undated"]
    {
      assert!(
        appearances(&buckets, title)
          .is_empty()
      );
    }
  }

  #[test]
  fn keeps_input_order_and_skips_invalid() {
    let entries = vec![
      task("b", Some(date(2026, 3, 2))),
      event(
        "broken",
        "2026-03-02T10:00:00+01:00",
        "2026-03-02T09:00:00+01:00"
      ),
      event(
        "a",
        "2026-03-02T08:00:00+01:00",
        "2026-03-02T09:00:00+01:00"
      ),
    ];
    let buckets =
      allocate(&window(), &entries);
    let titles = buckets[1]
      .entries
      .iter()
      .map(|e| e.title())
      .collect::<Vec<_>>();

    assert_eq!(titles, vec!["b", "a"]);
  }
}
