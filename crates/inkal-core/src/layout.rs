//! Per-day layout decisions.
//!
//! A [`CellRenderer`] turns one day bucket
//! into a [`CellLayout`]: which entries
//! are shown, in which order, with which
//! visual classes. The result carries no
//! markup; [`build_tree`] arranges the
//! cells into a [`RenderNode`] tree that a
//! target-specific serializer consumes.

use chrono::{
  Datelike,
  NaiveDate
};

use crate::datetime::{
  add_days,
  format_time_label
};
use crate::entry::CalendarEntry;
use crate::grid::DayBucket;

/// Days from today at which a cell is
/// styled as distant future.
pub const FUTURE_HORIZON_DAYS: i64 = 14;

pub const STARTS_MARKER: &str = "►";
pub const ENDS_MARKER: &str = "◄";
pub const DONE_GLYPH: &str = "☑";
pub const PENDING_GLYPH: &str = "☐";

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum DayPhase {
  Past,
  Today,
  Upcoming,
  Future
}

impl DayPhase {
  pub fn classify(
    date: NaiveDate,
    today: NaiveDate
  ) -> Self {
    if date == today {
      Self::Today
    } else if date < today {
      Self::Past
    } else if date
      >= add_days(
        today,
        FUTURE_HORIZON_DAYS
      )
    {
      Self::Future
    } else {
      Self::Upcoming
    }
  }
}

/// Styling of the day-of-month number.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum DateLabel {
  Today,
  OtherMonth,
  Plain
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum VisualClass {
  Event,
  Task,
  Completed,
  Updated,
  Muted,
  Overflow
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum SpanMarker {
  Starts,
  Ends
}

impl SpanMarker {
  pub fn glyph(self) -> &'static str {
    match self {
      | Self::Starts => STARTS_MARKER,
      | Self::Ends => ENDS_MARKER
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineContent {
  Event {
    time:   Option<String>,
    marker: Option<SpanMarker>,
    title:  String
  },
  Task {
    done:  bool,
    title: String
  },
  Overflow { hidden: usize }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLine {
  pub content: LineContent,
  pub classes: Vec<VisualClass>
}

impl CellLine {
  pub fn has_class(
    &self,
    class: VisualClass
  ) -> bool {
    self.classes.contains(&class)
  }

  /// Plain display text of the line,
  /// glyphs and time label included.
  pub fn text(&self) -> String {
    match &self.content {
      | LineContent::Event {
        time,
        marker,
        title
      } => {
        let mut out = String::new();
        if let Some(time) = time {
          out.push_str(time);
          out.push(' ');
        }
        if let Some(marker) = marker {
          out.push_str(marker.glyph());
        }
        out.push_str(title);
        out
      }
      | LineContent::Task { done, title } => {
        let glyph = if *done {
          DONE_GLYPH
        } else {
          PENDING_GLYPH
        };
        format!("{glyph} {title}")
      }
      | LineContent::Overflow { hidden } => {
        format!("{hidden} more")
      }
    }
  }
}

#[derive(Debug, Clone)]
pub struct CellLayout {
  pub date:  NaiveDate,
  pub phase: DayPhase,
  pub label: DateLabel,
  pub lines: Vec<CellLine>
}

impl CellLayout {
  pub fn day_number(&self) -> u32 {
    self.date.day()
  }

  pub fn overflow(&self) -> Option<usize> {
    self.lines.iter().find_map(|line| {
      match line.content {
        | LineContent::Overflow { hidden } => {
          Some(hidden)
        }
        | _ => None
      }
    })
  }
}

#[derive(Debug, Clone, Copy)]
pub struct CellRenderer {
  pub max_events_per_day: usize,
  pub is_24_hour:         bool
}

impl CellRenderer {
  pub fn new(
    max_events_per_day: usize,
    is_24_hour: bool
  ) -> Self {
    Self {
      max_events_per_day,
      is_24_hour
    }
  }

  pub fn render_cell(
    &self,
    bucket: &DayBucket<'_>,
    today: NaiveDate
  ) -> CellLayout {
    let date = bucket.date;
    let other_month =
      (date.year(), date.month())
        != (today.year(), today.month());

    let label = if date == today {
      DateLabel::Today
    } else if other_month {
      DateLabel::OtherMonth
    } else {
      DateLabel::Plain
    };

    let mut lines = bucket
      .entries
      .iter()
      .take(self.max_events_per_day)
      .map(|entry| {
        self.render_entry(
          entry,
          date,
          other_month
        )
      })
      .collect::<Vec<_>>();

    if bucket.len() > self.max_events_per_day
    {
      lines.push(CellLine {
        content: LineContent::Overflow {
          hidden: bucket.len()
            - self.max_events_per_day
        },
        classes: vec![
          VisualClass::Overflow,
          VisualClass::Muted,
        ]
      });
    }

    CellLayout {
      date,
      phase: DayPhase::classify(date, today),
      label,
      lines
    }
  }

  #[tracing::instrument(skip_all, fields(cells = buckets.len()))]
  pub fn render_grid(
    &self,
    buckets: &[DayBucket<'_>],
    today: NaiveDate
  ) -> Vec<CellLayout> {
    buckets
      .iter()
      .map(|bucket| {
        self.render_cell(bucket, today)
      })
      .collect()
  }

  fn render_entry(
    &self,
    entry: &CalendarEntry,
    date: NaiveDate,
    other_month: bool
  ) -> CellLine {
    let mut classes = vec![];
    let content = match entry {
      | CalendarEntry::Event(event) => {
        classes.push(VisualClass::Event);
        if event.is_multiday() {
          let marker =
            if event.start_date() == date {
              SpanMarker::Starts
            } else {
              SpanMarker::Ends
            };
          LineContent::Event {
            time:   None,
            marker: Some(marker),
            title:  event.title.clone()
          }
        } else if event.all_day {
          LineContent::Event {
            time:   None,
            marker: None,
            title:  event.title.clone()
          }
        } else {
          LineContent::Event {
            time:   Some(format_time_label(
              &event.start,
              self.is_24_hour
            )),
            marker: None,
            title:  event.title.clone()
          }
        }
      }
      | CalendarEntry::Task(task) => {
        classes.push(VisualClass::Task);
        if task.is_completed {
          classes
            .push(VisualClass::Completed);
        }
        LineContent::Task {
          done:  task.is_completed,
          title: task.title.clone()
        }
      }
    };

    if entry.is_updated() {
      classes.push(VisualClass::Updated);
    } else if other_month {
      classes.push(VisualClass::Muted);
    }

    CellLine { content, classes }
  }
}

/// Inline leaf roles.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum LeafStyle {
  Weekday,
  Date(DateLabel),
  Time
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerKind {
  Grid,
  WeekdayRow,
  Day(DayPhase),
  Line(Vec<VisualClass>)
}

/// Markup-free layout tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode {
  Container {
    kind:     ContainerKind,
    children: Vec<RenderNode>
  },
  Text(String),
  Styled {
    style: LeafStyle,
    text:  String
  }
}

impl RenderNode {
  pub fn children(&self) -> &[RenderNode] {
    match self {
      | Self::Container { children, .. } => {
        children
      }
      | _ => &[]
    }
  }
}

pub fn build_tree(
  weekday_labels: &[&str],
  cells: &[CellLayout]
) -> RenderNode {
  let header = RenderNode::Container {
    kind:     ContainerKind::WeekdayRow,
    children: weekday_labels
      .iter()
      .map(|label| {
        RenderNode::Styled {
          style: LeafStyle::Weekday,
          text:  (*label).to_string()
        }
      })
      .collect()
  };

  let mut children = vec![header];
  children.extend(cells.iter().map(day_node));

  RenderNode::Container {
    kind: ContainerKind::Grid,
    children
  }
}

fn day_node(
  cell: &CellLayout
) -> RenderNode {
  let mut children =
    vec![RenderNode::Styled {
      style: LeafStyle::Date(cell.label),
      text:  cell.day_number().to_string()
    }];

  for line in &cell.lines {
    let mut parts = vec![];
    match &line.content {
      | LineContent::Event {
        time: Some(time),
        title,
        ..
      } => {
        parts.push(RenderNode::Styled {
          style: LeafStyle::Time,
          text:  time.clone()
        });
        parts.push(RenderNode::Text(
          title.clone()
        ));
      }
      | _ => {
        parts.push(RenderNode::Text(
          line.text()
        ));
      }
    }

    children.push(RenderNode::Container {
      kind:     ContainerKind::Line(
        line.classes.clone()
      ),
      children: parts
    });
  }

  RenderNode::Container {
    kind: ContainerKind::Day(cell.phase),
    children
  }
}
