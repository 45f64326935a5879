use std::cmp::Ordering;
use std::time::Instant;

use chrono::{
  DateTime,
  FixedOffset,
  NaiveDate
};
use tracing::{
  Span,
  info,
  info_span
};

use crate::battery::{
  self,
  BatteryIndicator
};
use crate::config::DisplayConfig;
use crate::datetime::{
  month_name,
  start_of_week,
  weekday_labels
};
use crate::entry::CalendarEntry;
use crate::error::RasterError;
use crate::grid::{
  self,
  GridWindow
};
use crate::layout::{
  CellRenderer,
  build_tree
};
use crate::raster::Rasterizer;
use crate::separate::{
  self,
  RenderedImagePair
};
use crate::template::{
  PageContext,
  PageTemplate
};

/// Inputs of a single render call.
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
  pub entries:       &'a [CalendarEntry],
  pub today:         NaiveDate,
  pub refreshed:     DateTime<FixedOffset>,
  pub battery_level: Option<f32>
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
  pub html:   String,
  pub images: RenderedImagePair
}

pub struct RenderPipeline<R> {
  config:     DisplayConfig,
  template:   PageTemplate,
  rasterizer: R,
  span:       Span
}

impl<R: Rasterizer> RenderPipeline<R> {
  pub fn new(
    config: DisplayConfig,
    template: PageTemplate,
    rasterizer: R
  ) -> Self {
    Self {
      config,
      template,
      rasterizer,
      span: info_span!("render_pipeline")
    }
  }

  /// Replaces the span every render is
  /// recorded under.
  pub fn with_span(
    mut self,
    span: Span
  ) -> Self {
    self.span = span;
    self
  }

  pub fn window(
    &self,
    today: NaiveDate
  ) -> GridWindow {
    GridWindow::new(
      start_of_week(
        today,
        self.config.week_start_day
      ),
      self.config.num_weeks,
      today
    )
  }

  pub fn battery_indicator(
    &self,
    level: Option<f32>
  ) -> BatteryIndicator {
    level.map_or(
      BatteryIndicator::Hidden,
      |level| {
        battery::annotate(
          self.config.battery_display_mode,
          level
        )
      }
    )
  }

  /// Builds the page markup: grid
  /// allocation, cell layout, template.
  pub fn compose(
    &self,
    request: &RenderRequest<'_>
  ) -> String {
    let _guard = self.span.enter();
    let window = self.window(request.today);
    let ordered =
      chronological(request.entries);
    let buckets =
      grid::allocate(&window, &ordered);

    let renderer = CellRenderer::new(
      self.config.max_events_per_day,
      self.config.is_24_hour
    );
    let cells = renderer
      .render_grid(&buckets, window.today);
    let tree = build_tree(
      &weekday_labels(
        self.config.week_start_day
      ),
      &cells
    );

    self.template.fill(
      &PageContext {
        month:     month_name(request.today),
        refreshed: request
          .refreshed
          .format("%Y-%m-%d %H:%M")
          .to_string(),
        battery:   self.battery_indicator(
          request.battery_level
        ),
        width:     self.config.image_width,
        height:    self.config.image_height
      },
      &tree
    )
  }

  /// Runs the whole render. A rasterizer
  /// failure aborts the call and is
  /// returned as-is.
  pub fn render(
    &self,
    request: &RenderRequest<'_>
  ) -> Result<RenderOutput, RasterError> {
    let started = Instant::now();
    let html = self.compose(request);

    let _guard = self.span.enter();
    info!(
      bytes = html.len(),
      elapsed = ?started.elapsed(),
      "page composed"
    );

    let screenshot =
      self.rasterizer.rasterize(
        &html,
        self.config.image_width,
        self.config.image_height
      )?;
    let images = separate::separate(
      &screenshot,
      self.config.rotation()
    );

    info!(
      width = images.dimensions().0,
      height = images.dimensions().1,
      elapsed = ?started.elapsed(),
      "render complete"
    );
    Ok(RenderOutput { html, images })
  }
}

/// Events by start time, then tasks in
/// input order.
fn chronological(
  entries: &[CalendarEntry]
) -> Vec<CalendarEntry> {
  let mut ordered = entries.to_vec();
  ordered.sort_by(|a, b| {
    match (a, b) {
      | (
        CalendarEntry::Event(x),
        CalendarEntry::Event(y)
      ) => x.start.cmp(&y.start),
      | (
        CalendarEntry::Event(_),
        CalendarEntry::Task(_)
      ) => Ordering::Less,
      | (
        CalendarEntry::Task(_),
        CalendarEntry::Event(_)
      ) => Ordering::Greater,
      | (
        CalendarEntry::Task(_),
        CalendarEntry::Task(_)
      ) => Ordering::Equal
    }
  });
  ordered
}

#[cfg(test)]
mod tests {
  use chrono::DateTime;
  use image::{
    Rgb,
    RgbImage
  };

  use super::*;
  use crate::entry::{
    Event,
    Task
  };

  fn at(raw: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(raw)
      .expect("valid timestamp")
  }

  fn event(
    title: &str,
    start: &str,
    end: &str
  ) -> CalendarEntry {
    CalendarEntry::Event(Event {
      title:      title.to_string(),
      start:      at(start),
      end:        at(end),
      all_day:    false,
      is_updated: false
    })
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 4)
      .expect("valid date")
  }

  fn request(
    entries: &[CalendarEntry]
  ) -> RenderRequest<'_> {
    RenderRequest {
      entries,
      today: today(),
      refreshed: at(
        "2026-03-04T07:00:00+01:00"
      ),
      battery_level: Some(55.0)
    }
  }

  fn small_config() -> DisplayConfig {
    DisplayConfig {
      image_width: 6,
      image_height: 4,
      rotate_angle: 90,
      ..DisplayConfig::default()
    }
  }

  #[test]
  fn orders_events_before_tasks() {
    let entries = vec![
      CalendarEntry::Task(Task {
        title:        "t".to_string(),
        due:          Some(today()),
        is_updated:   false,
        is_completed: false
      }),
      event(
        "late",
        "2026-03-04T18:00:00+01:00",
        "2026-03-04T19:00:00+01:00"
      ),
      event(
        "early",
        "2026-03-04T08:00:00+01:00",
        "2026-03-04T09:00:00+01:00"
      ),
    ];
    let titles = chronological(&entries)
      .iter()
      .map(|e| e.title().to_string())
      .collect::<Vec<_>>();

    assert_eq!(titles, vec!["early", "late", "t"]);
  }

  #[test]
  fn composes_page_for_window() {
    let pipeline = RenderPipeline::new(
      DisplayConfig::default(),
      PageTemplate::default(),
      |_: &str,
       w: u32,
       h: u32|
       -> Result<RgbImage, RasterError> {
        Ok(RgbImage::new(w, h))
      }
    );
    let entries = vec![event(
      "Dentist",
      "2026-03-05T14:30:00+01:00",
      "2026-03-05T15:00:00+01:00"
    )];
    let html =
      pipeline.compose(&request(&entries));

    assert_eq!(
      pipeline.window(today()).start,
      NaiveDate::from_ymd_opt(2026, 3, 2)
        .expect("valid date")
    );
    assert!(html.contains("<h1>March</h1>"));
    assert!(html.contains("battery40"));
    assert!(html.contains(
      "<div class=\"time\">14:30</div>Dentist"
    ));
    let days = html
      .matches("class=\"day\"")
      .count()
      + html.matches("class=\"day ").count();
    assert_eq!(days, 28);
  }

  #[test]
  fn separates_and_rotates_screenshot() {
    let pipeline = RenderPipeline::new(
      small_config(),
      PageTemplate::default(),
      |_: &str,
       w: u32,
       h: u32|
       -> Result<RgbImage, RasterError> {
        Ok(RgbImage::from_fn(w, h, |x, _| {
          if x == 0 {
            Rgb([255, 0, 0])
          } else {
            Rgb([0, 0, 0])
          }
        }))
      }
    );
    let output = pipeline
      .render(&request(&[]))
      .expect("render");

    assert_eq!(output.images.dimensions(), (4, 6));
    // left column ends up as the bottom row
    assert_eq!(
      *output.images.accent.get_pixel(0, 5),
      Rgb([255, 0, 0])
    );
    assert_eq!(
      *output.images.primary.get_pixel(0, 5),
      separate::WHITE
    );
  }

  #[test]
  fn rasterizer_failure_is_surfaced() {
    let pipeline = RenderPipeline::new(
      small_config(),
      PageTemplate::default(),
      |_: &str,
       _: u32,
       _: u32|
       -> Result<RgbImage, RasterError> {
        Err(RasterError::Timeout {
          after: std::time::Duration::from_secs(
            30
          )
        })
      }
    );

    assert!(matches!(
      pipeline.render(&request(&[])),
      Err(RasterError::Timeout { .. })
    ));
  }

  #[test]
  fn missing_battery_level_hides_indicator() {
    let pipeline = RenderPipeline::new(
      DisplayConfig::default(),
      PageTemplate::default(),
      |_: &str,
       w: u32,
       h: u32|
       -> Result<RgbImage, RasterError> {
        Ok(RgbImage::new(w, h))
      }
    );

    assert_eq!(
      pipeline.battery_indicator(None),
      BatteryIndicator::Hidden
    );
  }
}
