use std::fmt::Write;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::battery::BatteryIndicator;
use crate::error::ConfigError;
use crate::layout::{
  ContainerKind,
  DateLabel,
  DayPhase,
  LeafStyle,
  RenderNode,
  VisualClass
};

const BUILTIN_TEMPLATE: &str =
  include_str!("../templates/calendar.html");

/// Values substituted into the page
/// template.
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
  pub month:     &'a str,
  pub refreshed: String,
  pub battery:   BatteryIndicator,
  pub width:     u32,
  pub height:    u32
}

/// HTML page with `{{month}}`,
/// `{{refreshed}}`, `{{battery}}`,
/// `{{width}}`, `{{height}}` and
/// `{{grid}}` placeholders.
#[derive(Debug, Clone)]
pub struct PageTemplate {
  text: String
}

impl Default for PageTemplate {
  fn default() -> Self {
    Self {
      text: BUILTIN_TEMPLATE.to_string()
    }
  }
}

impl PageTemplate {
  #[tracing::instrument]
  pub fn load(
    path: &Path
  ) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path)
      .map_err(|source| {
        ConfigError::Read {
          path: path.to_path_buf(),
          source
        }
      })?;
    if !text.contains("{{grid}}") {
      return Err(ConfigError::Invalid {
        key:    "template".to_string(),
        reason: format!(
          "{} has no {{{{grid}}}} \
           placeholder",
          path.display()
        )
      });
    }
    info!(template = %path.display(), "loaded page template");
    Ok(Self { text })
  }

  pub fn fill(
    &self,
    ctx: &PageContext<'_>,
    grid: &RenderNode
  ) -> String {
    self
      .text
      .replace(
        "{{month}}",
        &escape(ctx.month)
      )
      .replace(
        "{{refreshed}}",
        &escape(&ctx.refreshed)
      )
      .replace(
        "{{battery}}",
        ctx.battery.css_class()
      )
      .replace(
        "{{width}}",
        &ctx.width.to_string()
      )
      .replace(
        "{{height}}",
        &ctx.height.to_string()
      )
      .replace("{{grid}}", &to_html(grid))
  }
}

/// Serializes a layout tree to HTML
/// markup.
pub fn to_html(node: &RenderNode) -> String {
  let mut out = String::new();
  write_node(&mut out, node);
  out
}

fn write_node(
  out: &mut String,
  node: &RenderNode
) {
  match node {
    | RenderNode::Text(text) => {
      out.push_str(&escape(text));
    }
    | RenderNode::Styled { style, text } => {
      let _ = write!(
        out,
        "<div class=\"{}\">{}</div>",
        leaf_class(*style),
        escape(text)
      );
    }
    | RenderNode::Container {
      kind,
      children
    } => {
      let _ = write!(
        out,
        "<div class=\"{}\">",
        container_class(kind)
      );
      for child in children {
        write_node(out, child);
      }
      out.push_str("</div>");
    }
  }
}

fn leaf_class(
  style: LeafStyle
) -> &'static str {
  match style {
    | LeafStyle::Weekday => "weekday",
    | LeafStyle::Time => "time",
    | LeafStyle::Date(DateLabel::Today) => {
      "datecircle"
    }
    | LeafStyle::Date(
      DateLabel::OtherMonth
    ) => "date text-muted",
    | LeafStyle::Date(DateLabel::Plain) => {
      "date"
    }
  }
}

fn container_class(
  kind: &ContainerKind
) -> String {
  match kind {
    | ContainerKind::Grid => {
      "calendar-grid".to_string()
    }
    | ContainerKind::WeekdayRow => {
      "day-names".to_string()
    }
    | ContainerKind::Day(phase) => {
      match phase {
        | DayPhase::Past => "day past",
        | DayPhase::Future => "day future",
        | DayPhase::Today
        | DayPhase::Upcoming => "day"
      }
      .to_string()
    }
    | ContainerKind::Line(classes) => {
      classes
        .iter()
        .map(|class| {
          match class {
            | VisualClass::Event => "event",
            | VisualClass::Task => "task",
            | VisualClass::Completed => {
              "task-completed"
            }
            | VisualClass::Updated => {
              "text-danger"
            }
            | VisualClass::Muted => {
              "text-muted"
            }
            | VisualClass::Overflow => {
              "event more"
            }
          }
        })
        .collect::<Vec<_>>()
        .join(" ")
    }
  }
}

fn escape(text: &str) -> String {
  let mut out =
    String::with_capacity(text.len());
  for ch in text.chars() {
    match ch {
      | '&' => out.push_str("&amp;"),
      | '<' => out.push_str("&lt;"),
      | '>' => out.push_str("&gt;"),
      | '"' => out.push_str("&quot;"),
      | '\'' => out.push_str("&#39;"),
      | _ => out.push(ch)
    }
  }
  out
}
