const LOW_LEVEL: f32 = 20.0;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum BatteryDisplayMode {
  Hidden,
  Always,
  WhenLow
}

impl BatteryDisplayMode {
  /// Accepts the names and the legacy
  /// 0/1/2 numbering.
  pub fn parse(raw: &str) -> Option<Self> {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "hidden" | "hide" | "0" => {
        Some(Self::Hidden)
      }
      | "always" | "1" => Some(Self::Always),
      | "when_low" | "whenlow" | "low"
      | "2" => Some(Self::WhenLow),
      | _ => None
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum BatteryIndicator {
  Hidden,
  Full,
  High,
  Mid,
  Low,
  Empty
}

impl BatteryIndicator {
  /// Icon class used by the page
  /// template.
  pub fn css_class(self) -> &'static str {
    match self {
      | Self::Hidden => "batteryHide",
      | Self::Full => "battery80",
      | Self::High => "battery60",
      | Self::Mid => "battery40",
      | Self::Low => "battery20",
      | Self::Empty => "battery0"
    }
  }
}

#[must_use]
pub fn annotate(
  mode: BatteryDisplayMode,
  level: f32
) -> BatteryIndicator {
  match mode {
    | BatteryDisplayMode::Hidden => {
      BatteryIndicator::Hidden
    }
    | BatteryDisplayMode::Always => {
      if level >= 80.0 {
        BatteryIndicator::Full
      } else if level >= 60.0 {
        BatteryIndicator::High
      } else if level >= 40.0 {
        BatteryIndicator::Mid
      } else if level >= LOW_LEVEL {
        BatteryIndicator::Low
      } else {
        BatteryIndicator::Empty
      }
    }
    | BatteryDisplayMode::WhenLow => {
      if level < LOW_LEVEL {
        BatteryIndicator::Empty
      } else {
        BatteryIndicator::Hidden
      }
    }
  }
}
