use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use chrono::Weekday;
use chrono_tz::Tz;
use toml::{
  Table,
  Value
};
use tracing::{
  debug,
  info,
  warn
};

use crate::battery::BatteryDisplayMode;
use crate::datetime::{
  parse_timezone,
  parse_weekday
};
use crate::error::ConfigError;
use crate::separate::Rotation;

const CONFIG_ENV_VAR: &str = "INKAL_CONFIG";
const CONFIG_FILE: &str = "inkal.toml";

const KNOWN_KEYS: &[&str] = &[
  "max_events_per_day",
  "battery_display_mode",
  "rotate_angle",
  "is_24_hour",
  "week_start_day",
  "num_weeks",
  "image_width",
  "image_height",
  "timezone",
  "chromium_binary",
  "rasterize_timeout_secs",
  "template"
];

/// Validated, immutable settings for one
/// render.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
  pub max_events_per_day:   usize,
  pub battery_display_mode: BatteryDisplayMode,
  pub rotate_angle:         i32,
  pub is_24_hour:           bool,
  pub week_start_day:       Weekday,
  pub num_weeks:            usize,
  pub image_width:          u32,
  pub image_height:         u32,
  pub timezone:             Tz,
  pub chromium_binary:      PathBuf,
  pub rasterize_timeout:    Duration,
  pub template:             Option<PathBuf>
}

impl Default for DisplayConfig {
  fn default() -> Self {
    Self {
      max_events_per_day:   3,
      battery_display_mode:
        BatteryDisplayMode::Always,
      rotate_angle:         0,
      is_24_hour:           true,
      week_start_day:       Weekday::Mon,
      num_weeks:            4,
      image_width:          984,
      image_height:         1304,
      timezone:             chrono_tz::UTC,
      chromium_binary:      PathBuf::from(
        "chromium-browser"
      ),
      rasterize_timeout:    Duration::from_secs(
        30
      ),
      template:             None
    }
  }
}

impl DisplayConfig {
  pub fn rotation(&self) -> Rotation {
    Rotation::from_degrees(self.rotate_angle)
      .unwrap_or(Rotation::None)
  }

  pub fn num_days(&self) -> usize {
    self.num_weeks * 7
  }
}

/// Raw key/value settings as read from
/// the config file plus any overrides.
#[derive(Debug, Clone, Default)]
pub struct Config {
  table: Table
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> Result<Self, ConfigError> {
    let Some(path) =
      resolve_config_path(config_override)
    else {
      warn!(
        "no config file found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    let text = fs::read_to_string(&path)
      .map_err(|source| {
        ConfigError::Read {
          path: path.clone(),
          source
        }
      })?;
    Self::from_toml_str(&text, &path)
  }

  pub fn from_toml_str(
    text: &str,
    path: &Path
  ) -> Result<Self, ConfigError> {
    let table = toml::from_str::<Table>(text)
      .map_err(|source| {
        ConfigError::Parse {
          path: path.to_path_buf(),
          source
        }
      })?;
    Ok(Self { table })
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self
        .table
        .insert(key, parse_override_value(&v));
    }
  }

  /// Validates every key and builds the
  /// typed settings. Any bad value is
  /// fatal.
  #[tracing::instrument(skip(self))]
  pub fn display_config(
    &self
  ) -> Result<DisplayConfig, ConfigError> {
    if let Some(key) = self
      .table
      .keys()
      .find(|key| {
        !KNOWN_KEYS.contains(&key.as_str())
      })
    {
      return Err(ConfigError::UnknownKey {
        key: key.clone()
      });
    }

    let mut cfg = DisplayConfig::default();

    if let Some(n) =
      self.get_int("max_events_per_day")?
    {
      cfg.max_events_per_day =
        usize::try_from(n)
          .ok()
          .filter(|n| *n >= 1)
          .ok_or_else(|| {
            invalid(
              "max_events_per_day",
              "must be at least 1"
            )
          })?;
    }

    if let Some(raw) =
      self.get_text("battery_display_mode")
    {
      cfg.battery_display_mode =
        BatteryDisplayMode::parse(&raw)
          .ok_or_else(|| {
            invalid(
              "battery_display_mode",
              "expected hidden, always or \
               when_low"
            )
          })?;
    }

    if let Some(angle) =
      self.get_int("rotate_angle")?
    {
      let angle = i32::try_from(angle)
        .map_err(|_| {
          invalid(
            "rotate_angle",
            "out of range"
          )
        })?;
      let rotation =
        Rotation::from_degrees(angle)
          .ok_or_else(|| {
            invalid(
              "rotate_angle",
              "must be a multiple of 90"
            )
          })?;
      cfg.rotate_angle = rotation.degrees();
    }

    if let Some(flag) =
      self.get_bool("is_24_hour")?
    {
      cfg.is_24_hour = flag;
    }

    if let Some(raw) =
      self.get_text("week_start_day")
    {
      cfg.week_start_day =
        parse_weekday(&raw).ok_or_else(
          || {
            invalid(
              "week_start_day",
              "expected a weekday name"
            )
          }
        )?;
    }

    if let Some(weeks) =
      self.get_int("num_weeks")?
    {
      cfg.num_weeks = match weeks {
        | 4 => 4,
        | 5 => 5,
        | _ => {
          return Err(invalid(
            "num_weeks",
            "must be 4 or 5"
          ));
        }
      };
    }

    cfg.image_width = self
      .get_dimension("image_width")?
      .unwrap_or(cfg.image_width);
    cfg.image_height = self
      .get_dimension("image_height")?
      .unwrap_or(cfg.image_height);

    if let Some(raw) =
      self.get_text("timezone")
    {
      cfg.timezone = parse_timezone(&raw)
        .ok_or_else(|| {
          invalid(
            "timezone",
            "unknown IANA timezone"
          )
        })?;
    }

    if let Some(raw) =
      self.get_text("chromium_binary")
    {
      cfg.chromium_binary =
        expand_tilde(Path::new(&raw));
    }

    if let Some(secs) = self
      .get_int("rasterize_timeout_secs")?
    {
      let secs = u64::try_from(secs)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| {
          invalid(
            "rasterize_timeout_secs",
            "must be positive"
          )
        })?;
      cfg.rasterize_timeout =
        Duration::from_secs(secs);
    }

    cfg.template = self
      .get_text("template")
      .map(|raw| {
        expand_tilde(Path::new(&raw))
      });

    debug!(?cfg, "display config resolved");
    Ok(cfg)
  }

  fn get_text(
    &self,
    key: &str
  ) -> Option<String> {
    self.table.get(key).map(|value| {
      match value {
        | Value::String(s) => s.clone(),
        | other => other.to_string()
      }
    })
  }

  fn get_int(
    &self,
    key: &str
  ) -> Result<Option<i64>, ConfigError> {
    match self.table.get(key) {
      | None => Ok(None),
      | Some(Value::Integer(n)) => {
        Ok(Some(*n))
      }
      | Some(Value::String(s)) => {
        s.trim()
          .parse::<i64>()
          .map(Some)
          .map_err(|_| {
            invalid(key, "expected an integer")
          })
      }
      | Some(_) => {
        Err(invalid(key, "expected an integer"))
      }
    }
  }

  fn get_bool(
    &self,
    key: &str
  ) -> Result<Option<bool>, ConfigError> {
    match self.table.get(key) {
      | None => Ok(None),
      | Some(Value::Boolean(b)) => {
        Ok(Some(*b))
      }
      | Some(Value::String(s)) => {
        parse_bool(s).map(Some).ok_or_else(
          || invalid(key, "expected a boolean")
        )
      }
      | Some(_) => {
        Err(invalid(key, "expected a boolean"))
      }
    }
  }

  fn get_dimension(
    &self,
    key: &str
  ) -> Result<Option<u32>, ConfigError> {
    self
      .get_int(key)?
      .map(|n| {
        u32::try_from(n)
          .ok()
          .filter(|n| *n > 0)
          .ok_or_else(|| {
            invalid(key, "must be a positive pixel count")
          })
      })
      .transpose()
  }
}

fn invalid(
  key: &str,
  reason: &str
) -> ConfigError {
  ConfigError::Invalid {
    key:    key.to_string(),
    reason: reason.to_string()
  }
}

/// Reads an override as a TOML scalar,
/// falling back to a plain string.
fn parse_override_value(raw: &str) -> Value {
  toml::from_str::<Table>(&format!(
    "v = {raw}"
  ))
  .ok()
  .and_then(|mut table| table.remove("v"))
  .unwrap_or_else(|| {
    Value::String(raw.trim().to_string())
  })
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(expand_tilde(path));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if trimmed == "/dev/null" {
      return None;
    }
    if !trimmed.is_empty() {
      return Some(expand_tilde(
        Path::new(trimmed)
      ));
    }
  }

  let candidate = dirs::config_dir()?
    .join("inkal")
    .join(CONFIG_FILE);
  if candidate.exists() {
    return Some(candidate);
  }

  None
}

fn expand_tilde(path: &Path) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on" | "true" => {
      Some(true)
    }
    | "0" | "n" | "no" | "off" | "false" => {
      Some(false)
    }
    | _ => None
  }
}
