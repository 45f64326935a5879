use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// A single calendar record that cannot
/// be placed on the grid. Recovered
/// locally: the record is dropped and the
/// render continues.
#[derive(Debug, Error)]
pub enum EntryError {
  #[error(
    "event {title:?} ends before it \
     starts"
  )]
  EndBeforeStart { title: String },

  #[error(
    "invalid entry record on line \
     {line}: {reason}"
  )]
  InvalidRecord {
    line:   usize,
    reason: String
  }
}

/// Failure of the external rasterizer.
/// Always fatal to the current render.
#[derive(Debug, Error)]
pub enum RasterError {
  #[error(
    "failed to launch rasterizer {}",
    binary.display()
  )]
  Spawn {
    binary: PathBuf,
    #[source]
    source: std::io::Error
  },

  #[error(
    "rasterizer timed out after {after:?}"
  )]
  Timeout { after: Duration },

  #[error(
    "rasterizer exited with {status}: \
     {stderr}"
  )]
  Failed {
    status: ExitStatus,
    stderr: String
  },

  #[error("rasterizer i/o failed")]
  Io(#[from] std::io::Error),

  #[error(
    "failed to decode rasterized image"
  )]
  Decode(#[from] image::ImageError),

  #[error(
    "rasterized image is {}x{}, expected \
     {}x{}",
    actual.0, actual.1, expected.0, expected.1
  )]
  Dimensions {
    expected: (u32, u32),
    actual:   (u32, u32)
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error(
    "failed to read config {}",
    path.display()
  )]
  Read {
    path:   PathBuf,
    #[source]
    source: std::io::Error
  },

  #[error(
    "failed to parse config {}",
    path.display()
  )]
  Parse {
    path:   PathBuf,
    #[source]
    source: toml::de::Error
  },

  #[error("invalid value for {key}: {reason}")]
  Invalid {
    key:    String,
    reason: String
  },

  #[error("unknown config key {key}")]
  UnknownKey { key: String }
}
