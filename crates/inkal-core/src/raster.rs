use std::fs::{
  self,
  File
};
use std::path::PathBuf;
use std::process::{
  Command,
  Stdio
};
use std::thread;
use std::time::{
  Duration,
  Instant
};

use image::RgbImage;
use tempfile::TempDir;
use tracing::{
  debug,
  info,
  warn
};

use crate::error::RasterError;

const POLL_INTERVAL: Duration =
  Duration::from_millis(50);

/// Turns page markup into an RGB image of
/// exactly `width` x `height` pixels.
pub trait Rasterizer {
  fn rasterize(
    &self,
    html: &str,
    width: u32,
    height: u32
  ) -> Result<RgbImage, RasterError>;
}

impl<F> Rasterizer for F
where
  F: Fn(
    &str,
    u32,
    u32
  ) -> Result<RgbImage, RasterError>
{
  fn rasterize(
    &self,
    html: &str,
    width: u32,
    height: u32
  ) -> Result<RgbImage, RasterError> {
    self(html, width, height)
  }
}

/// Screenshots the page with a headless
/// Chromium process.
#[derive(Debug, Clone)]
pub struct ChromeRasterizer {
  pub binary:  PathBuf,
  pub timeout: Duration
}

impl ChromeRasterizer {
  pub fn new(
    binary: impl Into<PathBuf>,
    timeout: Duration
  ) -> Self {
    Self {
      binary: binary.into(),
      timeout
    }
  }
}

impl Rasterizer for ChromeRasterizer {
  #[tracing::instrument(skip(self, html), fields(binary = %self.binary.display()))]
  fn rasterize(
    &self,
    html: &str,
    width: u32,
    height: u32
  ) -> Result<RgbImage, RasterError> {
    let scratch = TempDir::new()?;
    let page = scratch.path().join("calendar.html");
    let shot = scratch.path().join("calendar.png");
    let log = scratch.path().join("stderr.log");
    fs::write(&page, html)?;

    let mut child = Command::new(&self.binary)
      .arg("--headless")
      .arg("--hide-scrollbars")
      .arg("--force-device-scale-factor=1")
      .arg(format!(
        "--window-size={width},{height}"
      ))
      .arg(format!(
        "--screenshot={}",
        shot.display()
      ))
      .arg(format!(
        "file://{}",
        page.display()
      ))
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::from(File::create(
        &log
      )?))
      .spawn()
      .map_err(|source| {
        RasterError::Spawn {
          binary: self.binary.clone(),
          source
        }
      })?;

    let started = Instant::now();
    let status = loop {
      if let Some(status) = child.try_wait()? {
        break status;
      }
      if started.elapsed() >= self.timeout {
        warn!(
          timeout = ?self.timeout,
          "rasterizer timed out; killing"
        );
        if let Err(err) = child.kill() {
          debug!(error = %err, "kill after timeout failed");
        }
        if let Err(err) = child.wait() {
          debug!(error = %err, "reaping killed rasterizer failed");
        }
        return Err(RasterError::Timeout {
          after: self.timeout
        });
      }
      thread::sleep(POLL_INTERVAL);
    };

    if !status.success() {
      let stderr =
        fs::read_to_string(&log)
          .unwrap_or_default();
      return Err(RasterError::Failed {
        status,
        stderr: stderr.trim().to_string()
      });
    }

    let image = image::open(&shot)?.to_rgb8();
    info!(
      elapsed = ?started.elapsed(),
      "screenshot captured"
    );
    check_dimensions(image, width, height)
  }
}

pub fn check_dimensions(
  image: RgbImage,
  width: u32,
  height: u32
) -> Result<RgbImage, RasterError> {
  if image.dimensions() != (width, height) {
    return Err(RasterError::Dimensions {
      expected: (width, height),
      actual:   image.dimensions()
    });
  }
  Ok(image)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn closures_act_as_rasterizers() {
    let raster = |_: &str,
                  w: u32,
                  h: u32|
     -> Result<RgbImage, RasterError> {
      Ok(RgbImage::new(w, h))
    };
    let image = raster
      .rasterize("<html></html>", 8, 4)
      .expect("rasterize");

    assert_eq!(image.dimensions(), (8, 4));
  }

  #[test]
  fn rejects_wrong_dimensions() {
    let err = check_dimensions(
      RgbImage::new(10, 10),
      10,
      12
    )
    .expect_err("size mismatch");

    assert!(matches!(
      err,
      RasterError::Dimensions {
        expected: (10, 12),
        actual: (10, 10)
      }
    ));
  }

  #[test]
  fn missing_binary_is_surfaced() {
    let raster = ChromeRasterizer::new(
      "/nonexistent/inkal-chromium",
      Duration::from_secs(1)
    );
    let err = raster
      .rasterize("<html></html>", 4, 4)
      .expect_err("binary is missing");

    assert!(matches!(
      err,
      RasterError::Spawn { .. }
    ));
  }
}
