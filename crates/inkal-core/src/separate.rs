//! Splits one rasterized screenshot into
//! the two ink channels of the panel.

use image::imageops;
use image::{
  GrayImage,
  Luma,
  Rgb,
  RgbImage
};
use tracing::debug;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Counter-clockwise quarter turns
/// applied after separation.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Rotation {
  None,
  Ccw90,
  Ccw180,
  Ccw270
}

impl Rotation {
  /// Normalizes any multiple of 90 into
  /// a quarter turn; other angles are
  /// rejected.
  pub fn from_degrees(
    degrees: i32
  ) -> Option<Self> {
    match degrees.rem_euclid(360) {
      | 0 => Some(Self::None),
      | 90 => Some(Self::Ccw90),
      | 180 => Some(Self::Ccw180),
      | 270 => Some(Self::Ccw270),
      | _ => None
    }
  }

  pub fn degrees(self) -> i32 {
    match self {
      | Self::None => 0,
      | Self::Ccw90 => 90,
      | Self::Ccw180 => 180,
      | Self::Ccw270 => 270
    }
  }

  /// Returns a new image; quarter turns
  /// swap width and height so no pixel is
  /// clipped.
  pub fn apply(
    self,
    image: &RgbImage
  ) -> RgbImage {
    match self {
      | Self::None => image.clone(),
      | Self::Ccw90 => {
        imageops::rotate270(image)
      }
      | Self::Ccw180 => {
        imageops::rotate180(image)
      }
      | Self::Ccw270 => {
        imageops::rotate90(image)
      }
    }
  }
}

/// The two ink channels. `primary` holds
/// black/grey ink, `accent` the red ink;
/// no pixel is inked in both.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImagePair {
  pub primary: RgbImage,
  pub accent:  RgbImage
}

impl RenderedImagePair {
  pub fn dimensions(&self) -> (u32, u32) {
    self.primary.dimensions()
  }

  pub fn rotate(
    &self,
    rotation: Rotation
  ) -> Self {
    Self {
      primary: rotation
        .apply(&self.primary),
      accent:  rotation.apply(&self.accent)
    }
  }

  /// Thresholds both channels to pure
  /// ink (0) or paper (255).
  pub fn to_bitmaps(
    &self
  ) -> (GrayImage, GrayImage) {
    (
      to_bitmap(&self.primary),
      to_bitmap(&self.accent)
    )
  }
}

pub fn is_accent(pixel: &Rgb<u8>) -> bool {
  let [r, g, b] = pixel.0;
  r > g && r > b
}

/// Builds both channels from a single
/// pass over the source. Accent pixels
/// are blanked in `primary` and kept in
/// `accent`; every other pixel is kept in
/// `primary` and blanked in `accent`.
#[tracing::instrument(skip(source), fields(width = source.width(), height = source.height()))]
pub fn separate(
  source: &RgbImage,
  rotation: Rotation
) -> RenderedImagePair {
  let (width, height) =
    source.dimensions();
  let mut primary =
    RgbImage::new(width, height);
  let mut accent =
    RgbImage::new(width, height);
  let mut accent_pixels = 0_u64;

  for (x, y, pixel) in
    source.enumerate_pixels()
  {
    if is_accent(pixel) {
      primary.put_pixel(x, y, WHITE);
      accent.put_pixel(x, y, *pixel);
      accent_pixels += 1;
    } else {
      primary.put_pixel(x, y, *pixel);
      accent.put_pixel(x, y, WHITE);
    }
  }

  debug!(
    accent_pixels,
    rotation = rotation.degrees(),
    "separated ink channels"
  );

  RenderedImagePair { primary, accent }
    .rotate(rotation)
}

fn to_bitmap(image: &RgbImage) -> GrayImage {
  GrayImage::from_fn(
    image.width(),
    image.height(),
    |x, y| {
      if *image.get_pixel(x, y) == WHITE {
        Luma([255])
      } else {
        Luma([0])
      }
    }
  )
}
