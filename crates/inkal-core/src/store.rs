use std::fs;
use std::io::{
  BufRead,
  BufReader,
  Read,
  Write
};
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use image::{
  GrayImage,
  ImageOutputFormat
};
use tempfile::NamedTempFile;
use tracing::{
  debug,
  info,
  warn
};

use crate::entry::CalendarEntry;
use crate::error::EntryError;
use crate::separate::RenderedImagePair;

pub const PRIMARY_FILE: &str = "black.png";
pub const ACCENT_FILE: &str = "red.png";
pub const PAGE_FILE: &str = "calendar.html";

/// Reads JSON-lines entry records from
/// `path`, or stdin when `path` is `-`.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_entries(
  path: &Path
) -> anyhow::Result<Vec<CalendarEntry>> {
  if path == Path::new("-") {
    let stdin = std::io::stdin();
    return parse_entries(stdin.lock())
      .context("failed reading stdin");
  }

  let file = fs::File::open(path)
    .with_context(|| {
      format!(
        "failed to open {}",
        path.display()
      )
    })?;
  parse_entries(file).with_context(|| {
    format!(
      "failed reading {}",
      path.display()
    )
  })
}

/// Parses one record per line. Malformed
/// records, including lines that are not
/// UTF-8, are logged and dropped; the
/// rest of the input is still used. Read
/// errors abort.
pub fn parse_entries<R: Read>(
  reader: R
) -> anyhow::Result<Vec<CalendarEntry>> {
  let reader = BufReader::new(reader);
  let mut out = Vec::new();
  let mut skipped = 0_usize;

  for (idx, raw) in
    reader.split(b'\n').enumerate()
  {
    let raw = raw?;
    match parse_record(idx + 1, &raw) {
      | Ok(Some(entry)) => out.push(entry),
      | Ok(None) => {}
      | Err(err) => {
        warn!(error = %err, "skipping entry record");
        skipped += 1;
      }
    }
  }

  debug!(
    count = out.len(),
    skipped,
    "loaded entries"
  );
  Ok(out)
}

/// `None` for blank lines.
fn parse_record(
  line: usize,
  raw: &[u8]
) -> Result<Option<CalendarEntry>, EntryError>
{
  let text = std::str::from_utf8(raw)
    .map_err(|err| {
      EntryError::InvalidRecord {
        line,
        reason: err.to_string()
      }
    })?;
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }

  let entry: CalendarEntry =
    serde_json::from_str(trimmed).map_err(
      |err| {
        EntryError::InvalidRecord {
          line,
          reason: err.to_string()
        }
      }
    )?;
  entry.validate()?;
  Ok(Some(entry))
}

/// Writes both channels into `dir` as
/// pure black/white luma PNGs, replacing
/// any previous pair atomically per file.
#[tracing::instrument(skip(pair, dir), fields(dir = %dir.display()))]
pub fn save_image_pair(
  pair: &RenderedImagePair,
  dir: &Path
) -> anyhow::Result<(PathBuf, PathBuf)> {
  fs::create_dir_all(dir).with_context(
    || {
      format!(
        "failed to create {}",
        dir.display()
      )
    }
  )?;

  let (black, red) = pair.to_bitmaps();
  let primary = dir.join(PRIMARY_FILE);
  let accent = dir.join(ACCENT_FILE);
  save_png_atomic(&primary, &black)?;
  save_png_atomic(&accent, &red)?;

  info!(
    primary = %primary.display(),
    accent = %accent.display(),
    "saved ink channels"
  );
  Ok((primary, accent))
}

pub fn save_page(
  html: &str,
  dir: &Path
) -> anyhow::Result<PathBuf> {
  fs::create_dir_all(dir)?;
  let path = dir.join(PAGE_FILE);
  let mut temp = NamedTempFile::new_in(dir)?;
  temp.write_all(html.as_bytes())?;
  temp.flush()?;
  temp.persist(&path).map_err(|err| {
    anyhow!(
      "failed to persist {}: {}",
      path.display(),
      err
    )
  })?;
  Ok(path)
}

fn save_png_atomic(
  path: &Path,
  image: &GrayImage
) -> anyhow::Result<()> {
  debug!(file = %path.display(), "saving png atomically");
  let dir = path
    .parent()
    .unwrap_or_else(|| Path::new("."));
  let mut temp = NamedTempFile::new_in(dir)?;
  image
    .write_to(
      temp.as_file_mut(),
      ImageOutputFormat::Png
    )
    .with_context(|| {
      format!(
        "failed to encode {}",
        path.display()
      )
    })?;
  temp.flush()?;
  temp.persist(path).map_err(|err| {
    anyhow!(
      "failed to persist {}: {}",
      path.display(),
      err
    )
  })?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::io;

  use image::{
    Rgb,
    RgbImage
  };

  use super::*;

  fn titles(
    entries: &[CalendarEntry]
  ) -> Vec<&str> {
    entries
      .iter()
      .map(CalendarEntry::title)
      .collect()
  }

  #[test]
  fn skips_malformed_records() {
    let input = r#"{"kind":"event","title":"ok","start":"2026-03-02T09:00:00+01:00","end":"2026-03-02T10:00:00+01:00"}

{"kind":"event","title":"backwards","start":"2026-03-02T11:00:00+01:00","end":"2026-03-02T10:00:00+01:00"}
{"kind":"task","title":"bad date","due":"2026-13-40"}
not json at all
{"kind":"task","title":"undated"}
"#;
    let entries =
      parse_entries(input.as_bytes())
        .expect("parse entries");

    assert_eq!(
      titles(&entries),
      vec!["ok", "undated"]
    );
  }

  #[test]
  fn non_utf8_line_only_drops_itself() {
    let mut input = Vec::new();
    input.extend_from_slice(
      br#"{"kind":"task","title":"first"}"#
    );
    input.push(b'\n');
    input.extend_from_slice(
      br#"{"kind":"task","title":"se"#
    );
    input.push(0xFF);
    input.extend_from_slice(br#"cond"}"#);
    input.push(b'\n');
    input.extend_from_slice(
      br#"{"kind":"task","title":"third"}"#
    );

    let entries =
      parse_entries(input.as_slice())
        .expect("parse entries");

    assert_eq!(
      titles(&entries),
      vec!["first", "third"]
    );
  }

  struct FailingReader;

  impl Read for FailingReader {
    fn read(
      &mut self,
      _: &mut [u8]
    ) -> io::Result<usize> {
      Err(io::Error::other("disk gone"))
    }
  }

  #[test]
  fn read_errors_are_fatal() {
    assert!(
      parse_entries(FailingReader).is_err()
    );
  }

  #[test]
  fn saves_both_channels_as_pure_ink() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let pair = RenderedImagePair {
      primary: RgbImage::from_fn(
        4,
        1,
        |x, _| {
          if x == 0 {
            Rgb([128, 128, 128])
          } else {
            Rgb([255, 255, 255])
          }
        }
      ),
      accent:  RgbImage::from_pixel(
        4,
        1,
        Rgb([200, 40, 40])
      )
    };

    let (primary, accent) =
      save_image_pair(&pair, dir.path())
        .expect("save pair");
    let black = image::open(&primary)
      .expect("open primary")
      .to_luma8();
    let red = image::open(&accent)
      .expect("open accent")
      .to_luma8();

    assert_eq!(black.dimensions(), (4, 1));
    assert_eq!(black.get_pixel(0, 0).0, [0]);
    assert_eq!(black.get_pixel(1, 0).0, [255]);
    assert!(red.pixels().all(|p| p.0 == [0]));
  }

  #[test]
  fn missing_entries_file_is_fatal() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    assert!(
      load_entries(
        &dir.path().join("absent.jsonl")
      )
      .is_err()
    );
  }
}
