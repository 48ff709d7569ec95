//! Positional parsing of lyric text files.
//!
//! A lyric file starts with a fixed-size header (title, artist and, in the
//! newer layout, a date) followed by a blank separator line and the body.
//! Which layout a source uses is described by a [`HeaderSchema`].

use std::path::Path;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use tracing::debug;

use crate::catalog::LyricRecord;
use crate::constants::constants;

/// Line break used when joining the preview lines for display.
pub const PREVIEW_BREAK: &str = "\n";

/// Header layout of a lyric file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSchema {
  header_line_count: usize,
  has_date_field: bool,
}

impl HeaderSchema {
  /// `title`, `artist`, blank, body…
  pub const V3: HeaderSchema = HeaderSchema { header_line_count: 3, has_date_field: false };
  /// `title`, `artist`, `date`, blank, body…
  pub const V4: HeaderSchema = HeaderSchema { header_line_count: 4, has_date_field: true };

  /// Only the two published layouts are accepted.
  pub fn new(header_line_count: usize, has_date_field: bool) -> Result<Self> {
    match (header_line_count, has_date_field) {
      (3, false) => Ok(Self::V3),
      (4, true) => Ok(Self::V4),
      _ => bail!("unsupported header layout: {} lines, date field: {}", header_line_count, has_date_field),
    }
  }

  pub fn header_line_count(self) -> usize {
    self.header_line_count
  }

  pub fn has_date_field(self) -> bool {
    self.has_date_field
  }

  pub fn label(self) -> &'static str {
    if self.has_date_field { "v4" } else { "v3" }
  }
}

impl FromStr for HeaderSchema {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "v3" | "3" => Self::new(3, false),
      "v4" | "4" => Self::new(4, true),
      other => bail!("unknown header schema '{}': expected v3 or v4", other),
    }
  }
}

/// Display label derived from a filename: the last path component without its extension.
pub fn filename_title(filename: &str) -> String {
  Path::new(filename)
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .filter(|s| !s.is_empty())
    .unwrap_or_else(|| filename.to_string())
}

/// Accept `YYYY-MM-DD` only; anything else sorts as the sentinel date.
fn normalize_date(raw: &str) -> String {
  let raw = raw.trim();
  match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    Ok(date) => date.format("%Y-%m-%d").to_string(),
    Err(_) => {
      if !raw.is_empty() {
        debug!(date = %raw, "parser: unparseable date, using sentinel");
      }
      constants().sentinel_date.clone()
    }
  }
}

/// Build a [`LyricRecord`] from raw file text. Never fails: missing lines
/// become empty fields.
pub fn parse(raw: &str, filename: &str, schema: HeaderSchema) -> LyricRecord {
  let lines: Vec<&str> = raw.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect();
  let line = |idx: usize| lines.get(idx).copied().unwrap_or("");

  let title = match line(0).trim() {
    "" => filename_title(filename),
    t => t.to_string(),
  };
  let artist = line(1).trim().to_string();
  let date = if schema.has_date_field { normalize_date(line(2)) } else { constants().sentinel_date.clone() };

  let body_lines = lines.get(schema.header_line_count..).unwrap_or(&[]);
  let body = body_lines.join("\n");
  let preview = body_lines.iter().take(constants().preview_lines).copied().collect::<Vec<_>>().join(PREVIEW_BREAK);

  LyricRecord::new(filename.to_string(), title, artist, date, body, preview)
}
