use std::collections::HashSet;

use futures::future::join_all;
use tracing::{info, warn};

use crate::constants::constants;
use crate::fetcher::ContentFetcher;
use crate::parser::{self, HeaderSchema, filename_title};

/// One parsed lyric file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricRecord {
  filename: String,
  title: String,
  artist: String,
  date: String,
  body: String,
  preview: String,
}

impl LyricRecord {
  pub(crate) fn new(filename: String, title: String, artist: String, date: String, body: String, preview: String) -> Self {
    Self { filename, title, artist, date, body, preview }
  }

  /// Record standing in for a file whose fetch failed; the error text is its body.
  pub fn from_fetch_error(filename: &str, message: &str) -> Self {
    Self {
      filename: filename.to_string(),
      title: filename_title(filename),
      artist: String::new(),
      date: constants().sentinel_date.clone(),
      body: message.to_string(),
      preview: message.to_string(),
    }
  }

  pub fn filename(&self) -> &str {
    &self.filename
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn artist(&self) -> &str {
    &self.artist
  }

  /// `YYYY-MM-DD`, or the sentinel date when the file has none.
  pub fn date(&self) -> &str {
    &self.date
  }

  pub fn body(&self) -> &str {
    &self.body
  }

  pub fn preview(&self) -> &str {
    &self.preview
  }

  /// Whether the file carried a real date rather than the sentinel.
  pub fn has_date(&self) -> bool {
    self.date != constants().sentinel_date
  }
}

/// All lyric records for the session, in manifest order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
  records: Vec<LyricRecord>,
}

impl Catalog {
  pub fn new(records: Vec<LyricRecord>) -> Self {
    Self { records }
  }

  pub fn records(&self) -> &[LyricRecord] {
    &self.records
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn find(&self, filename: &str) -> Option<&LyricRecord> {
    self.records.iter().find(|r| r.filename == filename)
  }
}

/// Drop repeated manifest entries, keeping the first occurrence.
fn dedup_first_wins(filenames: &[String]) -> Vec<&str> {
  let mut seen = HashSet::new();
  filenames
    .iter()
    .filter(|name| {
      let fresh = seen.insert(name.as_str());
      if !fresh {
        warn!(filename = %name, "catalog: duplicate manifest entry ignored");
      }
      fresh
    })
    .map(String::as_str)
    .collect()
}

/// Fetch every file concurrently and parse the results in manifest order.
/// A failed file becomes a record whose body is the error text.
pub async fn build_catalog(fetcher: &ContentFetcher, filenames: &[String], schema: HeaderSchema) -> Catalog {
  let unique = dedup_first_wins(filenames);

  let records = join_all(unique.into_iter().map(|filename| async move {
    let locator = fetcher.lyric_locator(filename);
    match fetcher.try_fetch(&locator).await {
      Ok(raw) => parser::parse(&raw, filename, schema),
      Err(e) => {
        warn!(filename = %filename, err = %e, "catalog: lyric fetch failed");
        LyricRecord::from_fetch_error(filename, &e.to_string())
      }
    }
  }))
  .await;

  info!(count = records.len(), schema = schema.label(), "catalog: built");
  Catalog::new(records)
}

/// Fetch the manifest, then build the catalog from it.
pub async fn load_catalog(fetcher: &ContentFetcher, schema: HeaderSchema) -> Catalog {
  let filenames = fetcher.fetch_manifest().await;
  if filenames.is_empty() {
    info!("catalog: manifest empty, nothing to load");
  }
  build_catalog(fetcher, &filenames, schema).await
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::time::Duration;

  use super::*;
  use crate::fetcher::mock::MockTransport;
  use crate::fetcher::{FetchError, Source};

  const BASE: &str = "https://example.test/lyrics/";

  fn url(name: &str) -> String {
    format!("{}{}", BASE, name)
  }

  fn fetcher_with(transport: MockTransport) -> (ContentFetcher, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let fetcher = ContentFetcher::new(transport.clone(), Source::new(BASE), "manifest.json");
    (fetcher, transport)
  }

  fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[tokio::test(start_paused = true)]
  async fn output_keeps_manifest_order_despite_latency() {
    let (fetcher, _) = fetcher_with(
      MockTransport::new()
        .with(&url("a.txt"), "A\nx\n2020-01-01\n\na")
        .with(&url("b.txt"), "B\nx\n2021-01-01\n\nb")
        .with(&url("c.txt"), "C\nx\n2022-01-01\n\nc")
        .with_delay(&url("a.txt"), Duration::from_millis(300))
        .with_delay(&url("b.txt"), Duration::from_millis(10))
        .with_delay(&url("c.txt"), Duration::from_millis(150)),
    );
    let catalog = build_catalog(&fetcher, &names(&["a.txt", "b.txt", "c.txt"]), HeaderSchema::V4).await;
    let titles: Vec<&str> = catalog.records().iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["A", "B", "C"]);
  }

  #[tokio::test(start_paused = true)]
  async fn fetches_are_issued_without_waiting_for_each_other() {
    let (fetcher, _) = fetcher_with(
      MockTransport::new()
        .with(&url("a.txt"), "A")
        .with(&url("b.txt"), "B")
        .with_delay(&url("a.txt"), Duration::from_secs(10))
        .with_delay(&url("b.txt"), Duration::from_secs(10)),
    );
    let start = tokio::time::Instant::now();
    build_catalog(&fetcher, &names(&["a.txt", "b.txt"]), HeaderSchema::V4).await;
    assert!(start.elapsed() < Duration::from_secs(20));
  }

  #[tokio::test]
  async fn failed_file_keeps_error_as_body() {
    let (fetcher, _) = fetcher_with(
      MockTransport::new()
        .with(&url("ok.txt"), "Ok\nArtist\n2020-01-01\n\nfine")
        .with_error(&url("bad.txt"), FetchError::Transport("reset by peer".into())),
    );
    let catalog = build_catalog(&fetcher, &names(&["bad.txt", "ok.txt", "gone.txt"]), HeaderSchema::V4).await;
    assert_eq!(catalog.len(), 3);

    let bad = &catalog.records()[0];
    assert_eq!(bad.title(), "bad");
    assert_eq!(bad.body(), "Loading error: reset by peer");

    assert_eq!(catalog.records()[1].body(), "fine");

    let gone = &catalog.records()[2];
    assert!(gone.body().starts_with("Error loading content: 404"));
  }

  #[tokio::test]
  async fn duplicate_entries_keep_first_and_fetch_once() {
    let (fetcher, transport) = fetcher_with(
      MockTransport::new().with(&url("a.txt"), "A\n\n\n\nbody").with(&url("b.txt"), "B\n\n\n\nbody"),
    );
    let catalog = build_catalog(&fetcher, &names(&["a.txt", "b.txt", "a.txt"]), HeaderSchema::V4).await;
    let files: Vec<&str> = catalog.records().iter().map(|r| r.filename()).collect();
    assert_eq!(files, vec!["a.txt", "b.txt"]);
    assert_eq!(transport.call_count(), 2);
  }

  #[tokio::test]
  async fn load_catalog_reads_manifest_first() {
    let (fetcher, transport) = fetcher_with(
      MockTransport::new()
        .with(&url("manifest.json"), r#"{"files":["yume.txt"]}"#)
        .with(&url("yume.txt"), "夢\n歌手\n2023-05-01\n\n一行目\n二行目"),
    );
    let catalog = load_catalog(&fetcher, HeaderSchema::V4).await;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.records()[0].title(), "夢");
    assert_eq!(transport.calls()[0], url("manifest.json"));
  }

  #[tokio::test]
  async fn empty_manifest_gives_empty_catalog() {
    let (fetcher, _) = fetcher_with(MockTransport::new().with(&url("manifest.json"), "{}"));
    assert!(load_catalog(&fetcher, HeaderSchema::V4).await.is_empty());
  }

  #[test]
  fn find_by_filename() {
    let catalog = Catalog::new(vec![LyricRecord::from_fetch_error("a.txt", "x")]);
    assert!(catalog.find("a.txt").is_some());
    assert!(catalog.find("missing.txt").is_none());
  }

  #[test]
  fn error_record_has_sentinel_date() {
    let rec = LyricRecord::from_fetch_error("a.txt", "boom");
    assert_eq!(rec.date(), "1970-01-01");
    assert!(!rec.has_date());
  }
}
