//! Filtering and sorting of the catalog for display.

use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;
use tracing::warn;

use crate::catalog::{Catalog, LyricRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
  #[default]
  Home,
  Profile,
}

impl Page {
  pub fn label(self) -> &'static str {
    match self {
      Page::Home => "Home",
      Page::Profile => "Profile",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
  Newest,
  Oldest,
  TitleAscending,
}

impl SortMode {
  /// Step through the modes; `None` is manifest order.
  pub fn next(current: Option<SortMode>) -> Option<SortMode> {
    match current {
      None => Some(SortMode::Newest),
      Some(SortMode::Newest) => Some(SortMode::Oldest),
      Some(SortMode::Oldest) => Some(SortMode::TitleAscending),
      Some(SortMode::TitleAscending) => None,
    }
  }

  pub fn label(mode: Option<SortMode>) -> &'static str {
    match mode {
      None => "manifest",
      Some(SortMode::Newest) => "newest",
      Some(SortMode::Oldest) => "oldest",
      Some(SortMode::TitleAscending) => "title",
    }
  }
}

/// Navigation and list-shaping state. Lives only in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
  pub page: Page,
  pub query: String,
  pub sort: Option<SortMode>,
}

/// Case-insensitive substring match on title or body. An empty query matches everything.
pub fn matches_query(record: &LyricRecord, query: &str) -> bool {
  let needle = query.trim().to_lowercase();
  if needle.is_empty() {
    return true;
  }
  record.title().to_lowercase().contains(&needle) || record.body().to_lowercase().contains(&needle)
}

thread_local! {
  /// Japanese collator. Kana sort before kanji, and kanji follow their JIS reading order.
  static JA_COLLATOR: Option<Collator> = Collator::try_new(&locale!("ja").into(), CollatorOptions::new())
    .map_err(|e| warn!(err = %e, "view: japanese collator unavailable, sorting by code point"))
    .ok();
}

fn compare_titles(collator: Option<&Collator>, a: &LyricRecord, b: &LyricRecord) -> Ordering {
  let primary = collator.map_or(Ordering::Equal, |c| c.compare(a.title(), b.title()));
  primary.then_with(|| a.title().cmp(b.title()))
}

/// Positions into `catalog.records()` of the display list, in display order.
/// Never touches the catalog; ties keep manifest order.
pub fn derive_indices(catalog: &Catalog, query: &str, sort: Option<SortMode>) -> Vec<usize> {
  let records = catalog.records();
  let mut out: Vec<usize> = (0..records.len()).filter(|&i| matches_query(&records[i], query)).collect();
  match sort {
    None => {}
    Some(SortMode::Newest) => out.sort_by(|&a, &b| records[b].date().cmp(records[a].date())),
    Some(SortMode::Oldest) => out.sort_by(|&a, &b| records[a].date().cmp(records[b].date())),
    Some(SortMode::TitleAscending) => JA_COLLATOR.with(|collator| {
      out.sort_by(|&a, &b| compare_titles(collator.as_ref(), &records[a], &records[b]))
    }),
  }
  out
}
