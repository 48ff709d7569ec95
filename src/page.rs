//! Full-screen view of a single lyric file, opened with `lyr show FILE`.

use std::path::PathBuf;

use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::catalog::LyricRecord;
use crate::constants::constants;
use crate::fetcher::ContentFetcher;
use crate::parser::{self, HeaderSchema};
use crate::theme::{Theme, ThemePreference};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricPage {
  Loading,
  Ready(LyricRecord),
  Error { title: String, message: String },
}

/// Load and parse one lyric file. A missing filename or a failed fetch
/// becomes an error page, never a failure.
pub async fn load_lyric_page(fetcher: &ContentFetcher, filename: Option<&str>, schema: HeaderSchema) -> LyricPage {
  let Some(filename) = filename.map(str::trim).filter(|f| !f.is_empty()) else {
    warn!("page: no lyric file given");
    return LyricPage::Error {
      title: constants().missing_file_title.clone(),
      message: constants().missing_file.clone(),
    };
  };

  let locator = fetcher.lyric_locator(filename);
  match fetcher.try_fetch(&locator).await {
    Ok(raw) => {
      info!(filename = %filename, "page: loaded");
      LyricPage::Ready(parser::parse(&raw, filename, schema))
    }
    Err(e) => {
      warn!(filename = %filename, err = %e, "page: load failed");
      LyricPage::Error { title: constants().load_error_title.clone(), message: e.to_string() }
    }
  }
}

/// State of the standalone page run loop.
pub struct PageApp {
  pub page: LyricPage,
  pub scroll: u16,
  pub theme: ThemePreference,
  pub should_quit: bool,
  page_rx: Option<oneshot::Receiver<LyricPage>>,
}

impl PageApp {
  pub fn new(prefs_path: Option<PathBuf>) -> Self {
    Self {
      page: LyricPage::Loading,
      scroll: 0,
      theme: ThemePreference::load(prefs_path),
      should_quit: false,
      page_rx: None,
    }
  }

  pub fn theme(&self) -> &'static Theme {
    self.theme.theme()
  }

  pub fn start_load(&mut self, fetcher: ContentFetcher, filename: Option<String>, schema: HeaderSchema) {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(load_lyric_page(&fetcher, filename.as_deref(), schema).await);
    });
    self.page_rx = Some(rx);
  }

  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.page_rx.take() {
      match rx.try_recv() {
        Ok(page) => self.page = page,
        Err(oneshot::error::TryRecvError::Empty) => self.page_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => {
          self.page = LyricPage::Error {
            title: constants().load_error_title.clone(),
            message: constants().load_task_failed.clone(),
          };
        }
      }
    }
  }

  pub fn scroll_by(&mut self, delta: i32) {
    self.scroll = self.scroll.saturating_add_signed(delta as i16);
  }

  /// Terminal window title for the loaded page.
  pub fn window_title(&self) -> Option<String> {
    match &self.page {
      LyricPage::Ready(record) => Some(format!("{} - lyr", record.title())),
      _ => None,
    }
  }
}
