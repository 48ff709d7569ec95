use std::path::PathBuf;
use std::time::{Duration, Instant};

use ratatui::{layout::Rect, widgets::ListState};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::catalog::{self, Catalog, LyricRecord};
use crate::constants::constants;
use crate::fetcher::{ContentFetcher, FetchError};
use crate::markup::{self, Block};
use crate::parser::HeaderSchema;
use crate::theme::{Theme, ThemePreference};
use crate::view::{self, Page, SortMode, ViewState};

/// Which home-page widget receives typed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  Search,
  List,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModalState {
  #[default]
  Closed,
  Open { filename: String, scroll: u16 },
}

/// What asked the modal to close. All of them end in the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTrigger {
  Button,
  Backdrop,
  Escape,
}

/// Lazy profile load. `Failed` is retried on the next visit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProfileStatus {
  #[default]
  NotLoaded,
  Loading,
  Loaded(Vec<Block>),
  Failed(String),
}

/// What the modal shows for the currently open filename.
#[derive(Debug, PartialEq, Eq)]
pub enum ModalContent<'a> {
  Lyric(&'a LyricRecord),
  /// The filename is not in the catalog.
  Missing { filename: &'a str, message: &'a str },
}

/// Screen regions written by the renderer so mouse clicks can be hit-tested.
#[derive(Debug, Default)]
pub struct HitAreas {
  pub modal: Option<Rect>,
  pub close_button: Option<Rect>,
}

/// In-flight background tasks.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) catalog_rx: Option<oneshot::Receiver<Catalog>>,
  pub(crate) profile_rx: Option<oneshot::Receiver<Result<String, FetchError>>>,
}

/// Startup parameters for [`App`].
pub struct AppOptions {
  pub schema: HeaderSchema,
  pub profile_locator: String,
  /// Where the theme preference is stored. `None` disables persistence.
  pub prefs_path: Option<PathBuf>,
}

pub struct App {
  pub view: ViewState,
  pub modal: ModalState,
  /// Set while the modal is open; list and page scrolling are ignored.
  pub scroll_locked: bool,
  pub focus: Focus,
  /// Cursor position within the search query (char index).
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub catalog: Catalog,
  pub catalog_loading: bool,
  /// Indices into `catalog.records()` for the current query and sort.
  pub visible: Vec<usize>,
  pub list_state: ListState,
  pub profile: ProfileStatus,
  pub profile_scroll: u16,
  pub theme: ThemePreference,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  pub should_quit: bool,
  pub hit: HitAreas,
  fetcher: ContentFetcher,
  schema: HeaderSchema,
  profile_locator: String,
  pub(crate) tasks: AsyncTasks,
  error_time: Option<Instant>,
}

impl App {
  pub fn new(fetcher: ContentFetcher, options: AppOptions) -> Self {
    Self {
      view: ViewState::default(),
      modal: ModalState::Closed,
      scroll_locked: false,
      focus: Focus::Search,
      cursor_position: 0,
      input_scroll: 0,
      catalog: Catalog::default(),
      catalog_loading: false,
      visible: Vec::new(),
      list_state: ListState::default(),
      profile: ProfileStatus::NotLoaded,
      profile_scroll: 0,
      theme: ThemePreference::load(options.prefs_path),
      last_error: None,
      status_message: None,
      should_quit: false,
      hit: HitAreas::default(),
      fetcher,
      schema: options.schema,
      profile_locator: options.profile_locator,
      tasks: AsyncTasks::default(),
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static Theme {
    self.theme.theme()
  }

  pub fn toggle_theme(&mut self) {
    self.theme.toggle();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_expiry_secs)
    {
      self.clear_error();
    }
  }

  // --- Catalog ---

  /// Fetch the manifest and every lyric file in the background.
  pub fn start_catalog_load(&mut self) {
    if self.catalog_loading {
      return;
    }
    self.catalog_loading = true;
    self.status_message = Some(constants().loading_catalog.clone());
    info!(source = ?self.fetcher.source(), "catalog: loading");

    let fetcher = self.fetcher.clone();
    let schema = self.schema;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(catalog::load_catalog(&fetcher, schema).await);
    });
    self.tasks.catalog_rx = Some(rx);
  }

  /// Install a freshly built catalog, replacing any previous one wholesale.
  pub fn set_catalog(&mut self, catalog: Catalog) {
    self.catalog = catalog;
    self.catalog_loading = false;
    self.recompute_view();
    self.list_state.select(if self.visible.is_empty() { None } else { Some(0) });
  }

  /// Rebuild `visible` from the catalog and view state, clamping the selection.
  pub fn recompute_view(&mut self) {
    self.visible = view::derive_indices(&self.catalog, &self.view.query, self.view.sort);
    if self.visible.is_empty() {
      self.list_state.select(None);
    } else {
      let sel = self.list_state.selected().unwrap_or(0);
      if sel >= self.visible.len() {
        self.list_state.select(Some(self.visible.len() - 1));
      } else {
        self.list_state.select(Some(sel));
      }
    }
  }

  pub fn visible_records(&self) -> impl Iterator<Item = &LyricRecord> {
    self.visible.iter().filter_map(|&i| self.catalog.records().get(i))
  }

  pub fn set_query(&mut self, query: impl Into<String>) {
    self.view.query = query.into();
    self.cursor_position = self.view.query.chars().count();
    self.recompute_view();
  }

  pub fn cycle_sort(&mut self) {
    self.view.sort = SortMode::next(self.view.sort);
    debug!(sort = SortMode::label(self.view.sort), "sort changed");
    self.recompute_view();
  }

  pub fn selected_record(&self) -> Option<&LyricRecord> {
    let pos = self.list_state.selected()?;
    let &idx = self.visible.get(pos)?;
    self.catalog.records().get(idx)
  }

  pub fn select_next(&mut self) {
    if self.scroll_locked {
      return;
    }
    let count = self.visible.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| (i + 1) % count);
      self.list_state.select(Some(i));
    }
  }

  pub fn select_previous(&mut self) {
    if self.scroll_locked {
      return;
    }
    let count = self.visible.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
      self.list_state.select(Some(i));
    }
  }

  // --- Navigation ---

  pub fn navigate(&mut self, page: Page) {
    if self.view.page != page {
      debug!(from = self.view.page.label(), to = page.label(), "navigate");
    }
    self.view.page = page;
    if page == Page::Profile && matches!(self.profile, ProfileStatus::NotLoaded | ProfileStatus::Failed(_)) {
      self.start_profile_load();
    }
  }

  fn start_profile_load(&mut self) {
    info!(locator = %self.profile_locator, "profile: loading");
    self.profile = ProfileStatus::Loading;
    let fetcher = self.fetcher.clone();
    let locator = self.profile_locator.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(fetcher.try_fetch(&locator).await);
    });
    self.tasks.profile_rx = Some(rx);
  }

  pub fn scroll_profile(&mut self, delta: i32) {
    if self.scroll_locked {
      return;
    }
    self.profile_scroll = self.profile_scroll.saturating_add_signed(delta as i16);
  }

  // --- Modal ---

  pub fn open_modal(&mut self, filename: impl Into<String>) {
    let filename = filename.into();
    if self.catalog.find(&filename).is_none() {
      warn!(filename = %filename, "modal: lyric not in catalog");
    }
    debug!(filename = %filename, "modal: open");
    self.modal = ModalState::Open { filename, scroll: 0 };
    self.scroll_locked = true;
  }

  pub fn open_selected(&mut self) {
    if let Some(filename) = self.selected_record().map(|r| r.filename().to_string()) {
      self.open_modal(filename);
    }
  }

  pub fn close_modal(&mut self, trigger: CloseTrigger) {
    if self.modal == ModalState::Closed {
      return;
    }
    debug!(?trigger, "modal: close");
    self.modal = ModalState::Closed;
    self.scroll_locked = false;
    self.hit = HitAreas::default();
  }

  pub fn is_modal_open(&self) -> bool {
    matches!(self.modal, ModalState::Open { .. })
  }

  pub fn modal_content(&self) -> Option<ModalContent<'_>> {
    let ModalState::Open { ref filename, .. } = self.modal else { return None };
    Some(match self.catalog.find(filename) {
      Some(record) => ModalContent::Lyric(record),
      None => ModalContent::Missing { filename, message: &constants().lookup_miss },
    })
  }

  pub fn scroll_modal(&mut self, delta: i32) {
    if let ModalState::Open { ref mut scroll, .. } = self.modal {
      *scroll = scroll.saturating_add_signed(delta as i16);
    }
  }

  // --- Background results ---

  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.tasks.catalog_rx.take() {
      match rx.try_recv() {
        Ok(catalog) => {
          self.status_message = None;
          info!(count = catalog.len(), "catalog: ready");
          self.set_catalog(catalog);
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.catalog_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.catalog_loading = false;
          self.set_error(constants().catalog_task_failed.clone());
        }
      }
    }

    if let Some(mut rx) = self.tasks.profile_rx.take() {
      match rx.try_recv() {
        Ok(Ok(text)) => {
          self.profile = ProfileStatus::Loaded(markup::render_profile(&text));
        }
        Ok(Err(e)) => {
          warn!(err = %e, "profile: load failed");
          self.profile = ProfileStatus::Failed(e.to_string());
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.profile_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.profile = ProfileStatus::Failed(constants().profile_task_failed.clone());
        }
      }
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::fetcher::Source;
  use crate::fetcher::mock::MockTransport;
  use crate::parser::parse;

  const BASE: &str = "https://example.test/lyrics/";
  const PROFILE: &str = "https://example.test/profile.md";

  pub(crate) fn app_with(transport: MockTransport) -> (App, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let fetcher = ContentFetcher::new(transport.clone(), Source::new(BASE), "manifest.json");
    let app = App::new(
      fetcher,
      AppOptions { schema: HeaderSchema::V4, profile_locator: PROFILE.to_string(), prefs_path: None },
    );
    (app, transport)
  }

  pub(crate) fn sample_catalog() -> Catalog {
    Catalog::new(vec![
      parse("Yume\nA\n2023-05-01\n\nfirst line\nsecond line", "yume.txt", HeaderSchema::V4),
      parse("Kaze\nB\n2024-01-01\n\nwind\nblows", "kaze.txt", HeaderSchema::V4),
      parse("Monokuro\nC\n\n\nblack\nwhite", "monokuro.txt", HeaderSchema::V4),
    ])
  }

  /// Let spawned tasks run, then poll until `done` holds.
  async fn settle(app: &mut App, done: impl Fn(&App) -> bool) {
    for _ in 0..100 {
      app.check_pending();
      if done(app) {
        return;
      }
      tokio::task::yield_now().await;
    }
    panic!("background task did not finish");
  }

  // --- initial state ---

  #[test]
  fn starts_home_with_modal_closed() {
    let (app, _) = app_with(MockTransport::new());
    assert_eq!(app.view.page, Page::Home);
    assert_eq!(app.modal, ModalState::Closed);
    assert!(!app.scroll_locked);
    assert_eq!(app.profile, ProfileStatus::NotLoaded);
    assert_eq!(app.theme().name, "light");
  }

  // --- catalog ---

  #[tokio::test]
  async fn catalog_load_fills_visible_list() {
    let (mut app, _) = app_with(
      MockTransport::new()
        .with(&format!("{}manifest.json", BASE), r#"{"files":["a.txt","b.txt"]}"#)
        .with(&format!("{}a.txt", BASE), "A\nx\n2020-01-01\n\nalpha")
        .with(&format!("{}b.txt", BASE), "B\nx\n2021-01-01\n\nbeta"),
    );
    app.start_catalog_load();
    assert!(app.catalog_loading);
    settle(&mut app, |a| !a.catalog_loading).await;
    assert_eq!(app.catalog.len(), 2);
    assert_eq!(app.visible, vec![0, 1]);
    assert_eq!(app.list_state.selected(), Some(0));
    assert!(app.status_message.is_none());
  }

  #[test]
  fn query_and_sort_drive_visible() {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_catalog(sample_catalog());
    assert_eq!(app.visible, vec![0, 1, 2]);

    app.set_query("WIND");
    assert_eq!(app.visible, vec![1]);

    app.set_query("");
    app.cycle_sort();
    assert_eq!(app.view.sort, Some(SortMode::Newest));
    assert_eq!(app.visible, vec![1, 0, 2]);
  }

  #[test]
  fn selection_clamps_when_list_shrinks() {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_catalog(sample_catalog());
    app.list_state.select(Some(2));
    app.set_query("kaze");
    assert_eq!(app.list_state.selected(), Some(0));
    app.set_query("zzz");
    assert_eq!(app.list_state.selected(), None);
    assert!(app.selected_record().is_none());
  }

  #[test]
  fn selection_wraps() {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_catalog(sample_catalog());
    app.select_previous();
    assert_eq!(app.list_state.selected(), Some(2));
    app.select_next();
    assert_eq!(app.list_state.selected(), Some(0));
  }

  // --- modal ---

  #[test]
  fn open_missing_lyric_shows_lookup_message() {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_catalog(sample_catalog());
    app.open_modal("missing.txt");
    assert!(app.is_modal_open());
    assert_eq!(
      app.modal_content(),
      Some(ModalContent::Missing { filename: "missing.txt", message: &constants().lookup_miss })
    );
  }

  #[test]
  fn open_selected_shows_record() {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_catalog(sample_catalog());
    app.select_next();
    app.open_selected();
    match app.modal_content() {
      Some(ModalContent::Lyric(r)) => assert_eq!(r.filename(), "kaze.txt"),
      other => panic!("unexpected modal content: {:?}", other),
    }
    assert!(app.scroll_locked);
  }

  #[test]
  fn every_close_trigger_reaches_the_same_state() {
    let mut finals = Vec::new();
    for trigger in [CloseTrigger::Button, CloseTrigger::Backdrop, CloseTrigger::Escape] {
      let (mut app, _) = app_with(MockTransport::new());
      app.set_catalog(sample_catalog());
      app.open_modal("yume.txt");
      app.scroll_modal(3);
      app.close_modal(trigger);
      finals.push((app.modal.clone(), app.scroll_locked));
    }
    assert!(finals.iter().all(|f| *f == (ModalState::Closed, false)));
  }

  #[test]
  fn list_does_not_scroll_behind_modal() {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_catalog(sample_catalog());
    app.open_modal("yume.txt");
    app.select_next();
    assert_eq!(app.list_state.selected(), Some(0));
    app.close_modal(CloseTrigger::Escape);
    app.select_next();
    assert_eq!(app.list_state.selected(), Some(1));
  }

  #[test]
  fn closing_a_closed_modal_is_a_no_op() {
    let (mut app, _) = app_with(MockTransport::new());
    app.close_modal(CloseTrigger::Escape);
    assert_eq!(app.modal, ModalState::Closed);
    assert!(!app.scroll_locked);
  }

  #[test]
  fn modal_scroll_never_underflows() {
    let (mut app, _) = app_with(MockTransport::new());
    app.open_modal("yume.txt");
    app.scroll_modal(-5);
    assert_eq!(app.modal, ModalState::Open { filename: "yume.txt".into(), scroll: 0 });
    app.scroll_modal(2);
    assert_eq!(app.modal, ModalState::Open { filename: "yume.txt".into(), scroll: 2 });
  }

  // --- profile ---

  #[tokio::test]
  async fn profile_loads_once() {
    let (mut app, transport) = app_with(MockTransport::new().with(PROFILE, "## About\nhello"));
    app.navigate(Page::Profile);
    assert_eq!(app.profile, ProfileStatus::Loading);
    settle(&mut app, |a| matches!(a.profile, ProfileStatus::Loaded(_))).await;

    app.navigate(Page::Home);
    app.navigate(Page::Profile);
    app.navigate(Page::Profile);
    assert_eq!(transport.call_count(), 1);
    assert!(matches!(app.profile, ProfileStatus::Loaded(ref b) if b[0] == Block::Heading2("About".into())));
  }

  #[tokio::test]
  async fn navigating_while_loading_does_not_refetch() {
    let (mut app, transport) = app_with(MockTransport::new().with(PROFILE, "hi"));
    app.navigate(Page::Profile);
    app.navigate(Page::Home);
    app.navigate(Page::Profile);
    settle(&mut app, |a| matches!(a.profile, ProfileStatus::Loaded(_))).await;
    assert_eq!(transport.call_count(), 1);
  }

  #[tokio::test]
  async fn failed_profile_is_retried_on_next_visit() {
    let (mut app, transport) = app_with(MockTransport::new());
    app.navigate(Page::Profile);
    settle(&mut app, |a| matches!(a.profile, ProfileStatus::Failed(_))).await;
    if let ProfileStatus::Failed(ref msg) = app.profile {
      assert!(msg.starts_with("Error loading content: 404"));
    }

    app.navigate(Page::Home);
    app.navigate(Page::Profile);
    assert_eq!(app.profile, ProfileStatus::Loading);
    settle(&mut app, |a| matches!(a.profile, ProfileStatus::Failed(_))).await;
    assert_eq!(transport.call_count(), 2);
  }

  #[test]
  fn home_navigation_never_fetches() {
    let (mut app, transport) = app_with(MockTransport::new());
    app.navigate(Page::Home);
    assert_eq!(app.profile, ProfileStatus::NotLoaded);
    assert_eq!(transport.call_count(), 0);
  }

  // --- errors ---

  #[test]
  fn dropped_background_tasks_report_failure() {
    let (mut app, _) = app_with(MockTransport::new());
    let (catalog_tx, catalog_rx) = oneshot::channel::<Catalog>();
    let (profile_tx, profile_rx) = oneshot::channel();
    drop(catalog_tx);
    drop(profile_tx);
    app.catalog_loading = true;
    app.tasks.catalog_rx = Some(catalog_rx);
    app.tasks.profile_rx = Some(profile_rx);

    app.check_pending();
    assert!(!app.catalog_loading);
    assert_eq!(app.last_error.as_ref(), Some(&constants().catalog_task_failed));
    assert_eq!(app.profile, ProfileStatus::Failed(constants().profile_task_failed.clone()));
  }

  #[test]
  fn fresh_error_is_not_expired() {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_error("boom".into());
    app.expire_error();
    assert_eq!(app.last_error.as_deref(), Some("boom"));
  }
}
