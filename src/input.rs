use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use crate::app::{App, CloseTrigger, Focus};
use crate::page::PageApp;
use crate::view::Page;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => {
        app.should_quit = true;
        return;
      }
      KeyCode::Char('t') => {
        app.toggle_theme();
        return;
      }
      KeyCode::Char('s') => {
        app.cycle_sort();
        return;
      }
      _ => {}
    }
  }

  if app.is_modal_open() {
    handle_modal_key(app, key);
    return;
  }

  if key.code == KeyCode::Tab {
    let next = match app.view.page {
      Page::Home => Page::Profile,
      Page::Profile => Page::Home,
    };
    app.navigate(next);
    return;
  }

  match app.view.page {
    Page::Home => match app.focus {
      Focus::Search => handle_search_key(app, key),
      Focus::List => handle_list_key(app, key),
    },
    Page::Profile => handle_profile_key(app, key),
  }
}

fn handle_modal_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Esc => app.close_modal(CloseTrigger::Escape),
    KeyCode::Char('x') | KeyCode::Char('q') => app.close_modal(CloseTrigger::Button),
    KeyCode::Down | KeyCode::Char('j') => app.scroll_modal(1),
    KeyCode::Up | KeyCode::Char('k') => app.scroll_modal(-1),
    KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_modal(10),
    KeyCode::PageUp => app.scroll_modal(-10),
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Enter | KeyCode::Down => {
      if !app.visible.is_empty() {
        app.focus = Focus::List;
      }
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.view.query, app.cursor_position);
      app.view.query.insert(byte_idx, c);
      app.cursor_position += 1;
      app.recompute_view();
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.view.query, app.cursor_position);
        app.view.query.remove(byte_idx);
        app.recompute_view();
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.view.query.chars().count() {
        let byte_idx = char_to_byte_index(&app.view.query, app.cursor_position);
        app.view.query.remove(byte_idx);
        app.recompute_view();
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.view.query.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.view.query.chars().count();
    }
    KeyCode::Esc => {
      if !app.view.query.is_empty() {
        app.input_scroll = 0;
        app.set_query("");
      } else {
        app.should_quit = true;
      }
    }
    _ => {}
  }
}

fn handle_list_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Enter => app.open_selected(),
    KeyCode::Down | KeyCode::Char('j') => app.select_next(),
    KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
    KeyCode::Char('/') | KeyCode::Esc => app.focus = Focus::Search,
    KeyCode::Char('p') => app.navigate(Page::Profile),
    KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

fn handle_profile_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => app.scroll_profile(1),
    KeyCode::Up | KeyCode::Char('k') => app.scroll_profile(-1),
    KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_profile(10),
    KeyCode::PageUp => app.scroll_profile(-10),
    KeyCode::Esc | KeyCode::Char('h') => app.navigate(Page::Home),
    KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

/// Left clicks on the close button or outside the modal close it; the wheel scrolls.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
  let pos = Position::new(mouse.column, mouse.row);
  match mouse.kind {
    MouseEventKind::Down(MouseButton::Left) if app.is_modal_open() => {
      if app.hit.close_button.is_some_and(|r| r.contains(pos)) {
        app.close_modal(CloseTrigger::Button);
      } else if app.hit.modal.is_some_and(|r| !r.contains(pos)) {
        app.close_modal(CloseTrigger::Backdrop);
      }
    }
    MouseEventKind::ScrollDown if app.is_modal_open() => app.scroll_modal(1),
    MouseEventKind::ScrollUp if app.is_modal_open() => app.scroll_modal(-1),
    MouseEventKind::ScrollDown => match app.view.page {
      Page::Home => app.select_next(),
      Page::Profile => app.scroll_profile(1),
    },
    MouseEventKind::ScrollUp => match app.view.page {
      Page::Home => app.select_previous(),
      Page::Profile => app.scroll_profile(-1),
    },
    _ => {}
  }
}

pub fn handle_page_key(app: &mut PageApp, key: KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => app.should_quit = true,
      KeyCode::Char('t') => app.theme.toggle(),
      _ => {}
    }
    return;
  }
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => app.scroll_by(1),
    KeyCode::Up | KeyCode::Char('k') => app.scroll_by(-1),
    KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_by(10),
    KeyCode::PageUp => app.scroll_by(-10),
    KeyCode::Esc | KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use ratatui::layout::Rect;

  use super::*;
  use crate::app::ModalState;
  use crate::app::tests::{app_with, sample_catalog};
  use crate::fetcher::mock::MockTransport;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
  }

  fn click(column: u16, row: u16) -> MouseEvent {
    MouseEvent { kind: MouseEventKind::Down(MouseButton::Left), column, row, modifiers: KeyModifiers::NONE }
  }

  fn app_with_open_modal() -> App {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_catalog(sample_catalog());
    app.open_modal("yume.txt");
    app.hit.modal = Some(Rect::new(10, 5, 40, 20));
    app.hit.close_button = Some(Rect::new(45, 5, 3, 1));
    app
  }

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5);
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "a夢é";
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 4);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  // --- typing ---

  #[test]
  fn typing_filters_the_list() {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_catalog(sample_catalog());
    for c in "kaze".chars() {
      handle_key_event(&mut app, key(KeyCode::Char(c)));
    }
    assert_eq!(app.view.query, "kaze");
    assert_eq!(app.visible, vec![1]);
    handle_key_event(&mut app, key(KeyCode::Backspace));
    assert_eq!(app.view.query, "kaz");
    handle_key_event(&mut app, key(KeyCode::Esc));
    assert_eq!(app.view.query, "");
    assert_eq!(app.visible, vec![0, 1, 2]);
    assert!(!app.should_quit);
  }

  #[test]
  fn multibyte_query_editing() {
    let (mut app, _) = app_with(MockTransport::new());
    for c in "夢風".chars() {
      handle_key_event(&mut app, key(KeyCode::Char(c)));
    }
    handle_key_event(&mut app, key(KeyCode::Left));
    handle_key_event(&mut app, key(KeyCode::Backspace));
    assert_eq!(app.view.query, "風");
  }

  #[test]
  fn enter_moves_to_list_and_opens_modal() {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_catalog(sample_catalog());
    handle_key_event(&mut app, key(KeyCode::Enter));
    assert_eq!(app.focus, Focus::List);
    handle_key_event(&mut app, key(KeyCode::Char('j')));
    handle_key_event(&mut app, key(KeyCode::Enter));
    assert_eq!(app.modal, ModalState::Open { filename: "kaze.txt".into(), scroll: 0 });
  }

  #[test]
  fn ctrl_s_cycles_sort() {
    let (mut app, _) = app_with(MockTransport::new());
    app.set_catalog(sample_catalog());
    handle_key_event(&mut app, ctrl('s'));
    assert_eq!(app.visible, vec![1, 0, 2]);
  }

  // --- closing the modal ---

  #[test]
  fn escape_closes_modal() {
    let mut app = app_with_open_modal();
    handle_key_event(&mut app, key(KeyCode::Esc));
    assert_eq!(app.modal, ModalState::Closed);
    assert!(!app.scroll_locked);
    assert!(!app.should_quit);
  }

  #[test]
  fn close_button_click_closes_modal() {
    let mut app = app_with_open_modal();
    handle_mouse_event(&mut app, click(46, 5));
    assert_eq!(app.modal, ModalState::Closed);
    assert!(!app.scroll_locked);
  }

  #[test]
  fn backdrop_click_closes_modal() {
    let mut app = app_with_open_modal();
    handle_mouse_event(&mut app, click(2, 2));
    assert_eq!(app.modal, ModalState::Closed);
    assert!(!app.scroll_locked);
  }

  #[test]
  fn click_inside_modal_keeps_it_open() {
    let mut app = app_with_open_modal();
    handle_mouse_event(&mut app, click(20, 10));
    assert!(app.is_modal_open());
  }

  #[test]
  fn tab_is_ignored_while_modal_open() {
    let mut app = app_with_open_modal();
    handle_key_event(&mut app, key(KeyCode::Tab));
    assert_eq!(app.view.page, Page::Home);
  }

  // --- standalone page ---

  #[test]
  fn page_keys_scroll_and_quit() {
    let mut app = PageApp::new(None);
    handle_page_key(&mut app, key(KeyCode::Char('j')));
    handle_page_key(&mut app, key(KeyCode::Char('j')));
    handle_page_key(&mut app, key(KeyCode::Up));
    assert_eq!(app.scroll, 1);
    handle_page_key(&mut app, key(KeyCode::Char('q')));
    assert!(app.should_quit);
  }
}
