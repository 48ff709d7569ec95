use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Flex, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span, Text},
  widgets::{Block, BorderType, Clear, List, ListItem, Padding, Paragraph, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, Focus, ModalContent, ProfileStatus};
use crate::catalog::LyricRecord;
use crate::constants::constants;
use crate::markup::{self, Inline};
use crate::page::{LyricPage, PageApp};
use crate::theme::Theme;
use crate::view::{Page, SortMode};

const CLOSE_LABEL: &str = "[x]";

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` columns, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.width() <= max_width {
    return s.to_string();
  }
  let mut out = String::new();
  let mut used = 0;
  for c in s.chars() {
    let w = c.width().unwrap_or(0);
    if used + w + 1 > max_width {
      break;
    }
    out.push(c);
    used += w;
  }
  out.push('…');
  out
}

/// A rect of the given percentage size centered in `area`.
fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
  let [vertical] = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center).areas(area);
  let [rect] = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center).areas(vertical);
  rect
}

fn rounded_block(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

/// Title for display; records with no title at all fall back to a placeholder.
fn display_title(record: &LyricRecord) -> &str {
  if record.title().trim().is_empty() { constants().untitled.as_str() } else { record.title() }
}

/// Byline shown under a title: artist and date, skipping whichever is missing.
fn byline(record: &LyricRecord) -> String {
  match (record.artist().is_empty(), record.has_date()) {
    (false, true) => format!("{}  ·  {}", record.artist(), record.date()),
    (false, false) => record.artist().to_string(),
    (true, true) => record.date().to_string(),
    (true, false) => String::new(),
  }
}

fn body_text(body: &str, theme: &Theme) -> Text<'static> {
  body.split('\n').map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(theme.fg)))).collect()
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, footer_area] =
    Layout::vertical([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)])
      .areas(frame.area());

  render_header(frame, app, header_area);
  match app.view.page {
    Page::Home => render_home(frame, app, main_area),
    Page::Profile => render_profile(frame, app, main_area),
  }
  render_status(frame, app, status_area);
  render_footer(frame, app, footer_area);

  if app.is_modal_open() {
    render_modal(frame, app);
  }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut spans = vec![Span::styled(" ♪ lyr ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))];
  for page in [Page::Home, Page::Profile] {
    let style = if app.view.page == page {
      Style::default().fg(theme.accent).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
      Style::default().fg(theme.muted)
    };
    spans.push(Span::raw("  "));
    spans.push(Span::styled(page.label(), style));
  }
  frame.render_widget(Line::from(spans), area);

  let sort = format!("sort: {} ", SortMode::label(app.view.sort));
  let right = Line::from(Span::styled(&sort, Style::default().fg(theme.muted)));
  let sort_w = (sort.len() as u16).min(area.width);
  let right_area = Rect { x: area.x + area.width - sort_w, width: sort_w, ..area };
  frame.render_widget(right, right_area);
}

fn render_home(frame: &mut Frame, app: &mut App, area: Rect) {
  let [input_area, list_area] = Layout::vertical([Constraint::Length(3), Constraint::Min(3)]).areas(area);
  render_input(frame, app, input_area);
  render_results(frame, app, list_area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.focus == Focus::Search && !app.is_modal_open();
  let border_color = if focused { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Search title or lyrics ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  // Keep at least one column so the scroll window never goes past the cursor.
  let inner_w = (area.width.saturating_sub(4) as usize).max(1);
  let cursor_col = display_width(&app.view.query, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .view
    .query
    .chars()
    .scan(0usize, |col, c| {
      let w = c.width().unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if focused && area.width > 4 {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let block = rounded_block(theme)
    .title(format!(" Lyrics ({}/{}) ", app.visible.len(), app.catalog.len()))
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD));

  if app.visible.is_empty() {
    let msg = if app.catalog_loading { &constants().loading_catalog } else { &constants().no_results };
    let paragraph = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(msg.as_str(), Style::default().fg(theme.muted)))])
      .alignment(Alignment::Center)
      .block(block);
    frame.render_widget(paragraph, area);
    return;
  }

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let selected = app.list_state.selected();

  let items: Vec<ListItem> = app
    .visible_records()
    .enumerate()
    .map(|(i, record)| {
      let bg = if Some(i) == selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };
      let fg = if Some(i) == selected { theme.highlight_fg } else { theme.fg };

      let meta = byline(record);
      let meta_w = meta.width();
      let title = truncate_str(display_title(record), inner_w.saturating_sub(meta_w + 2));
      let gap = inner_w.saturating_sub(title.width() + meta_w);

      let mut lines = vec![Line::from(vec![
        Span::styled(title, Style::default().fg(fg).add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(gap)),
        Span::styled(meta, Style::default().fg(theme.muted)),
      ])];
      for preview in record.preview().split(crate::parser::PREVIEW_BREAK).filter(|l| !l.trim().is_empty()) {
        lines.push(Line::from(Span::styled(truncate_str(preview, inner_w), Style::default().fg(theme.muted))));
      }
      lines.push(Line::from(""));
      ListItem::new(lines).bg(bg)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg));

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn inline_spans(spans: &[Inline], theme: &Theme) -> Vec<Span<'static>> {
  spans
    .iter()
    .flat_map(|span| match span {
      Inline::Text(t) => vec![Span::styled(t.clone(), Style::default().fg(theme.fg))],
      Inline::Link { text, url } => vec![
        Span::styled(text.clone(), Style::default().fg(theme.link).add_modifier(Modifier::UNDERLINED)),
        Span::styled(format!(" <{}>", url), Style::default().fg(theme.muted)),
      ],
    })
    .collect()
}

fn profile_lines(blocks: &[markup::Block], theme: &Theme) -> Vec<Line<'static>> {
  let mut lines = Vec::new();
  for block in blocks {
    match block {
      markup::Block::Heading2(h) => {
        lines.push(Line::from(Span::styled(h.clone(), Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))));
      }
      markup::Block::Heading3(h) => {
        lines.push(Line::from(Span::styled(
          h.clone(),
          Style::default().fg(theme.fg).add_modifier(Modifier::BOLD | Modifier::ITALIC),
        )));
      }
      markup::Block::Paragraph(rows) => {
        lines.extend(rows.iter().map(|row| Line::from(inline_spans(row, theme))));
      }
    }
    lines.push(Line::from(""));
  }
  lines
}

fn render_profile(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let block = rounded_block(theme)
    .title(" Profile ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .padding(Padding::horizontal(1));

  let lines = match &app.profile {
    ProfileStatus::NotLoaded | ProfileStatus::Loading => {
      vec![Line::from(Span::styled(constants().loading_profile.clone(), Style::default().fg(theme.muted)))]
    }
    ProfileStatus::Loaded(blocks) => profile_lines(blocks, theme),
    ProfileStatus::Failed(msg) => vec![
      Line::from(Span::styled(msg.clone(), Style::default().fg(theme.error))),
      Line::from(""),
      Line::from(Span::styled(constants().profile_retry_hint.as_str(), Style::default().fg(theme.muted))),
    ],
  };

  let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).scroll((app.profile_scroll, 0)).block(block);
  frame.render_widget(paragraph, area);
}

fn render_modal(frame: &mut Frame, app: &mut App) {
  let Some(content) = app.modal_content() else { return };
  let theme = app.theme();
  let area = centered(frame.area(), 80, 80);
  let scroll = match app.modal {
    crate::app::ModalState::Open { scroll, .. } => scroll,
    crate::app::ModalState::Closed => 0,
  };

  let (title, mut lines) = match content {
    ModalContent::Lyric(record) => {
      let mut lines = Vec::new();
      let meta = byline(record);
      if !meta.is_empty() {
        lines.push(Line::from(Span::styled(meta, Style::default().fg(theme.muted))));
        lines.push(Line::from(""));
      }
      lines.extend(body_text(record.body(), theme).lines);
      (display_title(record).to_string(), lines)
    }
    ModalContent::Missing { filename, message } => (
      filename.to_string(),
      vec![Line::from(Span::styled(message.to_string(), Style::default().fg(theme.error)))],
    ),
  };
  lines.push(Line::from(""));

  let block = Block::bordered()
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.accent))
    .title(format!(" {} ", title))
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .title_top(Line::from(Span::styled(CLOSE_LABEL, Style::default().fg(theme.muted))).right_aligned())
    .padding(Padding::new(2, 2, 1, 0))
    .style(Style::default().bg(theme.bg));

  let full = frame.area();
  frame.buffer_mut().set_style(full, Style::default().bg(theme.backdrop).fg(theme.muted));
  frame.render_widget(Clear, area);
  let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).scroll((scroll, 0)).block(block);
  frame.render_widget(paragraph, area);

  let close_w = CLOSE_LABEL.len() as u16;
  app.hit.modal = Some(area);
  app.hit.close_button =
    Some(Rect { x: (area.x + area.width).saturating_sub(close_w + 1), y: area.y, width: close_w, height: 1 });
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if app.catalog.is_empty() {
    (String::new(), Style::default())
  } else {
    (format!(" {} lyrics", app.catalog.len()), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn key_hints(frame: &mut Frame, theme: &Theme, keys: &[(&str, &str)], area: Rect) {
  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let label_w = (theme_label.len() as u16).min(area.width);
  let right_area = Rect { x: area.x + area.width - label_w, width: label_w, ..area };
  frame.render_widget(right, right_area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let keys: Vec<(&str, &str)> = if app.is_modal_open() {
    vec![("Esc", "Close"), ("x", "Close"), ("j/k", "Scroll")]
  } else {
    match (app.view.page, app.focus) {
      (Page::Home, Focus::Search) => {
        vec![("Enter", "Results"), ("Tab", "Profile"), ("^s", "Sort"), ("^t", "Theme"), ("Esc", "Clear/Quit")]
      }
      (Page::Home, Focus::List) => vec![
        ("Enter", "Open"),
        ("j/k", "Navigate"),
        ("/", "Search"),
        ("Tab", "Profile"),
        ("^s", "Sort"),
        ("^t", "Theme"),
        ("q", "Quit"),
      ],
      (Page::Profile, _) => vec![("j/k", "Scroll"), ("Tab", "Home"), ("^t", "Theme"), ("q", "Quit")],
    }
  };
  key_hints(frame, app.theme(), &keys, area);
}

// --- Standalone page ---

pub fn ui_page(frame: &mut Frame, app: &PageApp) {
  let theme = app.theme();
  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [main_area, footer_area] = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());

  let (title, lines) = match &app.page {
    LyricPage::Loading => (String::new(), vec![Line::from(Span::styled("…", Style::default().fg(theme.muted)))]),
    LyricPage::Ready(record) => {
      let mut lines = vec![Line::from(Span::styled(record.artist().to_string(), Style::default().fg(theme.muted)))];
      lines.push(Line::from(""));
      lines.extend(body_text(record.body(), theme).lines);
      (display_title(record).to_string(), lines)
    }
    LyricPage::Error { title, message } => {
      (title.clone(), vec![Line::from(Span::styled(message.clone(), Style::default().fg(theme.error)))])
    }
  };

  let block = rounded_block(theme)
    .title(format!(" {} ", title))
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .padding(Padding::new(2, 2, 1, 0));
  let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).scroll((app.scroll, 0)).block(block);
  frame.render_widget(paragraph, main_area);

  key_hints(frame, theme, &[("j/k", "Scroll"), ("^t", "Theme"), ("q", "Quit")], footer_area);
}
