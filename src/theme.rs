use std::path::PathBuf;

use ratatui::style::Color;
use tracing::info;

use crate::config::Config;

/// Colour palette for the whole UI.
#[derive(Debug)]
pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub key_fg: Color,
  pub key_bg: Color,
  pub status: Color,
  pub error: Color,
  pub link: Color,
  pub backdrop: Color,
}

pub static THEMES: [Theme; 2] = [
  Theme {
    name: "light",
    bg: Color::Rgb(250, 250, 247),
    fg: Color::Rgb(34, 34, 34),
    accent: Color::Rgb(17, 24, 39),
    muted: Color::Rgb(120, 120, 120),
    border: Color::Rgb(200, 200, 195),
    highlight_fg: Color::Rgb(250, 250, 247),
    highlight_bg: Color::Rgb(55, 65, 81),
    stripe_bg: Color::Rgb(242, 242, 238),
    key_fg: Color::Rgb(250, 250, 247),
    key_bg: Color::Rgb(107, 114, 128),
    status: Color::Rgb(37, 99, 235),
    error: Color::Rgb(185, 28, 28),
    link: Color::Rgb(29, 78, 216),
    backdrop: Color::Rgb(225, 225, 220),
  },
  Theme {
    name: "dark",
    bg: Color::Rgb(18, 18, 20),
    fg: Color::Rgb(228, 228, 231),
    accent: Color::Rgb(244, 244, 245),
    muted: Color::Rgb(140, 140, 150),
    border: Color::Rgb(63, 63, 70),
    highlight_fg: Color::Rgb(18, 18, 20),
    highlight_bg: Color::Rgb(212, 212, 216),
    stripe_bg: Color::Rgb(28, 28, 32),
    key_fg: Color::Rgb(18, 18, 20),
    key_bg: Color::Rgb(161, 161, 170),
    status: Color::Rgb(96, 165, 250),
    error: Color::Rgb(248, 113, 113),
    link: Color::Rgb(147, 197, 253),
    backdrop: Color::Rgb(9, 9, 11),
  },
];

/// Index of the named theme; unknown or missing names fall back to light.
pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(n.trim()))).unwrap_or(0)
}

/// The active theme plus where the choice is persisted.
#[derive(Debug)]
pub struct ThemePreference {
  index: usize,
  path: Option<PathBuf>,
}

impl ThemePreference {
  /// Read the saved choice from `path`. `None` disables persistence.
  pub fn load(path: Option<PathBuf>) -> Self {
    let saved = path.as_deref().map(Config::load_from).unwrap_or_default();
    Self { index: theme_index(saved.theme.as_deref()), path }
  }

  pub fn theme(&self) -> &'static Theme {
    // Safety: index always comes from theme_index() or modular arithmetic in toggle().
    &THEMES[self.index]
  }

  /// Switch between light and dark and write the choice back.
  pub fn toggle(&mut self) {
    self.index = (self.index + 1) % THEMES.len();
    info!(theme = self.theme().name, "theme toggled");
    if let Some(ref path) = self.path {
      Config { theme: Some(self.theme().name.to_string()) }.save_to(path);
    }
  }
}
