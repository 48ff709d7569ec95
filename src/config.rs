use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// User preferences persisted between sessions.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq)]
pub struct Config {
  /// `light` or `dark`. Absent means light.
  pub theme: Option<String>,
}

impl Config {
  /// `prefs.toml` in the platform config directory.
  pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "lyr").map(|dirs| dirs.config_dir().join("prefs.toml"))
  }

  /// Missing or unreadable files yield the defaults.
  pub fn load_from(path: &Path) -> Self {
    if let Ok(content) = std::fs::read_to_string(path)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }
    Self::default()
  }

  pub fn save_to(&self, path: &Path) {
    if let Some(dir) = path.parent()
      && let Err(e) = std::fs::create_dir_all(dir)
    {
      warn!(err = %e, "config: cannot create config dir");
      return;
    }
    match toml::to_string(self) {
      Ok(content) => {
        if let Err(e) = std::fs::write(path, content) {
          warn!(err = %e, "config: write failed");
        }
      }
      Err(e) => warn!(err = %e, "config: serialize failed"),
    }
  }
}
