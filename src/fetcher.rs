use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a resource could not be retrieved.
///
/// The `Display` output is the text shown to the user in place of the
/// resource, so callers that never want a failure can just render it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
  #[error("Error loading content: {code} {reason} ({locator})")]
  Status { code: u16, reason: String, locator: String },
  #[error("Loading error: {0}")]
  Transport(String),
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>>;

/// Byte-stream source for manifest, lyric and profile resources.
pub trait Transport: Send + Sync {
  /// Retrieve the full text behind `locator`.
  fn get<'a>(&'a self, locator: &'a str) -> FetchFuture<'a>;
}

/// Fetches over HTTP(S).
pub struct HttpTransport {
  client: Client,
}

impl HttpTransport {
  pub fn new(client: Client) -> Self {
    Self { client }
  }
}

impl Transport for HttpTransport {
  fn get<'a>(&'a self, locator: &'a str) -> FetchFuture<'a> {
    Box::pin(async move {
      let response = self.client.get(locator).send().await.map_err(|e| FetchError::Transport(e.to_string()))?;
      let status = response.status();
      if !status.is_success() {
        return Err(FetchError::Status {
          code: status.as_u16(),
          reason: status.canonical_reason().unwrap_or("").to_string(),
          locator: locator.to_string(),
        });
      }
      response.text().await.map_err(|e| FetchError::Transport(e.to_string()))
    })
  }
}

/// Reads resources from a local directory. Locators are paths relative to `root`.
pub struct DirTransport {
  root: PathBuf,
}

impl DirTransport {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }
}

impl Transport for DirTransport {
  fn get<'a>(&'a self, locator: &'a str) -> FetchFuture<'a> {
    Box::pin(async move {
      let path = self.root.join(locator.trim_start_matches('/'));
      match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::Status {
          code: 404,
          reason: "Not Found".to_string(),
          locator: path.display().to_string(),
        }),
        Err(e) => Err(FetchError::Transport(e.to_string())),
      }
    })
  }
}

/// Base locator that manifest entries are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
  base: String,
}

impl Source {
  pub fn new(base: impl Into<String>) -> Self {
    Self { base: base.into() }
  }

  /// True when the base looks like an HTTP(S) URL rather than a directory.
  pub fn is_remote(&self) -> bool {
    self.base.starts_with("http://") || self.base.starts_with("https://")
  }

  /// Join `name` onto the base with exactly one `/` between them.
  pub fn resolve(&self, name: &str) -> String {
    if self.base.is_empty() {
      return name.trim_start_matches('/').to_string();
    }
    format!("{}/{}", self.base.trim_end_matches('/'), name.trim_start_matches('/'))
  }
}

#[derive(Deserialize, Default)]
struct Manifest {
  #[serde(default)]
  files: Vec<String>,
}

/// Retrieves lyric content. Every failure is turned into data for the caller.
#[derive(Clone)]
pub struct ContentFetcher {
  transport: Arc<dyn Transport>,
  source: Source,
  manifest_name: String,
}

impl ContentFetcher {
  pub fn new(transport: Arc<dyn Transport>, source: Source, manifest_name: impl Into<String>) -> Self {
    Self { transport, source, manifest_name: manifest_name.into() }
  }

  pub fn source(&self) -> &Source {
    &self.source
  }

  /// Locator for a lyric file listed in the manifest.
  pub fn lyric_locator(&self, filename: &str) -> String {
    self.source.resolve(filename)
  }

  pub async fn try_fetch(&self, locator: &str) -> Result<String, FetchError> {
    debug!(locator = %locator, "fetch");
    self.transport.get(locator).await
  }

  /// Fetch `locator`, returning the error text instead of the content on failure.
  pub async fn fetch(&self, locator: &str) -> String {
    self.try_fetch(locator).await.unwrap_or_else(|e| {
      warn!(locator = %locator, err = %e, "fetch failed");
      e.to_string()
    })
  }

  /// Fetch and decode the manifest. Any failure yields an empty list: a
  /// failed fetch comes back as error text, which never decodes.
  pub async fn fetch_manifest(&self) -> Vec<String> {
    let locator = self.source.resolve(&self.manifest_name);
    let text = self.fetch(&locator).await;
    match serde_json::from_str::<Manifest>(&text) {
      Ok(manifest) => manifest.files,
      Err(e) => {
        warn!(locator = %locator, err = %e, "manifest: malformed JSON");
        Vec::new()
      }
    }
  }
}
