mod app;
mod catalog;
mod config;
mod constants;
mod fetcher;
mod input;
mod markup;
mod page;
mod parser;
mod theme;
mod ui;
mod view;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::SetTitle,
  },
};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::{App, AppOptions};
use config::Config;
use constants::constants;
use fetcher::{ContentFetcher, DirTransport, HttpTransport, Source, Transport};
use page::PageApp;
use parser::HeaderSchema;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Browse a lyrics catalog in the terminal", long_about = None)]
struct Args {
  /// Base URL or local directory holding the manifest and lyric files
  #[arg(short, long, global = true)]
  source: Option<String>,

  /// Manifest file name, resolved against the source
  #[arg(short, long, global = true)]
  manifest: Option<String>,

  /// Profile document locator (URL, or a path inside a local source)
  #[arg(short, long, global = true)]
  profile: Option<String>,

  /// Lyric header layout: 'v3' (title, artist) or 'v4' (title, artist, date)
  #[arg(long, global = true, value_parser = parse_schema)]
  schema: Option<HeaderSchema>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show a single lyric file full-screen
  Show {
    /// Lyric file name, resolved against the source
    file: Option<String>,
  },
  /// Print shell completions to stdout
  Completions { shell: Shell },
}

fn parse_schema(s: &str) -> Result<HeaderSchema, String> {
  s.parse().map_err(|e: anyhow::Error| e.to_string())
}

// --- Setup ---

/// Log to `lyr.log` in the data dir; the terminal belongs to the TUI.
fn init_logging() -> Option<WorkerGuard> {
  let dirs = ProjectDirs::from("", "", "lyr")?;
  let dir = dirs.data_local_dir();
  std::fs::create_dir_all(dir).ok()?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, "lyr.log"));
  tracing_subscriber::fmt()
    .with_writer(writer)
    .with_ansi(false)
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();
  Some(guard)
}

/// Pick the transport for the source and work out the profile locator.
fn build_fetcher(args: &Args) -> Result<(ContentFetcher, String)> {
  let c = constants();
  let base = args.source.clone().unwrap_or_else(|| c.default_source.clone());
  let manifest = args.manifest.clone().unwrap_or_else(|| c.manifest_name.clone());

  let source = Source::new(base.as_str());
  if source.is_remote() {
    let client = reqwest::Client::builder()
      .user_agent(concat!("lyr/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("Failed to build HTTP client")?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(client));
    let profile = args.profile.clone().unwrap_or_else(|| c.profile_locator.clone());
    Ok((ContentFetcher::new(transport, source, manifest), profile))
  } else {
    let root = PathBuf::from(&base);
    let transport: Arc<dyn Transport> = Arc::new(DirTransport::new(root));
    let profile = args.profile.clone().unwrap_or_else(|| c.local_profile_name.clone());
    Ok((ContentFetcher::new(transport, Source::new(""), manifest), profile))
  }
}

fn default_schema() -> Result<HeaderSchema> {
  constants().default_schema.parse().context("Invalid default_schema in constants.ron")
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(Command::Completions { shell }) = args.command {
    clap_complete::generate(shell, &mut Args::command(), "lyr", &mut io::stdout());
    return Ok(());
  }

  let _guard = init_logging();
  let schema = match args.schema {
    Some(schema) => schema,
    None => default_schema()?,
  };
  let (fetcher, profile_locator) = build_fetcher(&args)?;
  info!(
    version = env!("CARGO_PKG_VERSION"),
    source = ?fetcher.source(),
    schema = schema.label(),
    header_lines = schema.header_line_count(),
    dated = schema.has_date_field(),
    "lyr starting"
  );

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  execute!(io::stdout(), EnableMouseCapture)?;
  let result = match args.command {
    Some(Command::Show { file }) => run_page(&mut terminal, fetcher, file, schema),
    _ => {
      let options = AppOptions { schema, profile_locator, prefs_path: Config::default_path() };
      run(&mut terminal, App::new(fetcher, options))
    }
  };
  let _ = execute!(io::stdout(), DisableMouseCapture);
  ratatui::restore();
  result
}

fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  let poll_interval = Duration::from_millis(constants().poll_interval_ms);
  app.start_catalog_load();

  loop {
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(poll_interval)? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(&mut app, key),
        Event::Mouse(mouse) => input::handle_mouse_event(&mut app, mouse),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("lyr exiting");
  Ok(())
}

fn run_page(
  terminal: &mut DefaultTerminal,
  fetcher: ContentFetcher,
  file: Option<String>,
  schema: HeaderSchema,
) -> Result<()> {
  let poll_interval = Duration::from_millis(constants().poll_interval_ms);
  let mut app = PageApp::new(Config::default_path());
  app.start_load(fetcher, file, schema);
  let mut title_set = false;

  loop {
    app.check_pending();
    if !title_set && let Some(title) = app.window_title() {
      execute!(io::stdout(), SetTitle(title))?;
      title_set = true;
    }

    terminal.draw(|frame| ui::ui_page(frame, &app))?;

    if event::poll(poll_interval)? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_page_key(&mut app, key),
        Event::Mouse(mouse) => match mouse.kind {
          event::MouseEventKind::ScrollDown => app.scroll_by(1),
          event::MouseEventKind::ScrollUp => app.scroll_by(-1),
          _ => {}
        },
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  Ok(())
}
