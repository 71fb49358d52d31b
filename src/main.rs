mod app;
mod browser;
mod config;
mod constants;
mod enrich;
mod error;
mod format;
mod input;
mod logging;
mod player;
mod session;
mod theme;
mod ui;
mod youtube;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use app::App;
use browser::Browser;
use config::{Config, Settings};
use youtube::{VideoSource, YouTubeClient};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// YouTube Data API v3 key
  #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
  api_key: Option<String>,

  /// Region for popular videos (ISO 3166-1 alpha-2, default: US)
  #[arg(short, long)]
  region: Option<String>,

  /// Search for this instead of showing popular videos on startup
  #[arg(short, long)]
  query: Option<String>,
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Logging is best-effort; the UI works without a log file.
  let _log_guard = match logging::init() {
    Ok(guard) => Some(guard),
    Err(e) => {
      eprintln!("warning: logging disabled: {:#}", e);
      None
    }
  };

  let config = Config::load();
  let settings = Settings::resolve(args.api_key.as_deref(), args.region.as_deref(), &config)?;
  info!(region = %settings.region_code, timeout = ?settings.request_timeout, "starting ytb");

  let client = YouTubeClient::new(settings.api_key, settings.region_code, settings.request_timeout)
    .context("Failed to create YouTube client")?;
  let mut app = App::new(Browser::new(Arc::new(client) as Arc<dyn VideoSource>), config);
  if let Some(query) = args.query {
    app.cursor_position = query.chars().count();
    app.input = query;
  }

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, app).await;
  ratatui::restore();
  if let Err(e) = &result {
    error!(err = ?e, "exiting with error");
  }
  result
}

async fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  // Popular videos, or the query from the command line.
  app.trigger_search();

  loop {
    app.check_pending();

    terminal.draw(|frame| ui::ui(frame, &mut app)).context("Failed to draw frame")?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key);
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("quit");
  Ok(())
}
