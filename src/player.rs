use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::process::{Command, Stdio};
use tokio::sync::oneshot;

use crate::constants::constants;
use crate::error::QueryError;

/// Everything the watch panel shows for one video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetails {
  pub id: String,
  pub title: String,
  pub channel_name: String,
  pub published_at: DateTime<Utc>,
  pub thumbnail_url: String,
  pub description: String,
  pub view_count: Option<u64>,
  pub duration_seconds: Option<u64>,
}

impl VideoDetails {
  pub fn watch_url(&self) -> String {
    watch_url(&self.id)
  }
}

pub fn watch_url(video_id: &str) -> String {
  format!("{}{}", constants().watch_url_base, video_id)
}

/// Player embed with autoplay and without related-video suggestions.
pub fn embed_url(video_id: &str) -> String {
  format!("{}{}?autoplay=1&rel=0", constants().embed_url_base, video_id)
}

/// Watch panel state for the selected video.
#[derive(Debug)]
pub enum WatchState {
  Loading { video_id: String, rx: oneshot::Receiver<Result<VideoDetails, QueryError>> },
  Ready(VideoDetails),
  Failed { video_id: String, message: String },
}

impl WatchState {
  pub fn video_id(&self) -> &str {
    match self {
      WatchState::Loading { video_id, .. } | WatchState::Failed { video_id, .. } => video_id,
      WatchState::Ready(details) => &details.id,
    }
  }

  /// Advance `Loading` once the lookup has settled. Returns true on a transition.
  pub fn poll(&mut self) -> bool {
    let WatchState::Loading { video_id, rx } = self else { return false };
    let next = match rx.try_recv() {
      Ok(Ok(details)) => WatchState::Ready(details),
      Ok(Err(e)) => WatchState::Failed { video_id: video_id.clone(), message: watch_error_message(&e).to_string() },
      Err(oneshot::error::TryRecvError::Empty) => return false,
      Err(oneshot::error::TryRecvError::Closed) => {
        WatchState::Failed { video_id: video_id.clone(), message: "Failed to load video details".to_string() }
      }
    };
    *self = next;
    true
  }
}

pub fn watch_error_message(err: &QueryError) -> &'static str {
  match err {
    QueryError::VideoNotFound(_) => "Video not found",
    QueryError::RemoteQueryFailed { .. } => "Failed to load video details",
  }
}

/// Open a URL with the platform's default handler, detached from the terminal.
pub fn open_in_browser(url: &str) -> Result<()> {
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";

  let mut child = Command::new(cmd)
    .arg(url)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()
    .with_context(|| format!("Failed to launch {}", cmd))?;
  // Reap the child in a background thread to avoid zombie processes.
  std::thread::spawn(move || {
    let _ = child.wait();
  });
  Ok(())
}
