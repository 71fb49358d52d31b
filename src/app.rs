use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::browser::{BrowseView, Browser};
use crate::config::Config;
use crate::constants::constants;
use crate::enrich::VideoSummary;
use crate::player::{WatchState, open_in_browser, watch_url};
use crate::theme::{THEMES, Theme, theme_index};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
  Watch,
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub mode: AppMode,
  pub theme_index: usize,
  pub list_state: ListState,
  pub browser: Browser,
  /// Watch panel for the most recently selected video.
  pub watch: Option<WatchState>,
  watch_task: Option<JoinHandle<()>>,
  pub last_error: Option<String>,
  pub should_quit: bool,
  config: Config,
  /// Whether theme changes are written back to `config.toml`.
  persist_config: bool,
  /// Jump to the result list once the submitted search settles.
  focus_results: bool,
  /// When the last error was set; cleared after `error_display_secs`.
  error_time: Option<Instant>,
}

impl App {
  pub fn new(browser: Browser, config: Config) -> Self {
    let theme_index = theme_index(config.theme_name.as_deref());
    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      mode: AppMode::Input,
      theme_index,
      list_state: ListState::default(),
      browser,
      watch: None,
      watch_task: None,
      last_error: None,
      should_quit: false,
      config,
      persist_config: true,
      focus_results: false,
      error_time: None,
    }
  }

  /// Keep theme changes in memory only.
  #[cfg(test)]
  pub fn without_persistence(mut self) -> Self {
    self.persist_config = false;
    self
  }

  pub fn theme(&self) -> &'static Theme {
    // theme_index is bounded by theme_index() and the modulo in next_theme().
    &THEMES[self.theme_index]
  }

  pub fn view(&self) -> BrowseView<'_> {
    self.browser.view()
  }

  pub fn selected_video(&self) -> Option<&VideoSummary> {
    let selected = self.list_state.selected()?;
    self.browser.view().videos.get(selected)
  }

  /// Something to show in results mode: videos, a pending request, or a failure.
  pub fn has_listing(&self) -> bool {
    let view = self.browser.view();
    !view.videos.is_empty() || view.loading || view.error.is_some()
  }

  /// Set a transient error message with a timestamp for auto-dismiss.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_display_secs)
    {
      self.clear_error();
    }
  }

  fn save_config(&mut self) {
    self.config.theme_name = Some(self.theme().name.to_string());
    if self.persist_config {
      self.config.save();
    }
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.save_config();
  }

  /// Apply finished background work. Called on every UI tick.
  pub fn check_pending(&mut self) {
    if self.browser.poll() {
      self.on_listing_changed();
    }

    if let Some(watch) = self.watch.as_mut()
      && watch.poll()
      && let WatchState::Failed { video_id, message } = watch
    {
      warn!(video_id = %video_id, message = %message, "watch: lookup failed");
    }

    self.expire_error();
  }

  fn on_listing_changed(&mut self) {
    let count = self.browser.view().videos.len();
    self.list_state.select(if count > 0 { Some(0) } else { None });
    if self.focus_results && !self.browser.view().loading {
      self.focus_results = false;
      if self.mode == AppMode::Input && self.has_listing() {
        self.mode = AppMode::Results;
      }
    }
  }

  /// Submit the input line. A blank line shows trending videos.
  pub fn trigger_search(&mut self) {
    self.clear_error();
    self.list_state.select(None);
    self.focus_results = true;
    self.browser.search(&self.input);
  }

  pub fn next_page(&mut self) {
    self.browser.next_page();
  }

  pub fn prev_page(&mut self) {
    self.browser.prev_page();
  }

  /// `r`: retry a failed request, otherwise reload the current page.
  pub fn refresh_or_retry(&mut self) {
    if self.browser.view().error.is_some() {
      self.browser.retry();
    } else {
      self.browser.refresh();
    }
  }

  /// Open the watch panel for the selected result.
  pub fn trigger_watch(&mut self) {
    let Some(video_id) = self.selected_video().map(|v| v.id.clone()) else { return };

    if let Some(watch) = &self.watch
      && watch.video_id() == video_id
      && !matches!(watch, WatchState::Failed { .. })
    {
      self.mode = AppMode::Watch;
      return;
    }

    info!(video_id = %video_id, "watch: loading video details");
    let source = self.browser.source();
    let (tx, rx) = oneshot::channel();
    let id = video_id.clone();
    if let Some(handle) = self.watch_task.take() {
      handle.abort();
    }
    self.watch_task = Some(tokio::spawn(async move {
      let _ = tx.send(source.fetch_video(&id).await);
    }));
    self.watch = Some(WatchState::Loading { video_id, rx });
    self.mode = AppMode::Watch;
  }

  pub fn open_watched_in_browser(&mut self) {
    let Some(watch) = &self.watch else { return };
    let url = watch_url(watch.video_id());
    if let Err(e) = open_in_browser(&url) {
      self.set_error(format!("Failed to open browser: {:#}", e));
    }
  }

  pub fn select_next(&mut self) {
    let count = self.browser.view().videos.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| (i + 1) % count);
      self.list_state.select(Some(i));
    }
  }

  pub fn select_prev(&mut self) {
    let count = self.browser.view().videos.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
      self.list_state.select(Some(i));
    }
  }
}
