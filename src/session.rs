//! Browsing session: which query is active, which page is shown, and how to
//! reach the neighbouring pages.
//!
//! The session never performs I/O. Every navigation call that needs data hands
//! back a [`Ticket`]; the caller runs the fetch and reports the outcome with
//! [`QuerySession::apply`]. Each ticket carries a sequence number and only the
//! most recently issued one may move the session out of `Loading`, so a slow
//! reply to a superseded request can never overwrite a newer page.

use tracing::{debug, info, warn};

use crate::enrich::VideoSummary;
use crate::error::QueryError;
use crate::youtube::PageToken;

/// The active query: the trending chart, or a keyword search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
  Trending,
  Search(String),
}

impl Query {
  /// Blank or whitespace-only input means trending.
  pub fn from_input(input: &str) -> Self {
    let keyword = input.trim();
    if keyword.is_empty() { Query::Trending } else { Query::Search(keyword.to_string()) }
  }

  /// The search keyword, or `""` for trending.
  pub fn keyword(&self) -> &str {
    match self {
      Query::Trending => "",
      Query::Search(keyword) => keyword,
    }
  }

  fn failure_message(&self) -> &'static str {
    match self {
      Query::Trending => "Failed to load popular videos",
      Query::Search(_) => "Failed to search videos",
    }
  }
}

/// Everything needed to fetch one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
  pub query: Query,
  /// 1-based.
  pub page_index: usize,
  /// `None` for the first page.
  pub token: Option<PageToken>,
}

/// A request the caller must run, tagged with its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
  pub seq: u64,
  pub request: FetchRequest,
}

/// A successfully fetched page, already enriched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOutcome {
  pub videos: Vec<VideoSummary>,
  pub forward_token: Option<PageToken>,
  pub backward_token: Option<PageToken>,
  pub total_results: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
  Idle,
  Loading { ticket: Ticket },
  Loaded { videos: Vec<VideoSummary> },
  /// `request` is what failed; retrying re-issues it unchanged.
  Failed { message: String, request: FetchRequest },
}

#[derive(Debug)]
pub struct QuerySession {
  state: SessionState,
  query: Query,
  page_index: usize,
  /// `token_history[i]` produced page `i + 1`. Page 1 is always `None`.
  token_history: Vec<Option<PageToken>>,
  forward_token: Option<PageToken>,
  backward_token: Option<PageToken>,
  total_results: Option<u64>,
  last_seq: u64,
}

impl Default for QuerySession {
  fn default() -> Self {
    Self::new()
  }
}

impl QuerySession {
  pub fn new() -> Self {
    Self {
      state: SessionState::Idle,
      query: Query::Trending,
      page_index: 1,
      token_history: vec![None],
      forward_token: None,
      backward_token: None,
      total_results: None,
      last_seq: 0,
    }
  }

  // --- Accessors ---

  #[cfg(test)]
  pub fn state(&self) -> &SessionState {
    &self.state
  }

  pub fn query(&self) -> &Query {
    &self.query
  }

  pub fn page_index(&self) -> usize {
    self.page_index
  }

  pub fn token_history(&self) -> &[Option<PageToken>] {
    &self.token_history
  }

  pub fn forward_token(&self) -> Option<&PageToken> {
    self.forward_token.as_ref()
  }

  pub fn backward_token(&self) -> Option<&PageToken> {
    self.backward_token.as_ref()
  }

  pub fn total_results(&self) -> Option<u64> {
    self.total_results
  }

  pub fn has_next(&self) -> bool {
    self.forward_token.is_some()
  }

  pub fn has_prev(&self) -> bool {
    self.page_index > 1
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.state, SessionState::Loading { .. })
  }

  pub fn videos(&self) -> &[VideoSummary] {
    match &self.state {
      SessionState::Loaded { videos } => videos,
      _ => &[],
    }
  }

  pub fn error(&self) -> Option<&str> {
    match &self.state {
      SessionState::Failed { message, .. } => Some(message),
      _ => None,
    }
  }

  // --- Navigation ---

  /// Start a new query at page 1 with a fresh token history. Blank input
  /// switches to trending.
  pub fn submit_search(&mut self, input: &str) -> Ticket {
    self.query = Query::from_input(input);
    self.page_index = 1;
    self.token_history = vec![None];
    self.total_results = None;
    self.issue(None)
  }

  /// Move to the next page. No-op without a forward token.
  pub fn advance(&mut self) -> Option<Ticket> {
    let token = self.forward_token.clone()?;
    self.page_index += 1;
    let slot = self.page_index - 1;
    if slot < self.token_history.len() {
      self.token_history[slot] = Some(token.clone());
    } else {
      self.token_history.push(Some(token.clone()));
    }
    Some(self.issue(Some(token)))
  }

  /// Move to the previous page using the recorded token. No-op on page 1.
  pub fn retreat(&mut self) -> Option<Ticket> {
    if !self.has_prev() {
      return None;
    }
    self.page_index -= 1;
    let token = self.current_token();
    Some(self.issue(token))
  }

  /// Re-issue the current query and page with its recorded token.
  pub fn refresh(&mut self) -> Ticket {
    let token = self.current_token();
    self.issue(token)
  }

  /// Re-issue exactly the request that failed. No-op unless failed.
  pub fn retry(&mut self) -> Option<Ticket> {
    let SessionState::Failed { request, .. } = &self.state else { return None };
    let request = request.clone();
    Some(self.begin(request))
  }

  /// Apply the outcome of ticket `seq`. Outcomes for anything but the latest
  /// ticket are discarded; returns whether the outcome was applied.
  pub fn apply(&mut self, seq: u64, outcome: Result<PageOutcome, QueryError>) -> bool {
    let SessionState::Loading { ticket } = &self.state else {
      debug!(seq, "session: discarding response, nothing in flight");
      return false;
    };
    if ticket.seq != seq {
      debug!(seq, current = ticket.seq, "session: discarding stale response");
      return false;
    }

    match outcome {
      Ok(page) => {
        info!(seq, page = self.page_index, videos = page.videos.len(), "session: page loaded");
        self.forward_token = page.forward_token;
        self.backward_token = page.backward_token;
        self.total_results = page.total_results;
        self.state = SessionState::Loaded { videos: page.videos };
      }
      Err(e) => {
        warn!(seq, page = self.page_index, err = %e, "session: page failed");
        let request = ticket.request.clone();
        self.state = SessionState::Failed { message: request.query.failure_message().to_string(), request };
      }
    }
    true
  }

  fn current_token(&self) -> Option<PageToken> {
    self.token_history.get(self.page_index - 1).cloned().flatten()
  }

  fn issue(&mut self, token: Option<PageToken>) -> Ticket {
    let request = FetchRequest { query: self.query.clone(), page_index: self.page_index, token };
    self.begin(request)
  }

  fn begin(&mut self, request: FetchRequest) -> Ticket {
    self.last_seq += 1;
    // Neighbour tokens describe the page on screen, which is gone while loading.
    self.forward_token = None;
    self.backward_token = None;
    let ticket = Ticket { seq: self.last_seq, request };
    debug!(
      seq = ticket.seq,
      query = ?ticket.request.query,
      page = ticket.request.page_index,
      "session: request issued"
    );
    self.state = SessionState::Loading { ticket: ticket.clone() };
    ticket
  }
}
