use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::constants::constants;
use crate::enrich::{VideoSummary, enrich};
use crate::error::QueryError;
use crate::format::format_thousands;
use crate::session::{FetchRequest, PageOutcome, Query, QuerySession, Ticket};
use crate::youtube::{PageResult, VideoSource};

/// A settled request: the ticket sequence number and what came back.
type Completion = (u64, Result<PageOutcome, QueryError>);

/// What the UI renders.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseView<'a> {
  pub videos: &'a [VideoSummary],
  pub loading: bool,
  pub error: Option<&'a str>,
  pub search_query: &'a str,
  pub current_page: usize,
  pub has_next_page: bool,
  pub has_prev_page: bool,
  pub total_results: Option<u64>,
}

impl BrowseView<'_> {
  /// `Showing 26-50 of 1,000 results`, or `Page 2` when the total is unknown.
  pub fn page_summary(&self) -> String {
    let per_page = constants().page_size as u64;
    match self.total_results.filter(|&t| t > 0) {
      Some(total) => {
        let page = self.current_page as u64;
        let start = (page - 1) * per_page + 1;
        let end = (page * per_page).min(total);
        format!("Showing {}-{} of {} results", start, end, format_thousands(total))
      }
      None => format!("Page {}", self.current_page),
    }
  }
}

/// Run one page fetch: a single listing call for trending, listing plus
/// detail enrichment for search.
pub async fn fetch_page(source: &dyn VideoSource, request: &FetchRequest) -> Result<PageOutcome, QueryError> {
  let token = request.token.as_ref();
  let (page, videos): (PageResult, Vec<VideoSummary>) = match &request.query {
    Query::Trending => {
      let mut page = source.fetch_trending(token).await?;
      let items = std::mem::take(&mut page.items);
      (page, items.into_iter().map(|item| VideoSummary::from_raw(item, None)).collect())
    }
    Query::Search(keyword) => {
      let mut page = source.fetch_search_matches(keyword, token).await?;
      let items = std::mem::take(&mut page.items);
      (page, enrich(source, items).await)
    }
  };
  Ok(PageOutcome {
    videos,
    forward_token: page.forward_token,
    backward_token: page.backward_token,
    total_results: page.total_results,
  })
}

/// Drives a [`QuerySession`] against a [`VideoSource`].
///
/// Each request runs on its own task and reports back through a channel; the
/// session decides whether the reply is still wanted. Starting a request
/// aborts the previous one, so an old cycle never issues further calls.
pub struct Browser {
  source: Arc<dyn VideoSource>,
  session: QuerySession,
  tx: mpsc::UnboundedSender<Completion>,
  rx: mpsc::UnboundedReceiver<Completion>,
  in_flight: Option<JoinHandle<()>>,
}

impl Browser {
  pub fn new(source: Arc<dyn VideoSource>) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { source, session: QuerySession::new(), tx, rx, in_flight: None }
  }

  pub fn source(&self) -> Arc<dyn VideoSource> {
    Arc::clone(&self.source)
  }

  pub fn view(&self) -> BrowseView<'_> {
    BrowseView {
      videos: self.session.videos(),
      loading: self.session.is_loading(),
      error: self.session.error(),
      search_query: self.session.query().keyword(),
      current_page: self.session.page_index(),
      has_next_page: self.session.has_next(),
      has_prev_page: self.session.has_prev(),
      total_results: self.session.total_results(),
    }
  }

  pub fn search(&mut self, input: &str) {
    let ticket = self.session.submit_search(input);
    info!(query = %ticket.request.query.keyword(), "browser: search submitted");
    self.dispatch(ticket);
  }

  pub fn next_page(&mut self) {
    if let Some(ticket) = self.session.advance() {
      self.dispatch(ticket);
    }
  }

  pub fn prev_page(&mut self) {
    if let Some(ticket) = self.session.retreat() {
      self.dispatch(ticket);
    }
  }

  pub fn refresh(&mut self) {
    let ticket = self.session.refresh();
    self.dispatch(ticket);
  }

  pub fn retry(&mut self) {
    if let Some(ticket) = self.session.retry() {
      self.dispatch(ticket);
    }
  }

  fn dispatch(&mut self, ticket: Ticket) {
    if let Some(handle) = self.in_flight.take()
      && !handle.is_finished()
    {
      debug!(superseded_by = ticket.seq, "browser: aborting superseded request");
      handle.abort();
    }
    let source = Arc::clone(&self.source);
    let tx = self.tx.clone();
    self.in_flight = Some(tokio::spawn(async move {
      let outcome = fetch_page(source.as_ref(), &ticket.request).await;
      let _ = tx.send((ticket.seq, outcome));
    }));
  }

  /// Apply every completion that has already arrived. Returns true if the
  /// session changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok((seq, outcome)) = self.rx.try_recv() {
      changed |= self.apply(seq, outcome);
    }
    changed
  }

  fn apply(&mut self, seq: u64, outcome: Result<PageOutcome, QueryError>) -> bool {
    let applied = self.session.apply(seq, outcome);
    if applied {
      let s = &self.session;
      debug!(
        page = s.page_index(),
        history = s.token_history().len(),
        next = ?s.forward_token(),
        prev = ?s.backward_token(),
        "browser: page state"
      );
    }
    applied
  }

  /// Wait for the next completion and apply it. Returns whether it was current.
  #[cfg(test)]
  pub async fn wait_completion(&mut self) -> bool {
    match self.rx.recv().await {
      Some((seq, outcome)) => self.apply(seq, outcome),
      // Unreachable while `self.tx` is alive.
      None => false,
    }
  }

  /// Wait until the latest request has settled.
  #[cfg(test)]
  pub async fn settle(&mut self) {
    while self.session.is_loading() {
      self.wait_completion().await;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::FakeSource;

  fn ids(browser: &Browser) -> Vec<String> {
    browser.view().videos.iter().map(|v| v.id.clone()).collect()
  }

  fn browser(source: &Arc<FakeSource>) -> Browser {
    Browser::new(Arc::clone(source) as Arc<dyn VideoSource>)
  }

  #[tokio::test]
  async fn trending_loads_without_detail_lookup() {
    let source = Arc::new(FakeSource::new().with_page(None, None, &["t1", "t2"], Some("T2")));
    let mut b = browser(&source);

    b.search("");
    assert!(b.view().loading);
    b.settle().await;

    assert_eq!(ids(&b), ["t1", "t2"]);
    assert_eq!(b.view().videos[0].view_count, Some(1_000));
    assert!(b.view().has_next_page);
    assert!(!b.view().has_prev_page);
    assert_eq!(source.calls(), ["trending:"]);
  }

  #[tokio::test]
  async fn trending_pages_never_enrich() {
    let source = Arc::new(
      FakeSource::new().with_page(None, None, &["t1"], Some("T2")).with_page(None, Some("T2"), &["t2"], None),
    );
    let mut b = browser(&source);
    b.refresh();
    b.settle().await;
    b.next_page();
    b.settle().await;
    b.prev_page();
    b.settle().await;

    assert!(source.detail_batches().is_empty());
    assert_eq!(source.calls(), ["trending:", "trending:T2", "trending:"]);
  }

  #[tokio::test]
  async fn search_enriches_results() {
    let source = Arc::new(
      FakeSource::new()
        .with_page(Some("rust"), None, &["A", "B", "C"], None)
        .with_detail("A", 5, 50)
        .with_detail("C", 7, 70),
    );
    let mut b = browser(&source);

    b.search("  rust ");
    b.settle().await;

    let view = b.view();
    assert_eq!(view.search_query, "rust");
    assert_eq!(view.videos.len(), 3);
    assert_eq!(view.videos[0].view_count, Some(5));
    assert_eq!(view.videos[1].view_count, None);
    assert_eq!(view.videos[2].duration_seconds, Some(70));
    assert_eq!(source.calls(), ["search:rust:", "details:3"]);
  }

  #[tokio::test]
  async fn empty_search_result_is_not_an_error() {
    let source = Arc::new(FakeSource::new());
    let mut b = browser(&source);

    b.search("nothing matches");
    b.settle().await;

    let view = b.view();
    assert!(view.videos.is_empty());
    assert_eq!(view.error, None);
    assert!(!view.loading);
    assert_eq!(source.calls(), ["search:nothing matches:"]);
  }

  #[tokio::test]
  async fn pagination_round_trip() {
    let source = Arc::new(
      FakeSource::new()
        .with_page(Some("cats"), None, &["c1"], Some("N2"))
        .with_page(Some("cats"), Some("N2"), &["c2"], Some("N3"))
        .with_page(Some("cats"), Some("N3"), &["c3"], None),
    );
    let mut b = browser(&source);
    b.search("cats");
    b.settle().await;
    b.next_page();
    b.settle().await;
    b.next_page();
    b.settle().await;

    assert_eq!(ids(&b), ["c3"]);
    assert_eq!(b.view().current_page, 3);
    assert!(!b.view().has_next_page);

    b.next_page();
    assert!(!b.view().loading);

    b.prev_page();
    b.settle().await;
    assert_eq!(ids(&b), ["c2"]);
    assert_eq!(b.view().current_page, 2);
  }

  #[tokio::test]
  async fn late_reply_from_superseded_request_is_discarded() {
    let source = Arc::new(
      FakeSource::new()
        .with_page(Some("q"), None, &["first"], Some("P2"))
        .with_page(Some("q"), Some("P2"), &["second"], Some("P3")),
    );
    let mut b = browser(&source);
    b.search("q");
    b.settle().await;

    let release = source.hold(Some("q"), Some("P2"));
    b.next_page();
    b.prev_page();
    b.settle().await;
    assert_eq!(ids(&b), ["first"]);

    // The page-2 task was aborted; releasing it must not change anything.
    let _ = release.send(());
    for _ in 0..10 {
      tokio::task::yield_now().await;
    }
    assert!(!b.poll());

    assert_eq!(ids(&b), ["first"]);
    assert_eq!(b.view().current_page, 1);
    assert!(b.view().has_next_page);
  }

  #[tokio::test]
  async fn superseded_search_issues_no_detail_lookup() {
    let source = Arc::new(
      FakeSource::new()
        .with_page(Some("old"), None, &["o1", "o2"], None)
        .with_page(Some("new"), None, &["n1"], None),
    );
    let release = source.hold(Some("old"), None);
    let mut b = browser(&source);

    b.search("old");
    while source.calls().is_empty() {
      tokio::task::yield_now().await;
    }
    b.search("new");
    b.settle().await;

    let _ = release.send(());
    for _ in 0..10 {
      tokio::task::yield_now().await;
    }
    assert!(!b.poll());
    assert_eq!(ids(&b), ["n1"]);
    assert_eq!(source.calls(), ["search:old:", "search:new:", "details:1"]);
  }

  #[tokio::test]
  async fn failure_clears_videos_and_retry_reissues_same_request() {
    let source = Arc::new(
      FakeSource::new()
        .with_page(None, None, &["t1"], Some("T2"))
        .with_page(None, Some("T2"), &["t2"], None)
        .failing_page(None, Some("T2")),
    );
    let mut b = browser(&source);
    b.refresh();
    b.settle().await;
    b.next_page();
    b.settle().await;

    let view = b.view();
    assert!(view.videos.is_empty());
    assert_eq!(view.error, Some("Failed to load popular videos"));
    assert_eq!(view.current_page, 2);

    b.retry();
    b.settle().await;
    assert_eq!(source.calls(), ["trending:", "trending:T2", "trending:T2"]);
    assert_eq!(b.view().current_page, 2);
    assert_eq!(b.view().error, Some("Failed to load popular videos"));
  }

  #[tokio::test]
  async fn refresh_keeps_position() {
    let source = Arc::new(
      FakeSource::new()
        .with_page(Some("k"), None, &["k1"], Some("K2"))
        .with_page(Some("k"), Some("K2"), &["k2"], None),
    );
    let mut b = browser(&source);
    b.search("k");
    b.settle().await;
    b.next_page();
    b.settle().await;

    b.refresh();
    b.settle().await;

    assert_eq!(b.view().current_page, 2);
    assert_eq!(b.view().search_query, "k");
    assert_eq!(ids(&b), ["k2"]);
    assert_eq!(source.calls().last().map(String::as_str), Some("details:1"));
    assert!(source.calls().contains(&"search:k:K2".to_string()));
  }

  #[tokio::test]
  async fn poll_applies_ready_completions() {
    let source = Arc::new(FakeSource::new().with_page(None, None, &["t1"], None));
    let mut b = browser(&source);
    b.refresh();
    while !b.poll() {
      tokio::task::yield_now().await;
    }
    assert_eq!(ids(&b), ["t1"]);
    assert!(!b.poll());
  }

  // --- page_summary ---

  fn view_for(page: usize, total: Option<u64>) -> BrowseView<'static> {
    BrowseView {
      videos: &[],
      loading: false,
      error: None,
      search_query: "",
      current_page: page,
      has_next_page: false,
      has_prev_page: false,
      total_results: total,
    }
  }

  #[test]
  fn page_summary_with_total() {
    assert_eq!(view_for(1, Some(1_000_000)).page_summary(), "Showing 1-25 of 1,000,000 results");
    assert_eq!(view_for(2, Some(1_000)).page_summary(), "Showing 26-50 of 1,000 results");
  }

  #[test]
  fn page_summary_clamps_to_total() {
    assert_eq!(view_for(2, Some(30)).page_summary(), "Showing 26-30 of 30 results");
  }

  #[test]
  fn page_summary_without_total() {
    assert_eq!(view_for(3, None).page_summary(), "Page 3");
    assert_eq!(view_for(3, Some(0)).page_summary(), "Page 3");
  }
}
