//! In-memory [`VideoSource`] for exercising the enrichment and session layers.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::oneshot;

use crate::enrich::VideoSummary;
use crate::error::{Operation, QueryError, RemoteCause};
use crate::player::VideoDetails;
use crate::youtube::{PageResult, PageToken, RawItem, VideoDetail, VideoSource};

pub fn raw_item(id: &str) -> RawItem {
  RawItem {
    id: id.to_string(),
    title: format!("Title {}", id),
    channel_name: "Channel".to_string(),
    published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    thumbnail_url: format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", id),
    detail: None,
  }
}

pub fn summary(id: &str) -> VideoSummary {
  VideoSummary::from_raw(raw_item(id), None)
}

/// Key for a scripted listing page: `None` keyword is trending.
type PageKey = (Option<String>, Option<String>);

#[derive(Default)]
pub struct FakeSource {
  pages: HashMap<PageKey, PageResult>,
  failing_pages: HashSet<PageKey>,
  details: HashMap<String, VideoDetail>,
  fail_details: bool,
  videos: HashMap<String, VideoDetails>,
  holds: Mutex<HashMap<PageKey, oneshot::Receiver<()>>>,
  calls: Mutex<Vec<String>>,
  detail_batches: Mutex<Vec<Vec<String>>>,
}

fn fail(operation: Operation) -> QueryError {
  QueryError::remote(operation, RemoteCause::Status { status: 503, message: "scripted failure".into() })
}

fn page_key(keyword: Option<&str>, token: Option<&str>) -> PageKey {
  (keyword.map(str::to_string), token.map(str::to_string))
}

impl FakeSource {
  pub fn new() -> Self {
    Self::default()
  }

  /// Script a listing page. Trending items carry inline details.
  pub fn with_page(mut self, keyword: Option<&str>, token: Option<&str>, ids: &[&str], next: Option<&str>) -> Self {
    let items = ids
      .iter()
      .map(|id| {
        let mut item = raw_item(id);
        if keyword.is_none() {
          item.detail = Some(VideoDetail { view_count: Some(1_000), duration_seconds: Some(60) });
        }
        item
      })
      .collect();
    let page = PageResult {
      items,
      forward_token: next.map(PageToken::new),
      backward_token: token.map(PageToken::new),
      total_results: Some(ids.len() as u64 * 10),
    };
    self.pages.insert(page_key(keyword, token), page);
    self
  }

  pub fn failing_page(mut self, keyword: Option<&str>, token: Option<&str>) -> Self {
    self.failing_pages.insert(page_key(keyword, token));
    self
  }

  pub fn with_detail(mut self, id: &str, views: u64, seconds: u64) -> Self {
    self.details.insert(id.to_string(), VideoDetail { view_count: Some(views), duration_seconds: Some(seconds) });
    self
  }

  pub fn failing_details(mut self) -> Self {
    self.fail_details = true;
    self
  }

  pub fn with_video(mut self, id: &str) -> Self {
    let item = raw_item(id);
    let details = VideoDetails {
      id: item.id.clone(),
      title: item.title,
      channel_name: item.channel_name,
      published_at: item.published_at,
      thumbnail_url: item.thumbnail_url,
      description: format!("About {}", id),
      view_count: Some(42),
      duration_seconds: Some(90),
    };
    self.videos.insert(id.to_string(), details);
    self
  }

  /// Make the listing for (keyword, token) wait until the returned sender fires.
  pub fn hold(&self, keyword: Option<&str>, token: Option<&str>) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel();
    self.holds.lock().unwrap().insert(page_key(keyword, token), rx);
    tx
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  pub fn detail_batches(&self) -> Vec<Vec<String>> {
    self.detail_batches.lock().unwrap().clone()
  }

  async fn listing(&self, operation: Operation, key: PageKey) -> Result<PageResult, QueryError> {
    let hold = self.holds.lock().unwrap().remove(&key);
    if let Some(rx) = hold {
      let _ = rx.await;
    }
    if self.failing_pages.contains(&key) {
      return Err(fail(operation));
    }
    Ok(self.pages.get(&key).cloned().unwrap_or_default())
  }
}

#[async_trait]
impl VideoSource for FakeSource {
  async fn fetch_trending(&self, token: Option<&PageToken>) -> Result<PageResult, QueryError> {
    let token = token.map(PageToken::as_str);
    self.calls.lock().unwrap().push(format!("trending:{}", token.unwrap_or("")));
    self.listing(Operation::Trending, page_key(None, token)).await
  }

  async fn fetch_search_matches(&self, keyword: &str, token: Option<&PageToken>) -> Result<PageResult, QueryError> {
    let token = token.map(PageToken::as_str);
    self.calls.lock().unwrap().push(format!("search:{}:{}", keyword, token.unwrap_or("")));
    self.listing(Operation::Search, page_key(Some(keyword), token)).await
  }

  async fn fetch_details_batch(&self, ids: &[String]) -> Result<HashMap<String, VideoDetail>, QueryError> {
    self.calls.lock().unwrap().push(format!("details:{}", ids.len()));
    self.detail_batches.lock().unwrap().push(ids.to_vec());
    if self.fail_details {
      return Err(fail(Operation::Details));
    }
    Ok(ids.iter().filter_map(|id| self.details.get(id).map(|d| (id.clone(), *d))).collect())
  }

  async fn fetch_video(&self, id: &str) -> Result<VideoDetails, QueryError> {
    self.calls.lock().unwrap().push(format!("video:{}", id));
    self.videos.get(id).cloned().ok_or_else(|| QueryError::VideoNotFound(id.to_string()))
  }
}
