use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::constants::constants;
use crate::error::{Operation, QueryError, RemoteCause};
use crate::format::parse_iso8601_duration;
use crate::player::VideoDetails;

const DETAIL_PARTS: &str = "snippet,statistics,contentDetails";

/// Opaque page cursor issued by the API. Only ever compared by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken(String);

impl PageToken {
  pub fn new(raw: impl Into<String>) -> Self {
    Self(raw.into())
  }

  /// The API omits the field or sends `""` when there is no such page.
  pub fn from_wire(raw: Option<String>) -> Option<Self> {
    raw.filter(|s| !s.is_empty()).map(Self)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for PageToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Statistics and length for one video, as returned by the detail lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoDetail {
  pub view_count: Option<u64>,
  pub duration_seconds: Option<u64>,
}

/// A listing entry before enrichment. Trending entries carry `detail` inline;
/// search hits never do.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
  pub id: String,
  pub title: String,
  pub channel_name: String,
  pub published_at: DateTime<Utc>,
  pub thumbnail_url: String,
  pub detail: Option<VideoDetail>,
}

/// One page of a trending or search listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
  pub items: Vec<RawItem>,
  pub forward_token: Option<PageToken>,
  pub backward_token: Option<PageToken>,
  /// Service-reported and approximate.
  pub total_results: Option<u64>,
}

/// The three read-only query shapes plus the single-video lookup behind the
/// watch panel.
#[async_trait]
pub trait VideoSource: Send + Sync {
  /// Most-popular chart for the configured region, details included.
  async fn fetch_trending(&self, token: Option<&PageToken>) -> Result<PageResult, QueryError>;

  /// Keyword matches in relevance order. Items have no `detail`.
  async fn fetch_search_matches(&self, keyword: &str, token: Option<&PageToken>) -> Result<PageResult, QueryError>;

  /// Statistics and duration for up to `detail_batch_limit` ids. Callers chunk larger sets.
  async fn fetch_details_batch(&self, ids: &[String]) -> Result<HashMap<String, VideoDetail>, QueryError>;

  async fn fetch_video(&self, id: &str) -> Result<VideoDetails, QueryError>;
}

// --- Wire format ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
  #[serde(default = "Vec::new")]
  items: Vec<T>,
  next_page_token: Option<String>,
  prev_page_token: Option<String>,
  page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
  total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
  id: SearchId,
  snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
  video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
  id: String,
  snippet: Snippet,
  statistics: Option<Statistics>,
  content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
  title: Option<String>,
  channel_title: Option<String>,
  published_at: DateTime<Utc>,
  description: Option<String>,
  #[serde(default)]
  thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
  default: Option<Thumbnail>,
  medium: Option<Thumbnail>,
  high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
  url: String,
}

/// Counts arrive as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
  view_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
  duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
  error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
  message: String,
}

impl Snippet {
  fn title(&self) -> String {
    self.title.clone().filter(|t| !t.is_empty()).unwrap_or_else(|| "Untitled Video".to_string())
  }

  fn channel_name(&self) -> String {
    self.channel_title.clone().filter(|t| !t.is_empty()).unwrap_or_else(|| "Unknown Channel".to_string())
  }

  fn thumbnail_url(&self) -> String {
    let t = &self.thumbnails;
    t.medium.as_ref().or(t.default.as_ref()).or(t.high.as_ref()).map(|t| t.url.clone()).unwrap_or_default()
  }
}

impl VideoItem {
  fn detail(&self) -> VideoDetail {
    VideoDetail {
      view_count: self.statistics.as_ref().and_then(|s| s.view_count.as_deref()).and_then(|v| v.parse().ok()),
      // A present but unreadable length (live streams send `P0D`) still shows as 0:00.
      duration_seconds: self
        .content_details
        .as_ref()
        .and_then(|c| c.duration.as_deref())
        .map(|d| parse_iso8601_duration(d).map_or(0, |p| p.total_seconds())),
    }
  }

  fn into_raw(self) -> RawItem {
    let detail = self.detail();
    RawItem {
      title: self.snippet.title(),
      channel_name: self.snippet.channel_name(),
      published_at: self.snippet.published_at,
      thumbnail_url: self.snippet.thumbnail_url(),
      id: self.id,
      detail: Some(detail),
    }
  }

  fn into_details(self) -> VideoDetails {
    let detail = self.detail();
    VideoDetails {
      title: self.snippet.title(),
      channel_name: self.snippet.channel_name(),
      published_at: self.snippet.published_at,
      thumbnail_url: self.snippet.thumbnail_url(),
      description: self.snippet.description.unwrap_or_default(),
      view_count: detail.view_count,
      duration_seconds: detail.duration_seconds,
      id: self.id,
    }
  }
}

impl<T> ListResponse<T> {
  fn into_page(self, convert: impl Fn(T) -> Option<RawItem>) -> PageResult {
    PageResult {
      items: self.items.into_iter().filter_map(convert).collect(),
      forward_token: PageToken::from_wire(self.next_page_token),
      backward_token: PageToken::from_wire(self.prev_page_token),
      total_results: self.page_info.and_then(|p| p.total_results),
    }
  }
}

fn search_page(response: ListResponse<SearchItem>) -> PageResult {
  // Channel and playlist hits have no videoId; they are not videos.
  response.into_page(|item| {
    let id = item.id.video_id.filter(|id| !id.is_empty())?;
    Some(RawItem {
      id,
      title: item.snippet.title(),
      channel_name: item.snippet.channel_name(),
      published_at: item.snippet.published_at,
      thumbnail_url: item.snippet.thumbnail_url(),
      detail: None,
    })
  })
}

fn trending_page(response: ListResponse<VideoItem>) -> PageResult {
  response.into_page(|item| Some(item.into_raw()))
}

fn detail_map(response: ListResponse<VideoItem>) -> HashMap<String, VideoDetail> {
  response.items.into_iter().map(|item| (item.id.clone(), item.detail())).collect()
}

/// Pull the human-readable message out of an API error body, if it has one.
fn api_error_message(body: &str) -> Option<String> {
  serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error.message).filter(|m| !m.is_empty())
}

// --- HTTP client ---

/// YouTube Data API v3 client. The API key travels only as a query parameter
/// and is never logged.
pub struct YouTubeClient {
  http: Client,
  base_url: Url,
  api_key: String,
  region_code: String,
}

impl YouTubeClient {
  /// `timeout` is an optional whole-request limit; when it fires the query
  /// fails like any other network error.
  pub fn new(api_key: String, region_code: String, timeout: Option<Duration>) -> Result<Self> {
    let mut builder = Client::builder().user_agent(concat!("ytb/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let http = builder.build().context("Failed to build HTTP client")?;
    let base_url = Url::parse(&constants().api_base_url).context("Invalid api_base_url in constants.ron")?;
    Ok(Self { http, base_url, api_key, region_code })
  }

  #[cfg(test)]
  fn with_base_url(mut self, base_url: &str) -> Result<Self> {
    self.base_url = Url::parse(base_url).context("Invalid base URL")?;
    Ok(self)
  }

  fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Url {
    let mut url = self.base_url.clone();
    let full_path = format!("{}/{}", self.base_url.path().trim_end_matches('/'), path);
    url.set_path(&full_path);
    url.query_pairs_mut().extend_pairs(params).append_pair("key", &self.api_key);
    url
  }

  fn trending_url(&self, token: Option<&PageToken>) -> Url {
    let page_size = constants().page_size.to_string();
    let mut params = vec![
      ("part", DETAIL_PARTS),
      ("chart", "mostPopular"),
      ("regionCode", self.region_code.as_str()),
      ("maxResults", page_size.as_str()),
    ];
    if let Some(token) = token {
      params.push(("pageToken", token.as_str()));
    }
    self.endpoint("videos", &params)
  }

  fn search_url(&self, keyword: &str, token: Option<&PageToken>) -> Url {
    let page_size = constants().page_size.to_string();
    let mut params = vec![
      ("part", "snippet"),
      ("type", "video"),
      ("q", keyword),
      ("maxResults", page_size.as_str()),
      ("order", constants().search_order.as_str()),
    ];
    if let Some(token) = token {
      params.push(("pageToken", token.as_str()));
    }
    self.endpoint("search", &params)
  }

  fn videos_url(&self, ids: &str) -> Url {
    self.endpoint("videos", &[("part", DETAIL_PARTS), ("id", ids)])
  }

  async fn get_json<T: DeserializeOwned>(&self, operation: Operation, url: Url) -> Result<T, QueryError> {
    debug!(%operation, path = url.path(), "youtube: request");
    // without_url(): the URL carries the API key.
    let response =
      self.http.get(url).send().await.map_err(|e| QueryError::remote(operation, e.without_url()))?;
    let status = response.status();
    let body = response.text().await.map_err(|e| QueryError::remote(operation, e.without_url()))?;

    if !status.is_success() {
      let message = api_error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
      return Err(QueryError::remote(operation, RemoteCause::Status { status: status.as_u16(), message }));
    }
    serde_json::from_str(&body).map_err(|e| QueryError::remote(operation, e))
  }
}

#[async_trait]
impl VideoSource for YouTubeClient {
  async fn fetch_trending(&self, token: Option<&PageToken>) -> Result<PageResult, QueryError> {
    let response = self.get_json(Operation::Trending, self.trending_url(token)).await?;
    Ok(trending_page(response))
  }

  async fn fetch_search_matches(&self, keyword: &str, token: Option<&PageToken>) -> Result<PageResult, QueryError> {
    let response = self.get_json(Operation::Search, self.search_url(keyword, token)).await?;
    Ok(search_page(response))
  }

  async fn fetch_details_batch(&self, ids: &[String]) -> Result<HashMap<String, VideoDetail>, QueryError> {
    debug_assert!(ids.len() <= constants().detail_batch_limit, "detail batch must be chunked by the caller");
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let response = self.get_json(Operation::Details, self.videos_url(&ids.join(","))).await?;
    Ok(detail_map(response))
  }

  async fn fetch_video(&self, id: &str) -> Result<VideoDetails, QueryError> {
    let response: ListResponse<VideoItem> = self.get_json(Operation::Video, self.videos_url(id)).await?;
    response
      .items
      .into_iter()
      .next()
      .map(VideoItem::into_details)
      .ok_or_else(|| QueryError::VideoNotFound(id.to_string()))
  }
}
