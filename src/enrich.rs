use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::constants::constants;
use crate::youtube::{RawItem, VideoDetail, VideoSource};

/// One catalog entry as displayed. Replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSummary {
  pub id: String,
  pub title: String,
  pub channel_name: String,
  pub published_at: DateTime<Utc>,
  pub thumbnail_url: String,
  pub view_count: Option<u64>,
  pub duration_seconds: Option<u64>,
}

impl VideoSummary {
  pub fn from_raw(item: RawItem, detail: Option<VideoDetail>) -> Self {
    let detail = detail.or(item.detail).unwrap_or_default();
    Self {
      id: item.id,
      title: item.title,
      channel_name: item.channel_name,
      published_at: item.published_at,
      thumbnail_url: item.thumbnail_url,
      view_count: detail.view_count,
      duration_seconds: detail.duration_seconds,
    }
  }
}

/// Join search hits with their statistics and durations.
///
/// Ids are looked up in batches of at most `detail_batch_limit`. A batch that
/// fails only leaves its own items without counts; no item is ever dropped and
/// input order is kept. An empty input issues no request.
pub async fn enrich(source: &dyn VideoSource, items: Vec<RawItem>) -> Vec<VideoSummary> {
  if items.is_empty() {
    return Vec::new();
  }

  let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
  let limit = constants().detail_batch_limit.max(1);
  // Owned chunks: a closure over borrowed slices is not general enough for tokio::spawn.
  let chunks: Vec<Vec<String>> = ids.chunks(limit).map(<[String]>::to_vec).collect();

  let batches: Vec<HashMap<String, VideoDetail>> = stream::iter(chunks)
    .map(|chunk| async move {
      match source.fetch_details_batch(&chunk).await {
        Ok(details) => {
          if details.len() < chunk.len() {
            debug!(requested = chunk.len(), found = details.len(), "enrich: partial detail batch");
          }
          details
        }
        Err(e) => {
          warn!(err = %e, ids = chunk.len(), "enrich: detail batch failed, leaving items unenriched");
          HashMap::new()
        }
      }
    })
    .buffered(constants().detail_batch_concurrency.max(1))
    .collect()
    .await;

  let details: HashMap<String, VideoDetail> = batches.into_iter().flatten().collect();
  items
    .into_iter()
    .map(|item| {
      let detail = details.get(&item.id).copied();
      VideoSummary::from_raw(item, detail)
    })
    .collect()
}
