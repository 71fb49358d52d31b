use std::fmt;
use thiserror::Error;

/// Which of the remote query shapes failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Trending,
  Search,
  Details,
  Video,
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Operation::Trending => "trending",
      Operation::Search => "search",
      Operation::Details => "details",
      Operation::Video => "video",
    };
    f.write_str(name)
  }
}

/// Underlying reason a remote query failed.
#[derive(Debug, Error)]
pub enum RemoteCause {
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("HTTP {status}: {message}")]
  Status { status: u16, message: String },

  #[error("malformed payload: {0}")]
  Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum QueryError {
  /// Network, HTTP or decoding failure. Callers do not distinguish further.
  #[error("{operation} query failed: {cause}")]
  RemoteQueryFailed {
    operation: Operation,
    #[source]
    cause: RemoteCause,
  },

  #[error("video not found: {0}")]
  VideoNotFound(String),
}

impl QueryError {
  pub fn remote(operation: Operation, cause: impl Into<RemoteCause>) -> Self {
    QueryError::RemoteQueryFailed { operation, cause: cause.into() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn remote_failure_names_operation_and_cause() {
    let err = QueryError::remote(Operation::Search, RemoteCause::Status { status: 403, message: "quota".into() });
    assert_eq!(err.to_string(), "search query failed: HTTP 403: quota");
    assert!(std::error::Error::source(&err).is_some());
  }

  #[test]
  fn decode_errors_convert_into_cause() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err = QueryError::remote(Operation::Trending, json_err);
    assert!(matches!(
      err,
      QueryError::RemoteQueryFailed { operation: Operation::Trending, cause: RemoteCause::Decode(_) }
    ));
  }

  #[test]
  fn video_not_found_message() {
    assert_eq!(QueryError::VideoNotFound("abc".into()).to_string(), "video not found: abc");
  }
}
