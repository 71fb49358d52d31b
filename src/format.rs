//! Display formatting for counts, durations and publish dates.
//!
//! These mirror the strings users see on the web client, so the rounding and
//! bucketing rules are exact rather than "close enough".

use chrono::{DateTime, Utc};

const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Abbreviate a view count: `1500000` → `1.5M`, `2300` → `2.3K`, `999` → `999`.
///
/// One decimal place of the floating-point quotient. Quotients that land
/// exactly on a half (e.g. `1.25`) round up; everything else rounds to the
/// nearest tenth of the binary value, so `1150` reads `1.1K`.
pub fn format_view_count(count: u64) -> String {
  let (divisor, suffix) = if count >= 1_000_000 {
    (1_000_000u64, "M")
  } else if count >= 1_000 {
    (1_000u64, "K")
  } else {
    return count.to_string();
  };

  // count / divisor == halves / 20; an odd multiple of 5 is an exact binary half.
  let twenty = count * 20;
  if twenty % divisor == 0 {
    let halves = twenty / divisor;
    if halves % 2 == 1 && halves % 5 == 0 {
      let tenths = halves.div_ceil(2);
      return format!("{}.{}{}", tenths / 10, tenths % 10, suffix);
    }
  }
  format!("{:.1}{}", count as f64 / divisor as f64, suffix)
}

/// Hour/minute/second components of an ISO-8601 `PT#H#M#S` duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationParts {
  pub hours: u64,
  pub minutes: u64,
  pub seconds: u64,
}

impl DurationParts {
  pub fn total_seconds(self) -> u64 {
    self.hours.saturating_mul(3600).saturating_add(self.minutes.saturating_mul(60)).saturating_add(self.seconds)
  }
}

/// Parse the `PT#H#M#S` form the API uses for video lengths.
///
/// Reads from the first `PT`, taking each of H, M, S in that order when
/// present and stopping at the first component that does not fit. Text
/// without `PT` (day-based `P1DT…`, live-stream `P0D`) yields `None`.
pub fn parse_iso8601_duration(raw: &str) -> Option<DurationParts> {
  let start = raw.find("PT")?;
  let mut rest = &raw[start + 2..];
  let mut parts = DurationParts::default();

  for unit in ['H', 'M', 'S'] {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || !rest[digits..].starts_with(unit) {
      continue;
    }
    let value = rest[..digits].parse().unwrap_or(u64::MAX);
    match unit {
      'H' => parts.hours = value,
      'M' => parts.minutes = value,
      _ => parts.seconds = value,
    }
    rest = &rest[digits + 1..];
  }
  Some(parts)
}

/// Render an ISO-8601 duration as `H:MM:SS` or `M:SS`; unparsable input is `0:00`.
///
/// The client stores parsed seconds, so the UI goes through [`format_duration_secs`].
#[allow(dead_code)]
pub fn format_duration(raw: &str) -> String {
  match parse_iso8601_duration(raw) {
    Some(parts) => format_parts(parts),
    None => "0:00".to_string(),
  }
}

/// Render a length in seconds the same way as [`format_duration`].
pub fn format_duration_secs(total: u64) -> String {
  format_parts(DurationParts { hours: total / 3600, minutes: total % 3600 / 60, seconds: total % 60 })
}

fn format_parts(parts: DurationParts) -> String {
  if parts.hours > 0 {
    format!("{}:{:02}:{:02}", parts.hours, parts.minutes, parts.seconds)
  } else {
    format!("{}:{:02}", parts.minutes, parts.seconds)
  }
}

/// Relative age of a publish timestamp: days under a week, then weeks, months
/// (30 days) and years (365 days). Partial days round up.
pub fn format_published_date(published_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let millis = (now - published_at).num_milliseconds().unsigned_abs();
  let days = millis.div_ceil(MILLIS_PER_DAY);

  if days == 1 {
    "1 day ago".to_string()
  } else if days < 7 {
    format!("{} days ago", days)
  } else if days < 30 {
    plural(days / 7, "week")
  } else if days < 365 {
    plural(days / 30, "month")
  } else {
    plural(days / 365, "year")
  }
}

fn plural(n: u64, unit: &str) -> String {
  if n == 1 { format!("1 {} ago", unit) } else { format!("{} {}s ago", n, unit) }
}

/// Group digits with commas: `1234567` → `1,234,567`.
pub fn format_thousands(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}
