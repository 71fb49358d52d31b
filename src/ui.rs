use chrono::Utc;
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode};
use crate::format::{format_duration_secs, format_published_date, format_view_count};
use crate::player::{VideoDetails, WatchState, embed_url};
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// `1.5M views • 3 days ago • 12:04`, skipping whatever is unknown.
fn meta_line(view_count: Option<u64>, duration_seconds: Option<u64>, age: &str) -> String {
  let mut parts = Vec::with_capacity(3);
  if let Some(views) = view_count {
    parts.push(format!("{} views", format_view_count(views)));
  }
  parts.push(age.to_string());
  if let Some(secs) = duration_seconds {
    parts.push(format_duration_secs(secs));
  }
  parts.join(" • ")
}

fn rounded_block(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, page_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, theme, header_area);
  render_main(frame, app, main_area);
  render_pagination(frame, app, page_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, theme: &Theme, area: Rect) {
  let left = Line::from(Span::styled(" ▶ ytb ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  if app.mode == AppMode::Watch
    && let Some(watch) = &app.watch
  {
    render_watch(frame, app.theme(), watch, area);
  } else if app.has_listing() {
    render_results(frame, app, area);
  } else {
    render_welcome(frame, app.theme(), area);
  }
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  Welcome to ytb", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Browse popular and searched YouTube videos.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled(
      "Type a query and press Enter, or press Enter on an empty line for popular videos.",
      Style::default().fg(theme.muted),
    )),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(rounded_block(theme));
  frame.render_widget(paragraph, area);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let view = app.browser.view();
  let now = Utc::now();
  let selected = app.list_state.selected();

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;

  let items: Vec<ListItem> = view
    .videos
    .iter()
    .enumerate()
    .map(|(i, video)| {
      let is_selected = Some(i) == selected;
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let meta = meta_line(video.view_count, video.duration_seconds, &format_published_date(video.published_at, now));
      let meta_w = meta.chars().count();
      let title_max = inner_w.saturating_sub(meta_w + 2);
      let title = truncate_str(&video.title, title_max);
      let gap = inner_w.saturating_sub(title.chars().count() + meta_w);

      let first = Line::from(vec![
        Span::styled(title, Style::default().fg(fg).add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(gap)),
        Span::styled(meta, Style::default().fg(theme.muted)),
      ]);
      let second = Line::from(Span::styled(truncate_str(&video.channel_name, inner_w), Style::default().fg(theme.muted)));

      ListItem::new(vec![first, second]).bg(bg)
    })
    .collect();

  let title = if view.search_query.is_empty() {
    " Popular Videos ".to_string()
  } else {
    format!(" Search results for \"{}\" ", truncate_str(view.search_query, inner_w.saturating_sub(24)))
  };
  let block = rounded_block(theme)
    .title(title)
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD));

  if items.is_empty() {
    let text = if view.loading {
      "Loading…"
    } else if view.error.is_some() {
      "Nothing to show. Press r to retry."
    } else {
      "No videos found."
    };
    let paragraph =
      Paragraph::new(Line::from(Span::styled(text, Style::default().fg(theme.muted)))).alignment(Alignment::Center);
    frame.render_widget(paragraph.block(block), area);
    return;
  }

  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_watch(frame: &mut Frame, theme: &Theme, watch: &WatchState, area: Rect) {
  let block = rounded_block(theme)
    .title(Span::styled(" Watch ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
    .padding(Padding::horizontal(1));

  let lines = match watch {
    WatchState::Loading { .. } => vec![Line::from(""), Line::from(Span::styled("Loading…", Style::default().fg(theme.status)))],
    WatchState::Failed { message, .. } => {
      vec![Line::from(""), Line::from(Span::styled(message.as_str(), Style::default().fg(theme.error)))]
    }
    WatchState::Ready(details) => watch_lines(theme, details, area.width.saturating_sub(4) as usize),
  };

  frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}

fn watch_lines<'a>(theme: &Theme, details: &'a VideoDetails, inner_w: usize) -> Vec<Line<'a>> {
  let label = |s: &'static str| Span::styled(s, Style::default().fg(theme.muted));
  let age = format_published_date(details.published_at, Utc::now());

  let mut lines = vec![
    Line::from(""),
    Line::from(Span::styled(
      truncate_str(&details.title, inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    Line::from(vec![label("Channel   "), Span::styled(details.channel_name.as_str(), Style::default().fg(theme.fg))]),
    Line::from(vec![
      label("Stats     "),
      Span::styled(meta_line(details.view_count, details.duration_seconds, &age), Style::default().fg(theme.fg)),
    ]),
    Line::from(""),
    Line::from(vec![
      label("Watch     "),
      Span::styled(details.watch_url(), Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED)),
    ]),
    Line::from(vec![label("Embed     "), Span::styled(embed_url(&details.id), Style::default().fg(theme.muted))]),
  ];
  if !details.thumbnail_url.is_empty() {
    lines.push(Line::from(vec![
      label("Thumbnail "),
      Span::styled(details.thumbnail_url.as_str(), Style::default().fg(theme.muted)),
    ]));
  }
  if !details.description.is_empty() {
    lines.push(Line::from(""));
    lines.extend(details.description.lines().map(|l| Line::from(Span::styled(l, Style::default().fg(theme.fg)))));
  }
  lines
}

fn render_pagination(frame: &mut Frame, app: &App, area: Rect) {
  if !app.has_listing() {
    return;
  }
  let theme = app.theme();
  let view = app.browser.view();
  let prev = if view.has_prev_page { "◀ prev" } else { "" };
  let next = if view.has_next_page { "next ▶" } else { "" };
  let line = Line::from(vec![
    Span::styled(format!(" {} ", view.page_summary()), Style::default().fg(theme.muted)),
    Span::styled(format!(" {} ", prev), Style::default().fg(theme.accent)),
    Span::styled(next, Style::default().fg(theme.accent)),
  ]);
  frame.render_widget(line, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let view = app.browser.view();
  let (text, style) = if view.loading {
    (" ⏳ Loading…".to_string(), Style::default().fg(theme.status))
  } else if let Some(err) = view.error {
    (format!(" ⚠  {} (r to retry)", err), Style::default().fg(theme.error))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let border_color = if app.mode == AppMode::Input { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Search YouTube ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if app.mode == AppMode::Input {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn footer_keys(app: &App) -> Vec<(&'static str, &'static str)> {
  let view = app.browser.view();
  match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Search"), ("^t", "Theme")];
      if app.has_listing() {
        k.push(("↓", "Results"));
        k.push(("Esc", "Results"));
      } else {
        k.push(("Esc", "Quit"));
      }
      k
    }
    AppMode::Results => {
      let mut k = vec![("Enter", "Watch"), ("j/k", "Navigate")];
      if view.has_next_page {
        k.push(("n", "Next"));
      }
      if view.has_prev_page {
        k.push(("p", "Prev"));
      }
      k.push(("r", if view.error.is_some() { "Retry" } else { "Refresh" }));
      k.push(("/", "Search"));
      k
    }
    AppMode::Watch => vec![("o", "Open in browser"), ("Esc", "Back"), ("^t", "Theme")],
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys = footer_keys(app);

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncate_short_strings_untouched() {
    assert_eq!(truncate_str("hello", 5), "hello");
    assert_eq!(truncate_str("", 3), "");
  }

  #[test]
  fn truncate_appends_ellipsis() {
    assert_eq!(truncate_str("hello world", 6), "hello…");
    assert_eq!(truncate_str("日本語のタイトル", 4), "日本語…");
  }

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("abc", 2), 2);
    assert_eq!(display_width("日本", 2), 4);
    assert_eq!(display_width("a日", 5), 3);
  }

  #[test]
  fn meta_line_shows_zero_length_for_live_streams() {
    assert_eq!(meta_line(None, Some(0), "1 day ago"), "1 day ago • 0:00");
  }

  #[test]
  fn meta_line_skips_unknown_parts() {
    assert_eq!(meta_line(Some(1_500_000), Some(3723), "3 days ago"), "1.5M views • 3 days ago • 1:02:03");
    assert_eq!(meta_line(None, None, "1 week ago"), "1 week ago");
    assert_eq!(meta_line(Some(999), None, "1 day ago"), "999 views • 1 day ago");
  }
}
