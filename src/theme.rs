use ratatui::style::Color;

/// Palette for every styled element in the UI.
#[derive(Debug)]
pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Crimson",
    bg: Color::Rgb(24, 24, 27),
    fg: Color::Rgb(228, 228, 231),
    accent: Color::Rgb(255, 68, 68),
    muted: Color::Rgb(130, 130, 140),
    border: Color::Rgb(63, 63, 70),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(127, 29, 29),
    stripe_bg: Color::Rgb(32, 32, 36),
    status: Color::Rgb(250, 204, 21),
    error: Color::Rgb(248, 113, 113),
    key_fg: Color::Rgb(24, 24, 27),
    key_bg: Color::Rgb(161, 161, 170),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 248, 243),
    fg: Color::Rgb(40, 40, 46),
    accent: Color::Rgb(196, 30, 58),
    muted: Color::Rgb(120, 116, 110),
    border: Color::Rgb(210, 204, 194),
    highlight_fg: Color::Rgb(250, 248, 243),
    highlight_bg: Color::Rgb(196, 30, 58),
    stripe_bg: Color::Rgb(242, 238, 230),
    status: Color::Rgb(180, 110, 0),
    error: Color::Rgb(185, 28, 28),
    key_fg: Color::Rgb(250, 248, 243),
    key_bg: Color::Rgb(90, 86, 80),
  },
  Theme {
    name: "Pastel",
    bg: Color::Rgb(40, 42, 54),
    fg: Color::Rgb(236, 230, 245),
    accent: Color::Rgb(255, 160, 190),
    muted: Color::Rgb(150, 145, 175),
    border: Color::Rgb(84, 80, 110),
    highlight_fg: Color::Rgb(40, 42, 54),
    highlight_bg: Color::Rgb(180, 220, 250),
    stripe_bg: Color::Rgb(46, 48, 62),
    status: Color::Rgb(200, 240, 190),
    error: Color::Rgb(255, 140, 140),
    key_fg: Color::Rgb(40, 42, 54),
    key_bg: Color::Rgb(210, 190, 240),
  },
];

/// Index of the theme called `name`, falling back to the first one.
pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(n))).unwrap_or(0)
}
