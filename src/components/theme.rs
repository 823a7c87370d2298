use tourney_api::MatchState;
use tui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThemeColor {
    /// Box outlines and connectors.
    Primary,
    /// Selection highlight.
    Accent,
    Dim,
    Winner,
    Text,
    /// Match waiting on a winner declaration.
    InFlight,
    Alert,
}

pub fn resolve(color: ThemeColor) -> Style {
    match color {
        ThemeColor::Primary => Style::default().fg(Color::Rgb(0, 122, 195)),
        ThemeColor::Accent => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ThemeColor::Dim => Style::default().fg(Color::Indexed(240)),
        ThemeColor::Winner => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ThemeColor::Text => Style::default().fg(Color::White),
        ThemeColor::InFlight => Style::default().fg(Color::Rgb(255, 103, 31)),
        ThemeColor::Alert => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

/// Foreground color only, for canvas shapes which take a bare `Color`.
pub fn color(color: ThemeColor) -> Color {
    resolve(color).fg.unwrap_or(Color::Reset)
}

pub fn state_color(state: MatchState) -> ThemeColor {
    match state {
        MatchState::Pending => ThemeColor::Dim,
        MatchState::Ready => ThemeColor::Text,
        MatchState::Decided => ThemeColor::Winner,
    }
}
