use ratatui::style::{Color, Modifier, Style};

use tailview_types::{BackfillState, ConnectionState, LogLevel, StreamMode};

/// Color theme for the application
pub struct Theme;

impl Theme {
    // Base colors
    pub const BG: Color = Color::Reset;
    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;

    // Accent colors
    pub const PRIMARY: Color = Color::Cyan;
    pub const HIGHLIGHT: Color = Color::Yellow;

    // Status colors
    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    // Border styles
    pub fn border() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::HIGHLIGHT)
    }

    // Text styles
    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::FG)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn text_highlight() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Search match inside a message
    pub fn search_match() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Message text, tinted for the louder levels
    pub fn message(level: &LogLevel) -> Style {
        match level {
            LogLevel::Error | LogLevel::Fatal => Style::default().fg(Self::ERROR),
            LogLevel::Warn => Style::default().fg(Self::WARNING),
            _ => Style::default().fg(Self::FG),
        }
    }

    pub fn level(level: &LogLevel) -> Style {
        Style::default()
            .fg(level.color())
            .add_modifier(Modifier::BOLD)
    }

    pub fn mode(mode: StreamMode) -> Style {
        let color = match mode {
            StreamMode::Live => Self::SUCCESS,
            StreamMode::Paused => Self::WARNING,
            StreamMode::Cleared => Color::Magenta,
            StreamMode::Historical => Color::Blue,
            StreamMode::Initializing => Self::FG_DIM,
        };
        Style::default()
            .fg(Color::Black)
            .bg(color)
            .add_modifier(Modifier::BOLD)
    }

    pub fn connection(state: ConnectionState) -> Style {
        match state {
            ConnectionState::Connected => Style::default().fg(Self::SUCCESS),
            ConnectionState::Connecting => Style::default().fg(Self::WARNING),
            ConnectionState::Disconnected => Style::default().fg(Self::ERROR),
        }
    }

    pub fn backfill(state: BackfillState) -> Style {
        match state {
            BackfillState::Idle => Self::text_dim(),
            BackfillState::Loading => Style::default().fg(Self::PRIMARY),
            BackfillState::Exhausted => Self::text_dim(),
            BackfillState::Failed => Style::default().fg(Self::ERROR),
        }
    }

    // Status bar
    pub fn status_bar() -> Style {
        Style::default().fg(Self::FG).bg(Color::DarkGray)
    }

    pub fn status_bar_key() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    // Error
    pub fn error() -> Style {
        Style::default()
            .fg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }
}
