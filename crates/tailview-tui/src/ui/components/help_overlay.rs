use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::ui::{Layout, Theme};

/// Help overlay showing keybindings
pub struct HelpOverlay;

impl HelpOverlay {
    pub fn render(frame: &mut Frame) {
        let popup_area = Layout::centered(frame.area(), 52, 34);

        frame.render_widget(Clear, popup_area);

        let help_text = vec![
            Line::from(Span::styled(
                "Keybindings",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Self::section("Navigation (newest at top)"),
            Self::key_line("j/↓", "Scroll to older"),
            Self::key_line("k/↑", "Scroll to newer"),
            Self::key_line("Ctrl+d", "Page down"),
            Self::key_line("Ctrl+u", "Page up"),
            Self::key_line("g", "Newest entry"),
            Self::key_line("G", "Oldest entry (loads more)"),
            Line::from(""),
            Self::section("Stream"),
            Self::key_line("Space/p", "Pause / unpause live view"),
            Self::key_line("c", "Clear display"),
            Self::key_line("r", "Resume display"),
            Self::key_line("R", "Retry failed fetch"),
            Self::key_line("Ctrl+r", "Reload current day"),
            Line::from(""),
            Self::section("Filters"),
            Self::key_line("/", "Search messages"),
            Self::key_line("n", "Clear search"),
            Self::key_line("l", "Cycle level filter"),
            Self::key_line("[ / ]", "Previous / next day"),
            Self::key_line("T", "Today"),
            Line::from(""),
            Self::section("Other"),
            Self::key_line("t", "Toggle timestamps"),
            Self::key_line("s", "Toggle stats bar"),
            Self::key_line("e", "Export view to file"),
            Self::key_line("D", "Delete server logs for day"),
            Self::key_line("?", "Toggle this help"),
            Self::key_line("q", "Quit"),
        ];

        let help_widget = Paragraph::new(help_text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Theme::PRIMARY))
                .title(Span::styled(" Help ", Theme::title())),
        );

        frame.render_widget(help_widget, popup_area);
    }

    fn section(title: &str) -> Line<'_> {
        Line::from(Span::styled(title, Style::default().fg(Color::Yellow)))
    }

    fn key_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!("  {:>8}", key), Style::default().fg(Color::Green)),
            Span::styled(format!("  {}", desc), Style::default().fg(Color::White)),
        ])
    }
}
