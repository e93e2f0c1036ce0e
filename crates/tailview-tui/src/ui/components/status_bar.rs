use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::Theme;

/// Status bar showing keyboard shortcuts on the left and a notice on the right
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    right_text: Option<(String, Style)>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            right_text: None,
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Set text to display on the right side
    pub fn right<S: Into<String>>(mut self, text: S, style: Style) -> Self {
        self.right_text = Some((text.into(), style));
        self
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());

        let mut spans = Vec::new();
        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" ", Theme::status_bar()));
            }
            spans.push(Span::styled(format!("[{}]", key), Theme::status_bar_key()));
            spans.push(Span::styled(desc.to_string(), Theme::status_bar()));
        }

        let line = Line::from(spans);
        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        // The right-hand notice is drawn last and wins over hints it overlaps
        if let Some((text, style)) = self.right_text {
            let width = (text.width() as u16).min(area.width.saturating_sub(1));
            let right_x = area.x + area.width.saturating_sub(width + 1);
            let span = Span::styled(text, Theme::status_bar().patch(style));
            buf.set_span(right_x, area.y, &span, width);
        }
    }
}

/// Hints shown while browsing logs
pub fn viewer_hints() -> Vec<(&'static str, &'static str)> {
    vec![
        ("/", "Search"),
        ("l", "Level"),
        ("[ ]", "Day"),
        ("Space", "Pause"),
        ("c", "Clear"),
        ("r", "Resume"),
        ("e", "Export"),
        ("?", "Help"),
        ("q", "Quit"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, width: u16) -> String {
        (0..width).map(|x| buf[(x, 0)].symbol().to_string()).collect()
    }

    #[test]
    fn test_renders_hints_and_right_text() {
        let area = Rect::new(0, 0, 40, 1);
        let mut buf = Buffer::empty(area);
        StatusBar::new()
            .hints([("q", "Quit")])
            .right("2 logs", Theme::status_bar())
            .render(area, &mut buf);

        let text = row(&buf, 40);
        assert!(text.starts_with(" [q]Quit"));
        assert!(text.trim_end().ends_with("2 logs"));
    }
}
