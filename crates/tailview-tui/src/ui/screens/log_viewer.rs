use std::borrow::Cow;

use ratatui::{
    Frame,
    layout::{Alignment, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use tailview_logs::{Clock, LogFilter, StreamController, StreamStatus, sanitize_message};
use tailview_types::{ConnectionState, LogEntry, StreamMode};

use crate::app::AppState;
use crate::ui::components::{StatusBar, viewer_hints};
use crate::ui::{Layout, Theme};

/// Log viewer screen
pub struct LogViewerScreen;

impl LogViewerScreen {
    pub fn render<C: Clock>(frame: &mut Frame, state: &mut AppState, controller: &StreamController<C>) {
        let status = controller.status();
        let show_filter_bar = state.ui_state.search_active || !controller.filter().pattern().is_empty();
        let areas = Layout::viewer(frame.area(), state.ui_state.stats_visible, show_filter_bar);

        Self::render_header(frame, areas.header, controller, &status);
        if let Some(area) = areas.stats {
            Self::render_stats_bar(frame, area, controller);
        }
        if let Some(area) = areas.filter {
            Self::render_filter_bar(frame, area, state, controller.filter());
        }
        Self::render_logs(frame, areas.logs, state, controller, &status);
        Self::render_status_bar(frame, areas.status, state, &status);
    }

    fn render_header<C: Clock>(frame: &mut Frame, area: Rect, controller: &StreamController<C>, status: &StreamStatus) {
        let date = if status.date == controller.today() {
            format!("{} (today)", status.date)
        } else {
            status.date.to_string()
        };

        let push = if controller.is_subscribed() {
            Span::styled(format!("● {}", status.push.label()), Theme::connection(status.push))
        } else {
            Span::styled("○ push off", Theme::text_dim())
        };

        let title = Line::from(vec![
            Span::styled("tailview", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(date, Theme::text_highlight()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(format!(" {} ", status.mode.label()), Theme::mode(status.mode)),
            Span::styled(" │ ", Theme::text_dim()),
            push,
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(
                format!("history: {}", status.backfill.label()),
                Theme::backfill(status.backfill),
            ),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(
                format!("level: {}", controller.filter_state().level.label()),
                Theme::text(),
            ),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState, filter: &LogFilter) {
        let mut spans = vec![];

        if state.ui_state.search_active {
            spans.push(Span::styled(
                " /",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                sanitize_message(&state.ui_state.search_input).into_owned(),
                Theme::text_highlight(),
            ));
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
            spans.push(Span::styled("  [Enter] Apply  [Esc] Cancel", Theme::text_dim()));
        } else {
            spans.push(Span::styled(" Search: ", Theme::text_dim()));
            spans.push(Span::styled(
                sanitize_message(filter.pattern()).into_owned(),
                Theme::text_highlight(),
            ));
            spans.push(Span::styled("  [n] Clear  [/] Edit", Theme::text_dim()));
        }

        let filter_bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(if state.ui_state.search_active {
                    Theme::border_focused()
                } else {
                    Theme::border()
                })
                .title(Span::styled(" Search (case-insensitive) ", Theme::title())),
        );

        frame.render_widget(filter_bar, area);
    }

    fn render_logs<C: Clock>(
        frame: &mut Frame,
        area: Rect,
        state: &mut AppState,
        controller: &StreamController<C>,
        status: &StreamStatus,
    ) {
        let view = controller.visible();
        let shown = view.shown();

        // Calculate visible area (accounting for border)
        let inner_height = area.height.saturating_sub(2) as usize;
        state.ui_state.viewport_height = inner_height.max(1);
        state.clamp_scroll(shown);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border())
            .title(Span::styled(Self::logs_title(view.total_filtered, shown, status), Theme::title()));

        if let Some(notice) = Self::empty_notice(status, view.total_filtered, shown) {
            let paragraph = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(notice, Theme::text_dim()))])
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        // Available width for a row (borders and scrollbar)
        let inner_width = area.width.saturating_sub(4) as usize;
        let lines: Vec<Line> = view
            .entries
            .iter()
            .skip(state.ui_state.log_scroll)
            .take(inner_height)
            .map(|entry| format_log_line(entry, controller.filter(), state.ui_state.show_timestamps, inner_width))
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);

        if shown > inner_height {
            let max_scroll = shown.saturating_sub(inner_height);
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(state.ui_state.log_scroll.min(max_scroll));

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    fn logs_title(total_filtered: usize, shown: usize, status: &StreamStatus) -> String {
        let mut title = if status.mode == StreamMode::Cleared {
            format!(" Logs ({} buffered) ", total_filtered)
        } else if total_filtered > shown {
            format!(" Logs (showing latest {} of {}) ", shown, total_filtered)
        } else {
            format!(" Logs ({}) ", total_filtered)
        };
        if status.over_capacity {
            title.push_str(&format!("[{} stored, over cap] ", status.stored));
        }
        if status.skipped_duplicates > 0 {
            title.push_str(&format!("[{} duplicates skipped] ", status.skipped_duplicates));
        }
        title
    }

    fn empty_notice(status: &StreamStatus, total_filtered: usize, shown: usize) -> Option<String> {
        if status.mode == StreamMode::Cleared {
            return Some(format!("Display cleared ({} entries buffered). Press r to resume.", total_filtered));
        }
        if shown > 0 {
            return None;
        }
        Some(match status.mode {
            StreamMode::Initializing => "Loading logs…".to_string(),
            StreamMode::Live if status.push != ConnectionState::Connected => "Waiting for the live stream…".to_string(),
            _ if status.stored > 0 => "No entries match the current filters.".to_string(),
            _ => "No logs for this day.".to_string(),
        })
    }

    fn render_stats_bar<C: Clock>(frame: &mut Frame, area: Rect, controller: &StreamController<C>) {
        let counts = controller.store().level_counts();

        let mut spans = vec![Span::styled(" ", Theme::text())];
        let mut push_count = |label: &'static str, color: Color, count: usize, always: bool| {
            if always || count > 0 {
                spans.push(Span::styled(
                    label,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::styled(format!("{} ", count), Theme::text()));
            }
        };
        push_count("FTL:", Color::Magenta, counts.fatal, false);
        push_count("ERR:", Color::Red, counts.error, true);
        push_count("WRN:", Color::Yellow, counts.warn, true);
        push_count("INF:", Color::Green, counts.info, true);
        push_count("DBG:", Color::Cyan, counts.debug, true);
        push_count("TRC:", Color::DarkGray, counts.trace, false);
        push_count("OTHER:", Color::White, counts.other, false);

        spans.push(Span::styled("│ ", Theme::text_dim()));
        spans.push(Span::styled("Stored:", Theme::text_dim()));
        spans.push(Span::styled(
            format!("{}/{}", counts.total(), controller.store().capacity()),
            Theme::text(),
        ));

        let stats_widget = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(" Stats ", Theme::title())),
        );

        frame.render_widget(stats_widget, area);
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, status: &StreamStatus) {
        let bar = StatusBar::new();

        let bar = if state.ui_state.confirm_delete {
            bar.hints([("y", "Delete"), ("any", "Cancel")]).right(
                format!("Delete all server logs for {}? ", status.date),
                Theme::error(),
            )
        } else if let Some(err) = state.ui_state.error_message.as_ref().or(status.last_error.as_ref()) {
            bar.hints([("R", "Retry"), ("Esc", "Dismiss")])
                .right(format!("⚠ {} ", sanitize_message(err)), Theme::error())
        } else if let Some(msg) = &state.ui_state.status_message {
            bar.hints(viewer_hints()).right(format!("{} ", msg), Theme::status_bar())
        } else {
            bar.hints(viewer_hints())
                .right(format!("{} stored ", status.stored), Theme::status_bar())
        };

        frame.render_widget(bar, area);
    }
}

/// Format a log entry into a single display row
fn format_log_line(entry: &LogEntry, filter: &LogFilter, show_timestamps: bool, available_width: usize) -> Line<'static> {
    let mut spans = Vec::new();
    let mut prefix_width = 0;

    if show_timestamps {
        let ts = sanitize_message(&entry.display_timestamp);
        let ts = truncate_to_width(&ts, 19);
        prefix_width += ts.width() + 1;
        spans.push(Span::styled(format!("{} ", ts), Theme::text_dim()));
    }

    spans.push(Span::styled(format!("{:>3}", entry.level.as_str()), Theme::level(&entry.level)));
    spans.push(Span::styled(" │ ", Theme::text_dim()));
    prefix_width += 6;

    let message = sanitize_message(&entry.message);
    let message = truncate_to_width(&message, available_width.saturating_sub(prefix_width)).into_owned();
    let base_style = Theme::message(&entry.level);

    let mut last_end = 0;
    for (start, end) in filter.find_matches(&message) {
        if start > last_end {
            spans.push(Span::styled(message[last_end..start].to_string(), base_style));
        }
        spans.push(Span::styled(message[start..end].to_string(), Theme::search_match()));
        last_end = end;
    }
    if last_end < message.len() {
        spans.push(Span::styled(message[last_end..].to_string(), base_style));
    }

    Line::from(spans)
}

/// Cut `s` to at most `max_width` terminal columns, marking the cut with `…`
fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if s.width() <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max_width - 1 {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('…');
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tailview_types::{BackfillState, FilterState, LogLevel};

    fn status(mode: StreamMode) -> StreamStatus {
        StreamStatus {
            mode,
            primary_mode: mode,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            push: ConnectionState::Connected,
            backfill: BackfillState::Idle,
            stored: 10,
            over_capacity: false,
            skipped_duplicates: 0,
            last_error: None,
        }
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        // Wide characters take two columns
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn test_title_discloses_truncation() {
        assert_eq!(
            LogViewerScreen::logs_title(3000, 1500, &status(StreamMode::Live)),
            " Logs (showing latest 1500 of 3000) "
        );
        assert_eq!(LogViewerScreen::logs_title(12, 12, &status(StreamMode::Live)), " Logs (12) ");
    }

    #[test]
    fn test_title_discloses_over_capacity() {
        let mut status = status(StreamMode::Historical);
        status.over_capacity = true;
        status.stored = 2200;
        assert!(LogViewerScreen::logs_title(2200, 1500, &status).contains("2200 stored, over cap"));
    }

    #[test]
    fn test_cleared_notice_reports_buffer() {
        let notice = LogViewerScreen::empty_notice(&status(StreamMode::Cleared), 42, 0).unwrap();
        assert!(notice.contains("42 entries buffered"));
        assert!(LogViewerScreen::empty_notice(&status(StreamMode::Live), 5, 5).is_none());
    }

    #[test]
    fn test_line_is_sanitized_and_highlighted() {
        let mut filter_state = FilterState::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        filter_state.search = "DISK".to_string();
        let filter = LogFilter::compile(&filter_state);

        let entry = LogEntry::new(LogLevel::Warn, "\x1b[31mdisk full", "10:00:00");
        let line = format_log_line(&entry, &filter, true, 80);

        let text = line_text(&line);
        assert!(!text.contains('\x1b'));
        assert!(text.starts_with("10:00:00 WRN │ "));
        assert!(line.spans.iter().any(|s| s.content == "disk" && s.style == Theme::search_match()));
    }
}
