use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::AppState;

pub struct ShortcutsWidget;

impl ShortcutsWidget {
    pub fn render(frame: &mut Frame, area: Rect, _state: &AppState) {
        let key = |k: &'static str| {
            Span::styled(
                k,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        };
        let text = |t: &'static str| Span::styled(t, Style::default().fg(Color::Gray));

        let shortcuts_text = vec![Line::from(vec![
            text("Press "),
            key("q"),
            text(" to quit, "),
            key("↑/↓"),
            text(" to select, "),
            key("Enter"),
            text(" for details, "),
            key("s"),
            text(" for summary"),
        ])];

        let shortcuts = Paragraph::new(shortcuts_text).alignment(Alignment::Center);

        frame.render_widget(shortcuts, area);
    }
}
