use pii_column_classifier::{CostCalculator, PiiCategory};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph},
    Frame,
};

use super::{category_color, centered_rect};
use crate::AppState;

pub struct SummaryPopupWidget;

impl SummaryPopupWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let popup_area = centered_rect(60, 80, area);

        frame.render_widget(Clear, popup_area);

        let summary_text = Self::create_summary_text(state);

        let popup = Paragraph::new(summary_text)
            .block(
                Block::bordered()
                    .title("Scan Summary")
                    .title_alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Cyan)),
            )
            .alignment(Alignment::Left);

        frame.render_widget(popup, popup_area);
    }

    fn create_summary_text(state: &AppState) -> Vec<Line> {
        let spent = state.get_spent_cost();
        let breakdown = state.get_category_breakdown();

        let mut summary_text = vec![
            Line::from(vec![
                Span::styled("Columns Scanned: ", Style::default().fg(Color::White)),
                Span::styled(
                    format!("{} / {}", state.completed_columns(), state.total_columns()),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("Spent: ", Style::default().fg(Color::White)),
                Span::styled(
                    CostCalculator::format_cost_display(&spent),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("Estimated: ", Style::default().fg(Color::White)),
                Span::styled(
                    CostCalculator::format_cost_display(&state.estimate),
                    Style::default().fg(Color::Cyan),
                ),
            ]),
            Line::from(" "),
            Line::from(vec![Span::styled(
                "Categories:",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(" "),
        ];

        for category in PiiCategory::ALL {
            let Some(count) = breakdown.get(&category) else {
                continue;
            };
            let columns: Vec<&str> = state
                .results
                .iter()
                .filter(|result| result.classification() == category)
                .map(|result| result.column_name())
                .collect();

            summary_text.push(Line::from(vec![
                Span::styled("  ", Style::default()),
                Span::styled(
                    format!("{:<11}", category.as_str()),
                    Style::default()
                        .fg(category_color(category))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" {:>3}  {}", count, columns.join(", ")),
                    Style::default().fg(Color::White),
                ),
            ]));
        }

        if breakdown.is_empty() {
            summary_text.push(Line::from(Span::styled(
                "  No columns classified yet",
                Style::default().fg(Color::Gray),
            )));
        }

        summary_text.extend(vec![
            Line::from(" "),
            Line::from(vec![
                Span::styled("Press ", Style::default().fg(Color::Gray)),
                Span::styled(
                    "s",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(" to close", Style::default().fg(Color::Gray)),
            ]),
        ]);

        summary_text
    }
}
