use pii_column_classifier::{CostCalculator, PiiCategory};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

use crate::AppState;

pub struct StatisticsWidget;

impl StatisticsWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let spent = state.get_spent_cost();
        let pii_count = state.get_pii_count();
        let error_count = state.get_count(PiiCategory::Error);

        let mut stats_text = vec![
            Line::from(vec![
                Span::styled("Scan Status: ", Style::default().fg(Color::White)),
                Span::styled(
                    match state.get_current_column() {
                        Some(column) => format!("Classifying '{}'", column),
                        None if state.is_loading => "Finishing...".to_string(),
                        None => format!("Done in {}s", state.get_elapsed_seconds()),
                    },
                    Style::default()
                        .fg(if state.is_loading {
                            Color::Yellow
                        } else {
                            Color::Green
                        })
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("PII Columns: ", Style::default().fg(Color::White)),
                Span::styled(
                    format!("{}", pii_count),
                    Style::default()
                        .fg(if pii_count > 0 { Color::Red } else { Color::Green })
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        "  unknown {}  failed {}",
                        state.get_count(PiiCategory::Unknown),
                        error_count
                    ),
                    Style::default().fg(if error_count > 0 {
                        Color::Magenta
                    } else {
                        Color::Gray
                    }),
                ),
            ]),
            Line::from(vec![
                Span::styled("Tokens: ", Style::default().fg(Color::White)),
                Span::styled(
                    format!("{}", spent.total_tokens()),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        " (in {} / out {})",
                        spent.input_tokens(),
                        spent.output_tokens()
                    ),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            Line::from(vec![
                Span::styled("Estimate: ", Style::default().fg(Color::White)),
                Span::styled(
                    CostCalculator::format_cost_display(&state.estimate),
                    Style::default().fg(Color::Cyan),
                ),
            ]),
        ];

        if let Some(error) = &state.error_message {
            stats_text.push(Line::from(vec![
                Span::styled("Error: ", Style::default().fg(Color::Red)),
                Span::styled(
                    error.chars().take(50).collect::<String>()
                        + if error.chars().count() > 50 { "..." } else { "" },
                    Style::default().fg(Color::Red),
                ),
            ]));
        } else {
            stats_text.push(Line::from(vec![
                Span::styled("Last Update: ", Style::default().fg(Color::White)),
                Span::styled(
                    state.last_update.format("%H:%M:%S UTC").to_string(),
                    Style::default().fg(Color::Cyan),
                ),
            ]));
        }

        let stats = Paragraph::new(stats_text)
            .block(Block::bordered().title("Statistics"))
            .alignment(Alignment::Left);

        frame.render_widget(stats, area);
    }
}
