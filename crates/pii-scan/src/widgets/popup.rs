use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Wrap},
    Frame,
};

use super::{category_color, centered_rect};
use crate::AppState;

pub struct PopupWidget;

impl PopupWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let popup_area = centered_rect(70, 70, area);

        // Clear the area first
        frame.render_widget(Clear, popup_area);

        let detail_text = Self::create_column_detail_text(state);

        let title = state
            .selected_result()
            .map(|result| format!("Column '{}'", result.column_name()))
            .unwrap_or_else(|| "Column".to_string());

        let popup = Paragraph::new(detail_text)
            .block(
                Block::bordered()
                    .title(title)
                    .title_alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Cyan)),
            )
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false });

        frame.render_widget(popup, popup_area);
    }

    fn create_column_detail_text(state: &AppState) -> Vec<Line> {
        let Some(result) = state.selected_result() else {
            return vec![Line::from("No column selected")];
        };

        let category = result.classification();
        let cost = result.cost();
        let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::White));

        let mut detail_text = vec![
            Line::from(vec![
                label("Category: "),
                Span::styled(
                    category.to_string(),
                    Style::default()
                        .fg(category_color(category))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" ({})", category.description()),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            Line::from(vec![
                label("Confidence: "),
                Span::styled(
                    format!("{:.2}", result.confidence()),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                label("Input: "),
                Span::styled(
                    format!("{} tokens, ${:.6}", cost.input_tokens(), cost.input_cost_usd()),
                    Style::default().fg(Color::Green),
                ),
            ]),
            Line::from(vec![
                label("Output: "),
                Span::styled(
                    format!("{} tokens, ${:.6}", cost.output_tokens(), cost.output_cost_usd()),
                    Style::default().fg(Color::Green),
                ),
            ]),
            Line::from(vec![
                label("Total: "),
                Span::styled(
                    format!("{} tokens, ${:.6}", cost.total_tokens(), cost.total_cost_usd()),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(" "),
            Line::from(vec![Span::styled(
                "Samples:",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
        ];

        if result.samples().is_empty() {
            detail_text.push(Line::from(Span::styled(
                "  (none)",
                Style::default().fg(Color::Gray),
            )));
        }
        for sample in result.samples() {
            detail_text.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(sample.clone(), Style::default().fg(Color::White)),
            ]));
        }

        detail_text.extend(vec![
            Line::from(" "),
            Line::from(vec![Span::styled(
                "Model Answer:",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
        ]);
        for line in result.reasoning().lines() {
            detail_text.push(Line::from(Span::styled(
                format!("  {}", line),
                Style::default().fg(Color::White),
            )));
        }

        detail_text.extend(vec![
            Line::from(" "),
            Line::from(vec![
                Span::styled("Press ", Style::default().fg(Color::Gray)),
                Span::styled(
                    "Esc",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(" to close", Style::default().fg(Color::Gray)),
            ]),
        ]);

        detail_text
    }
}
