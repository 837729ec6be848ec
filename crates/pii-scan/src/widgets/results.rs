use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Cell, Row, Table, TableState},
    Frame,
};

use super::category_color;
use crate::AppState;

pub struct ResultsWidget;

impl ResultsWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let header = Row::new(vec!["Column", "Category", "Conf", "Tokens", "Cost", "Samples"])
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );

        let mut rows: Vec<Row> = state
            .results
            .iter()
            .map(|result| {
                let category = result.classification();
                Row::new(vec![
                    Cell::from(result.column_name().to_string()),
                    Cell::from(Span::styled(
                        category.to_string(),
                        Style::default()
                            .fg(category_color(category))
                            .add_modifier(Modifier::BOLD),
                    )),
                    Cell::from(format!("{:.2}", result.confidence())),
                    Cell::from(format!("{}", result.cost().total_tokens())),
                    Cell::from(format!("${:.6}", result.cost().total_cost_usd())),
                    Cell::from(result.samples().join(", ")),
                ])
            })
            .collect();

        // Columns still waiting for the model
        for column in state.columns.iter().skip(state.results.len()) {
            rows.push(
                Row::new(vec![
                    Cell::from(column.column_name().to_string()),
                    Cell::from("pending"),
                    Cell::from("-"),
                    Cell::from("-"),
                    Cell::from("-"),
                    Cell::from(column.samples().join(", ")),
                ])
                .style(Style::default().fg(Color::DarkGray)),
            );
        }

        let widths = [
            Constraint::Percentage(20),
            Constraint::Length(11),
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Min(10),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::bordered().title("Columns"))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");

        let mut table_state = TableState::default();
        if !state.results.is_empty() {
            table_state.select(Some(state.selected));
        }

        frame.render_stateful_widget(table, area, &mut table_state);
    }
}
