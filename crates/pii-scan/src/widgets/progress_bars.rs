use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Gauge},
    Frame,
};

use crate::AppState;

pub struct ProgressBarsWidget;

impl ProgressBarsWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let progress_percentage = state.get_progress_percentage();
        let column_gauge = Gauge::default()
            .block(Block::bordered().title("Columns"))
            .gauge_style(if state.is_loading {
                Style::default().fg(Color::Blue)
            } else {
                Style::default().fg(Color::Green)
            })
            .percent(progress_percentage.clamp(0.0, 100.0) as u16)
            .label(format!(
                "{} / {}",
                state.completed_columns(),
                state.total_columns()
            ));

        frame.render_widget(column_gauge, chunks[0]);

        // Estimates are heuristic, so spend can run past 100%
        let spend_percentage = state.get_spend_percentage();
        let spend_gauge = Gauge::default()
            .block(Block::bordered().title("Spend vs Estimate"))
            .gauge_style(if spend_percentage > 100.0 {
                Style::default().fg(Color::Red)
            } else if spend_percentage > 80.0 {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Green)
            })
            .percent(spend_percentage.clamp(0.0, 100.0) as u16)
            .label(format!(
                "${:.6} / ${:.6}",
                state.get_spent_cost().total_cost_usd(),
                state.estimate.total_cost_usd()
            ));

        frame.render_widget(spend_gauge, chunks[1]);
    }
}
