//! TUI widget modules

pub mod header;
pub mod popup;
pub mod progress_bars;
pub mod results;
pub mod shortcuts;
pub mod statistics;
pub mod summary_popup;

pub use header::*;
pub use popup::*;
pub use progress_bars::*;
pub use results::*;
pub use shortcuts::*;
pub use statistics::*;
pub use summary_popup::*;

use pii_column_classifier::PiiCategory;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
};

pub fn category_color(category: PiiCategory) -> Color {
    match category {
        PiiCategory::Ssn | PiiCategory::Email | PiiCategory::Phone => Color::Red,
        PiiCategory::Address | PiiCategory::Dob | PiiCategory::Name | PiiCategory::HashedPii => {
            Color::LightRed
        }
        PiiCategory::NoPii => Color::Green,
        PiiCategory::NoData => Color::Gray,
        PiiCategory::Unknown => Color::Yellow,
        PiiCategory::Error => Color::Magenta,
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
