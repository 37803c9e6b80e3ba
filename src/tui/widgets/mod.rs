pub mod mastery;
pub mod path;
pub mod tree;

use ratatui::style::Color;

use coursegraph::models::PointType;

pub fn type_color(point_type: PointType) -> Color {
    match point_type {
        PointType::Concept => Color::Blue,
        PointType::Skill => Color::Green,
        PointType::Application => Color::Magenta,
    }
}

// Filled blocks out of `width`, for a 0-100 value
pub fn progress_bar(value: f64, width: usize) -> String {
    let filled = ((value.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
