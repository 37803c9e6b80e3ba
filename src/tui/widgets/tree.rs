use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::type_color;
use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let selected = app
        .tree
        .selected_item()
        .map(|row| format!(" #{}", row.id))
        .unwrap_or_default();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " Knowledge Tree ({} points){} ",
            app.tree.items.len(),
            selected
        ))
        .title_style(Style::default().fg(Color::Cyan));

    if app.tree.items.is_empty() {
        let paragraph = Paragraph::new("No knowledge points in this course yet.").block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .tree
        .items
        .iter()
        .map(|row| {
            let marker = if row.has_children { "▾ " } else { "  " };
            let indent = "  ".repeat(row.depth);
            let name = truncate(&row.name, 40usize.saturating_sub(row.depth * 2));

            ListItem::new(Line::from(vec![
                Span::raw(indent),
                Span::styled(marker, Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{:<42}", name), Style::default().fg(Color::White)),
                Span::styled(
                    format!("{:<12}", row.point_type.label()),
                    Style::default().fg(type_color(row.point_type)),
                ),
                Span::styled(
                    format!("D{} ", row.difficulty),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!("{}m", row.estimated_time),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.tree.selected);
    f.render_stateful_widget(list, area, &mut state);
}
