use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use coursegraph::planner::LearningPathPlan;

use super::type_color;
use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recommended Path ")
        .title_style(Style::default().fg(Color::Cyan));

    if let Some(err) = &app.plan_error {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            err.as_str(),
            Style::default().fg(Color::Red),
        )))
        .block(block)
        .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        return;
    }

    let Some(plan) = app.plan.as_ref().filter(|p| !p.is_empty()) else {
        let paragraph = Paragraph::new("No gaps to close: nothing to plan.").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    draw_summary(f, plan, chunks[0]);

    let items: Vec<ListItem> = app
        .plan_rows
        .items
        .iter()
        .map(|row| {
            let p = &row.point;
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("S{:<3}", row.stage + 1),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!("{:<32}", truncate(&p.name, 30)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:<12}", p.point_type.label()),
                    Style::default().fg(type_color(p.point_type)),
                ),
                Span::styled(
                    format!("now {:>3.0}%  gap {:>3.0}%  ", p.current_mastery * 100.0, p.gap * 100.0),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    format!("{}m", p.estimated_time),
                    Style::default().fg(Color::Cyan),
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
    state.select(app.plan_rows.selected);
    f.render_stateful_widget(list, chunks[1], &mut state);
}

fn draw_summary(f: &mut Frame, plan: &LearningPathPlan, area: Rect) {
    let mut lines = vec![Line::from(vec![
        Span::styled("Stages: ", Style::default().fg(Color::Gray)),
        Span::styled(plan.stages.len().to_string(), Style::default().fg(Color::White)),
        Span::styled("  Total: ", Style::default().fg(Color::Gray)),
        Span::styled(format!("{} min", plan.total_time), Style::default().fg(Color::White)),
        Span::styled("  Match: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{:.0}%", plan.match_score * 100.0),
            Style::default().fg(Color::Green),
        ),
    ])];

    if let Some(stage) = plan.stages.first() {
        lines.push(Line::from(vec![
            Span::styled("Now: ", Style::default().fg(Color::Gray)),
            Span::styled(stage.focus.as_str(), Style::default().fg(Color::Yellow)),
        ]));
    }
    if !plan.deferred.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("{} point(s) deferred by the time budget", plan.deferred.len()),
            Style::default().fg(Color::Red),
        )));
    }

    let block = Block::default().borders(Borders::ALL).title(" Summary ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}
