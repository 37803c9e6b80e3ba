use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use coursegraph::mastery::{MasteryLevel, WeaknessLevel};

use super::progress_bar;
use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    draw_records(f, app, chunks[0]);
    draw_weak_points(f, app, chunks[1]);
}

fn level_color(level: MasteryLevel) -> Color {
    match level {
        MasteryLevel::Mastered => Color::Green,
        MasteryLevel::Familiar => Color::Cyan,
        MasteryLevel::Beginner => Color::Yellow,
        MasteryLevel::NotMastered => Color::Red,
    }
}

fn draw_records(f: &mut Frame, app: &App, area: Rect) {
    let report = &app.mastery;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Mastery (overall {:.1}) ", report.overall_mastery))
        .title_style(Style::default().fg(Color::Cyan));

    if report.knowledge_mastery.is_empty() {
        let paragraph = Paragraph::new("No submissions for this course.").block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = report
        .knowledge_mastery
        .iter()
        .map(|r| {
            let level = r.level();
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<22}", truncate(&r.knowledge_point, 20)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(progress_bar(r.progress, 10), Style::default().fg(level_color(level))),
                Span::styled(
                    format!(" {:>5.1} ", r.average_score),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!("{:<13}", level.label()),
                    Style::default().fg(level_color(level)),
                ),
                Span::styled(
                    format!("x{}", r.attempt_count),
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
    state.select(app.mastery_rows.selected);
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_weak_points(f: &mut Frame, app: &App, area: Rect) {
    let weak = &app.weak;
    let mut lines = vec![
        Line::from(Span::styled(
            weak.overall_suggestion.as_str(),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
    ];

    for wp in &weak.weak_points {
        let color = match wp.weakness_level {
            WeaknessLevel::Severe => Color::Red,
            WeaknessLevel::Moderate => Color::LightRed,
            WeaknessLevel::Mild => Color::Yellow,
            WeaknessLevel::Slight => Color::Gray,
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<9}", wp.weakness_level.as_str()),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{} ({:.1})", wp.knowledge_point, wp.average_score)),
        ]));
        lines.push(Line::from(Span::styled(
            format!("  {}; practise {} more", wp.issues.join(", "), wp.suggested_practice),
            Style::default().fg(Color::Gray),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Weak Points ({}) ", weak.total_weak_points))
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}
