use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{mastery, path, tree};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Tree", "Mastery", "Path"];

    let tabs = Tabs::new(tab_titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" coursegraph: {} ", app.course_name)),
        )
        .select(app.view.index())
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Tree => tree::draw(f, app, area),
        View::Mastery => mastery::draw(f, app, area),
        View::Path => path::draw(f, app, area),
    }
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));

    let mut spans = vec![
        key("h/l"),
        Span::raw(" Views  "),
        key("j/k"),
        Span::raw(" Nav  "),
        key("g/G"),
        Span::raw(" Top/Bot  "),
    ];
    if app.view == View::Path {
        spans.extend(vec![key("s"), Span::raw(" Save path  ")]);
    }
    spans.extend(vec![
        key("^r"),
        Span::raw(" Refresh  "),
        key("q"),
        Span::raw(" Quit"),
    ]);

    if let Some(msg) = &app.status_message {
        spans.push(Span::raw("  | "));
        spans.push(Span::styled(msg.as_str(), Style::default().fg(Color::Yellow)));
    }

    let help = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    f.render_widget(help, area);
}
