use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{decks, shelves, training};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_status(f, app, chunks[2]);
    draw_help_bar(f, app, chunks[3]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Shelves", "Decks", "Training"];
    let selected = match app.view {
        View::Shelves => 0,
        View::Decks => 1,
        View::Training => 2,
    };

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" Pamiętacz "))
        .select(selected)
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
        View::Shelves => shelves::draw(f, app, area),
        View::Decks => decks::draw(f, app, area),
        View::Training => training::draw(f, app, area),
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let text = app.status.as_deref().unwrap_or("");
    let status = Paragraph::new(text).style(Style::default().fg(Color::Green));
    f.render_widget(status, area);
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let key = Style::default().fg(Color::Cyan);

    let mut spans = match app.view {
        View::Shelves => vec![
            Span::styled("j/k", key),
            Span::raw(" Nav  "),
            Span::styled("g/G", key),
            Span::raw(" Top/Bot  "),
            Span::styled("l/<CR>", key),
            Span::raw(" Open  "),
            Span::styled("^r", key),
            Span::raw(" Refresh  "),
        ],
        View::Decks => vec![
            Span::styled("h/<Esc>", key),
            Span::raw(" Back  "),
            Span::styled("j/k", key),
            Span::raw(" Nav  "),
            Span::styled("l/<CR>", key),
            Span::raw(" Train  "),
            Span::styled("a", key),
            Span::raw(" Train all  "),
            Span::styled("^r", key),
            Span::raw(" Refresh  "),
        ],
        View::Training => {
            let revealed = app.training.as_ref().is_some_and(|t| t.revealed);
            if revealed {
                vec![
                    Span::styled("g", key),
                    Span::raw(" Good  "),
                    Span::styled("b", key),
                    Span::raw(" Bad  "),
                    Span::styled("h/<Esc>", key),
                    Span::raw(" Pause  "),
                ]
            } else {
                vec![
                    Span::styled("<Space>", key),
                    Span::raw(" Reveal  "),
                    Span::styled("h/<Esc>", key),
                    Span::raw(" Pause  "),
                ]
            }
        }
    };

    spans.extend(vec![Span::styled("q", key), Span::raw(" Quit")]);

    let help = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
