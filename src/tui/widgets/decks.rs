use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let title = match &app.current_shelf {
        Some(shelf) => format!(" {} ", shelf.name),
        None => " Decks ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    if app.decks.items.is_empty() {
        let paragraph = Paragraph::new("This shelf has no decks yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .decks
        .items
        .iter()
        .map(|overview| {
            // Decks never trained show no due count
            let (due_text, due_color) = match overview.due_count {
                Some(0) => ("0".to_string(), Color::Green),
                Some(n) => (n.to_string(), Color::Yellow),
                None => ("-".to_string(), Color::DarkGray),
            };
            let session = if overview.session_id.is_some() {
                "continue"
            } else {
                ""
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<36}", truncate(&overview.deck.name, 34)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>6}", overview.card_count),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(format!("{:>6}  ", due_text), Style::default().fg(due_color)),
                Span::styled(session, Style::default().fg(Color::Cyan)),
            ]))
        })
        .collect();

    let bold = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header = Line::from(vec![
        Span::styled(format!("{:<36}", "Deck"), bold),
        Span::styled(format!("{:>6}", "Cards"), bold),
        Span::styled(format!("{:>6}  ", "Due"), bold),
        Span::styled("Session", bold),
    ]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.decks.selected);

    let header_area = Rect {
        x: area.x + 3,
        y: area.y + 1,
        width: area.width.saturating_sub(4),
        height: 1,
    };
    f.render_widget(Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };
    f.render_stateful_widget(list, list_area, &mut state);
}
