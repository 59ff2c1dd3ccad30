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
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Shelves of {} ", app.user.name))
        .title_style(Style::default().fg(Color::Cyan));

    if app.shelves.items.is_empty() {
        let paragraph = Paragraph::new("No started shelves. Start one with `pamietacz shelf start <id>`.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .shelves
        .items
        .iter()
        .map(|(shelf, due)| {
            let due_color = if *due > 0 { Color::Yellow } else { Color::DarkGray };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<40}", truncate(&shelf.name, 38)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(format!("{:>5}", due), Style::default().fg(due_color)),
            ]))
        })
        .collect();

    let header = Line::from(vec![
        Span::styled(
            format!("{:<40}", "Shelf"),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{:>5}", "Due"),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ),
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
    state.select(app.shelves.selected);

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
