use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::tui::{App, Training};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(training) = &app.training else {
        let block = Block::default().borders(Borders::ALL).title(" Training ");
        let paragraph = Paragraph::new("No training in progress").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Progress
            Constraint::Percentage(50), // Question
            Constraint::Min(0),         // Answer
        ])
        .split(area);

    draw_progress(f, training, chunks[0]);
    draw_question(f, training, chunks[1]);
    draw_answer(f, training, chunks[2]);
}

fn draw_progress(f: &mut Frame, training: &Training, area: Rect) {
    let q = &training.question;
    let ratio = if q.total == 0 {
        0.0
    } else {
        (q.position - 1) as f64 / q.total as f64
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", training.deck_name))
                .title_style(Style::default().fg(Color::Cyan)),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .label(format!("{}/{}", q.position, q.total))
        .ratio(ratio.clamp(0.0, 1.0));
    f.render_widget(gauge, area);
}

fn draw_question(f: &mut Frame, training: &Training, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Question ")
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    let paragraph = Paragraph::new(training.question.question.as_str())
        .style(Style::default().fg(Color::White))
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_answer(f: &mut Frame, training: &Training, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Answer ")
        .title_style(Style::default().fg(Color::Magenta));

    let paragraph = if training.revealed {
        Paragraph::new(vec![
            Line::from(Span::styled(
                training.question.answer.as_str(),
                Style::default().fg(Color::White),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("g", Style::default().fg(Color::Green)),
                Span::raw(" knew it   "),
                Span::styled("b", Style::default().fg(Color::Red)),
                Span::raw(" did not"),
            ]),
        ])
    } else {
        Paragraph::new("Press <Space> to show the answer")
            .style(Style::default().fg(Color::DarkGray))
    };

    f.render_widget(paragraph.block(block).wrap(Wrap { trim: false }), area);
}
