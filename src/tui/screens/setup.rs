//! Identity setup screen: generate a key or import an existing one

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::tui::app::{App, SetupMode};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(4), // Info
            Constraint::Length(3), // Import field
            Constraint::Length(2), // Error
            Constraint::Min(0),    // Spacer
            Constraint::Length(3), // Help
        ])
        .margin(1)
        .split(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled("💬 ", Style::default()),
        Span::styled(
            "Hofflohmarkt Chat - Schlüssel einrichten",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]))
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, chunks[0]);

    let info_lines = vec![
        Line::from(Span::styled(
            "Zum Mitschreiben brauchst du einen Nostr-Schlüssel.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            "Er wird lokal gespeichert und nie übertragen.",
            Style::default().fg(Color::Gray),
        )),
    ];
    frame.render_widget(Paragraph::new(info_lines), chunks[1]);

    if app.setup_mode == SetupMode::Import {
        app.import_input
            .render(frame, chunks[2], "Geheimer Schlüssel", true);
    }

    if let Some(error) = &app.setup_error {
        let error_line = Paragraph::new(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
        frame.render_widget(error_line, chunks[3]);
    }

    let help_lines = match app.setup_mode {
        SetupMode::Choose => vec![Line::from(vec![
            Span::styled("g", Style::default().fg(Color::Yellow)),
            Span::raw(": Neuen Schlüssel erzeugen  "),
            Span::styled("i", Style::default().fg(Color::Yellow)),
            Span::raw(": nsec importieren  "),
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(": Beenden"),
        ])],
        SetupMode::Import => vec![Line::from(vec![
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(": Importieren  "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(": Zurück"),
        ])],
    };
    let help = Paragraph::new(help_lines).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(help, chunks[5]);
}
