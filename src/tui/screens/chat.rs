//! Chat screen: timeline, input line, and status bar

use chrono::{Local, TimeZone};
use nostr_sdk::prelude::*;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::feed::{ChannelMessage, Delivery};
use crate::profile::ProfileCache;
use crate::tui::app::App;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(5),    // Timeline
            Constraint::Length(3), // Input
            Constraint::Length(2), // Status / help
        ])
        .split(area);

    render_title(frame, app, chunks[0]);
    render_timeline(frame, app, chunks[1]);
    app.input.render(frame, chunks[2], "Nachricht", true);
    render_status(frame, app, chunks[3]);
}

fn render_title(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled("💬 ", Style::default()),
        Span::styled(
            app.config.channel.name.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(session) = &app.session {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("{} Relays", session.relay_count()),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("du: {}", crate::profile::short_pubkey(&session.public_key())),
            Style::default().fg(Color::Magenta),
        ));
    }
    let title = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, area);
}

fn render_timeline(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::NONE)
        .style(Style::default());
    let inner = block.inner(area);

    let Some(session) = &app.session else {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Nicht verbunden",
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        );
        return;
    };

    let our_key = session.public_key();
    let width = inner.width.max(10) as usize;

    let mut lines: Vec<Line> = Vec::new();
    for msg in session.feed().messages() {
        lines.extend(message_lines(msg, session.profiles(), &our_key, width));
    }

    if lines.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Noch keine Nachrichten in den letzten 24 Stunden.",
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        );
        return;
    }

    // Window anchored at the bottom, shifted up by the scroll offset. The
    // offset is clamped so at least one line stays visible.
    let height = inner.height as usize;
    let offset = app.scroll_from_bottom.min(lines.len().saturating_sub(1));
    let end = lines.len() - offset;
    let start = end.saturating_sub(height);
    let visible: Vec<Line> = lines[start..end].to_vec();

    frame.render_widget(Paragraph::new(visible), inner);
}

fn message_lines(
    msg: &ChannelMessage,
    profiles: &ProfileCache,
    our_key: &PublicKey,
    width: usize,
) -> Vec<Line<'static>> {
    let own = msg.author == *our_key;
    let name = profiles.display_name(&msg.author);

    let name_style = if own {
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let marker = match msg.delivery {
        Delivery::Pending => Some(Span::styled(" ○", Style::default().fg(Color::Yellow))),
        Delivery::Confirmed => Some(Span::styled(" ✓", Style::default().fg(Color::Green))),
        Delivery::Relay => None,
    };

    let mut header = vec![
        Span::styled(
            format!("[{}] ", format_time(msg.created_at)),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(name, name_style),
    ];
    if let Some(marker) = marker {
        header.push(marker);
    }

    let content_style = if msg.delivery == Delivery::Pending {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().fg(Color::White)
    };

    let mut lines = vec![Line::from(header)];
    for chunk in wrap_text(&msg.content, width.saturating_sub(2).max(8)) {
        lines.push(Line::from(Span::styled(format!("  {chunk}"), content_style)));
    }
    lines
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Some(status) => Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(vec![
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(": Senden  "),
            Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
            Span::raw(": Blättern  "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(": Beenden"),
        ]),
    };
    let status = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(status, area);
}

fn format_time(ts: Timestamp) -> String {
    Local
        .timestamp_opt(ts.as_u64() as i64, 0)
        .single()
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| ts.as_u64().to_string())
}

/// Soft-wrap on spaces, hard-split words longer than the width
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw_line in text.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;
        for word in raw_line.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if word_len > width {
                // hard-split an overlong word
                let mut piece = String::new();
                let mut piece_len = if current_len > 0 { current_len + 1 } else { 0 };
                if current_len > 0 {
                    piece.push_str(&std::mem::take(&mut current));
                    piece.push(' ');
                }
                for c in word.chars() {
                    if piece_len >= width {
                        lines.push(std::mem::take(&mut piece));
                        piece_len = 0;
                    }
                    piece.push(c);
                    piece_len += 1;
                }
                current = piece;
                current_len = piece_len;
                continue;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }
        if !current.is_empty() || raw_line.trim().is_empty() {
            lines.push(current);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_text("eins zwei drei vier fünf", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "eins zwei drei vier fünf");
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let lines = wrap_text("aaaaaaaaaaaaaaaaaaaa", 8);
        assert!(lines.len() >= 3);
        assert!(lines.iter().all(|l| l.chars().count() <= 8));
        assert_eq!(lines.concat(), "aaaaaaaaaaaaaaaaaaaa");
    }

    #[test]
    fn wrap_keeps_explicit_newlines() {
        let lines = wrap_text("hallo\nwelt", 20);
        assert_eq!(lines, vec!["hallo".to_string(), "welt".to_string()]);
    }
}
