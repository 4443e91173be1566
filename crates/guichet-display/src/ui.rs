use chrono::Local;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::App;
use crate::models::{CalledTicket, DisplayConfig, DisplaySnapshot, LayoutVariant, TicketStatusExt};

/// Fallback colors rotated by list position when a queue has no configured
/// override.
const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::Blue,
    Color::Red,
];

/// Pure mapping from (snapshot, connection state, clock) to the frame.
/// Timers and I/O live with the callers; nothing here has side effects.
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Board
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);

    match &app.snapshot {
        Some(snapshot) if !snapshot.tickets.is_empty() => match snapshot.display.layout {
            LayoutVariant::Modern => draw_modern_board(frame, snapshot, chunks[1]),
            LayoutVariant::Classic => draw_classic_board(frame, snapshot, chunks[1]),
        },
        Some(_) => draw_waiting_placeholder(frame, chunks[1]),
        None => draw_initial_state(frame, app, chunks[1]),
    }

    draw_footer(frame, app, chunks[2]);

    if app.show_help {
        draw_help_modal(frame);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let (title, border_color) = match &app.snapshot {
        Some(snapshot) => (
            format!(" {} ", snapshot.display.name),
            theme_color(&snapshot.display),
        ),
        None => (format!(" Écran {} ", app.api.display_id()), Color::White),
    };

    let connection = if app.connection.connected {
        Span::styled("● temps réel", Style::default().fg(Color::Green))
    } else if app.connection.last_error.is_some() {
        Span::styled("○ sondage seul", Style::default().fg(Color::DarkGray))
    } else if app.connection.reconnect_attempt > 0 {
        Span::styled(
            format!("○ reconnexion ({})", app.connection.reconnect_attempt),
            Style::default().fg(Color::Yellow),
        )
    } else {
        Span::styled("○ hors ligne", Style::default().fg(Color::DarkGray))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(32)])
        .split(inner);

    let name = Paragraph::new(title).style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(name, halves[0]);

    let clock = Paragraph::new(Line::from(vec![
        connection,
        Span::raw("  "),
        Span::styled(
            app.now.format("%H:%M:%S").to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
    ]))
    .alignment(Alignment::Right);
    frame.render_widget(clock, halves[1]);
}

/// Split layout: a hero pane for the latest call, a list for the rest.
fn draw_modern_board(frame: &mut Frame, snapshot: &DisplaySnapshot, area: Rect) {
    let window = snapshot.window();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    draw_hero(frame, snapshot, &window[0], columns[0]);
    draw_ticket_list(frame, snapshot, &window[1..], 1, " Appels précédents ", columns[1]);
}

/// Single-column layout listing every ticket in the window.
fn draw_classic_board(frame: &mut Frame, snapshot: &DisplaySnapshot, area: Rect) {
    draw_ticket_list(frame, snapshot, snapshot.window(), 0, " Appels ", area);
}

fn draw_hero(frame: &mut Frame, snapshot: &DisplaySnapshot, ticket: &CalledTicket, area: Rect) {
    let color = ticket_color(&snapshot.display, ticket, 0);
    let counter = match ticket.counter_number {
        Some(n) => format!("Guichet {n}"),
        None => "Veuillez vous présenter".to_string(),
    };
    let agent = ticket
        .agent_name
        .as_deref()
        .map(|name| format!("avec {name}"))
        .unwrap_or_default();

    let lines = vec![
        Line::raw(""),
        Line::styled(
            ticket.display_number.clone(),
            Style::default()
                .fg(color)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ),
        Line::raw(""),
        Line::styled(
            counter,
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::raw(ticket.queue_name.clone()),
        Line::raw(agent),
        Line::raw(""),
        Line::styled(
            ticket
                .called_at
                .with_timezone(&Local)
                .format("appelé à %H:%M")
                .to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let hero = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(" Dernier appel ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
    frame.render_widget(hero, area);
}

fn draw_ticket_list(
    frame: &mut Frame,
    snapshot: &DisplaySnapshot,
    tickets: &[CalledTicket],
    position_offset: usize,
    title: &str,
    area: Rect,
) {
    let items: Vec<ListItem> = tickets
        .iter()
        .enumerate()
        .map(|(i, ticket)| {
            let color = ticket_color(&snapshot.display, ticket, i + position_offset);
            let counter = ticket
                .counter_number
                .map(|n| format!("Guichet {n}"))
                .unwrap_or_else(|| "—".to_string());
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<8}", ticket.display_number),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("{:<12}", counter)),
                Span::raw(format!("{:<18}", ticket.queue_name)),
                Span::styled(
                    format!("{:<10}", ticket.status.as_str()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    ticket
                        .called_at
                        .with_timezone(&Local)
                        .format("%H:%M")
                        .to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(list, area);
}

fn draw_waiting_placeholder(frame: &mut Frame, area: Rect) {
    let placeholder = Paragraph::new("En attente d'appels…")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(placeholder, area);
}

/// Before the first snapshot: a loading notice, or the fetch error with
/// its retry hint.
fn draw_initial_state(frame: &mut Frame, app: &App, area: Rect) {
    let lines = match &app.last_error {
        Some(err) => vec![
            Line::raw(""),
            Line::styled(
                err.user_message(),
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            ),
            Line::raw(""),
            Line::raw("Appuyez sur r pour réessayer"),
        ],
        None => vec![Line::raw(""), Line::raw("Chargement…")],
    };
    let notice = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(notice, area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(36)])
        .split(inner);

    // Left: error notice > status message > banner > waiting counts.
    let left = if let (Some(err), Some(_)) = (&app.last_error, &app.snapshot) {
        Line::styled(
            format!("{} (r pour réessayer)", err.user_message()),
            Style::default().fg(Color::Red),
        )
    } else if let Some(message) = &app.status_message {
        Line::raw(message.clone())
    } else if let Some(snapshot) = &app.snapshot {
        match &snapshot.display.message {
            Some(banner) if !banner.is_empty() => Line::raw(banner.clone()),
            _ => Line::styled(waiting_summary(snapshot), Style::default().fg(Color::DarkGray)),
        }
    } else {
        Line::raw("")
    };
    frame.render_widget(Paragraph::new(left), halves[0]);

    // Right: mute marker and freshness.
    let mut spans = Vec::new();
    if app.announcer.is_muted() {
        spans.push(Span::styled("muet  ", Style::default().fg(Color::Yellow)));
    }
    if let Some(snapshot) = &app.snapshot {
        spans.push(Span::styled(
            snapshot
                .timestamp
                .with_timezone(&Local)
                .format("mis à jour %H:%M:%S")
                .to_string(),
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans.push(Span::raw(" "));
    let right = Paragraph::new(Line::from(spans)).alignment(Alignment::Right);
    frame.render_widget(right, halves[1]);
}

/// "Caisse: 4 · Retrait: 2 · 6 en attente"
fn waiting_summary(snapshot: &DisplaySnapshot) -> String {
    if snapshot.waiting_stats.is_empty() {
        return String::new();
    }
    let mut parts: Vec<String> = snapshot
        .waiting_stats
        .iter()
        .map(|(queue_id, count)| {
            let name = snapshot
                .tickets
                .iter()
                .find(|t| t.queue_id == *queue_id)
                .map(|t| t.queue_name.clone())
                .unwrap_or_else(|| "File".to_string());
            format!("{name}: {count}")
        })
        .collect();
    parts.sort();
    format!(
        "{} · {} en attente",
        parts.join(" · "),
        snapshot.total_waiting()
    )
}

fn draw_help_modal(frame: &mut Frame) {
    let area = centered_rect(40, 40, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::raw(""),
        Line::raw("q        quitter"),
        Line::raw("r        actualiser"),
        Line::raw("m        couper/activer les annonces"),
        Line::raw("?        cette aide"),
        Line::raw("ctrl-z   suspendre"),
    ];
    let help = Paragraph::new(lines).block(
        Block::default()
            .title(" Aide ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// Per-queue configured color when present, else the palette rotated by
/// position in the displayed list.
fn ticket_color(config: &DisplayConfig, ticket: &CalledTicket, position: usize) -> Color {
    config
        .queue_colors
        .get(&ticket.queue_id)
        .and_then(|hex| parse_hex_color(hex))
        .unwrap_or(PALETTE[position % PALETTE.len()])
}

fn theme_color(config: &DisplayConfig) -> Color {
    parse_hex_color(&config.theme.primary).unwrap_or(Color::White)
}

fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}
