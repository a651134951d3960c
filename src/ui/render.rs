use ratatui::{
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{mask_token, App};
use crate::auth::AuthStep;

use super::notices::render_notices;

const ACCENT: Color = Color::Cyan;
const ERROR: Color = Color::Rgb(255, 100, 100);
const MUTED: Color = Color::Rgb(140, 140, 160);

/// Main UI rendering function.
pub fn ui(f: &mut Frame, app: &App) {
    let full = f.size();
    let area = full.inner(&Margin {
        horizontal: 2,
        vertical: 1,
    });

    let session = &app.flow.session;
    let error_height = if session.last_error().is_some() { 3 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),            // Title
            Constraint::Length(error_height), // Error
            Constraint::Min(6),               // Step body
            Constraint::Length(1),            // Key hints
            Constraint::Length(1),            // App id footer
        ])
        .split(area);

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            "ShapesAuth",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Authenticate with Shapes Inc. to use their API.",
            Style::default().fg(MUTED),
        )),
    ]);
    f.render_widget(title, chunks[0]);

    if let Some(error) = session.last_error() {
        let alert = Paragraph::new(error)
            .style(Style::default().fg(ERROR))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(ERROR))
                    .title(" Error "),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(alert, chunks[1]);
    }

    match session.step() {
        AuthStep::Initial => render_initial(f, chunks[2]),
        AuthStep::AwaitingCode { code } => render_code_form(f, app, code, chunks[2]),
        AuthStep::TokenReady { token } => render_token_ready(f, app, token, chunks[2]),
    }

    f.render_widget(
        Paragraph::new(key_hints(app)).style(Style::default().fg(MUTED)),
        chunks[3],
    );
    f.render_widget(
        Paragraph::new(format!("App ID: {}", session.app_id())).style(Style::default().fg(MUTED)),
        chunks[4],
    );

    if !app.notices.is_empty() {
        render_notices(f, app, full);
    }
}

fn key_hints(app: &App) -> &'static str {
    if app.is_busy() {
        return "Working...";
    }
    match app.step() {
        AuthStep::Initial => "[Enter] Login with Shapes Inc.  [o] Load token from storage  [q] Quit",
        AuthStep::AwaitingCode { .. } => "[Enter] Submit code  [Esc] Cancel",
        AuthStep::TokenReady { .. } => {
            "[Enter] Send  [Ctrl+S] Store in durable store  [Ctrl+K] Store as cookie  [Ctrl+R] Reset  [Esc] Quit"
        }
    }
}

fn render_initial(f: &mut Frame, area: Rect) {
    let body = Paragraph::new(vec![
        Line::from("Login with Shapes Inc. to get a one-time code,"),
        Line::from("or load a token saved by an earlier session."),
    ])
    .block(Block::default().borders(Borders::ALL).title(" Login "));
    f.render_widget(body, area);
}

fn render_code_form(f: &mut Frame, app: &App, code: &str, area: Rect) {
    let mut lines = vec![
        Line::from("After logging in and authorizing on Shapes Inc., paste the provided code."),
        Line::from("If you were redirected, paste the full address or the code will be auto-filled."),
        Line::from(""),
        Line::from(vec![
            Span::styled("One-Time Code: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(code),
            Span::styled("▎", Style::default().fg(ACCENT)),
        ]),
    ];
    if let Some(ref url) = app.authorize_url {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Authorize URL: {}", url),
            Style::default().fg(MUTED),
        )));
    }

    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" One-Time Code "))
        .wrap(Wrap { trim: false });
    f.render_widget(body, area);
}

fn render_token_ready(f: &mut Frame, app: &App, token: &str, area: Rect) {
    let session = &app.flow.session;
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                "Auth Token Acquired: ",
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::raw(mask_token(token)),
        ]),
        Line::from(Span::styled(
            "Demonstration only: tokens are stored unencrypted.",
            Style::default().fg(MUTED),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Message: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(session.pending_message.as_str()),
            Span::styled("▎", Style::default().fg(ACCENT)),
        ]),
    ];

    if let Some(response) = session.last_response() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "API Response:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.extend(response.lines().map(|l| Line::from(l.to_string())));
    }

    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Shapes API "))
        .wrap(Wrap { trim: false });
    f.render_widget(body, area);
}
