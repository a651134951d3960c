//! Snapshot tests for the login form.
//!
//! These tests verify that the TUI renders correctly for each step of the
//! login flow. Uses ratatui's TestBackend to render to a virtual terminal
//! buffer, then compares the output against saved snapshots.

use std::time::Duration;

use insta::assert_snapshot;
use ratatui::{backend::TestBackend, Terminal};
use shapes_auth::app::App;
use shapes_auth::auth::{AuthFlow, Session, ShapesClient};
use shapes_auth::error::AuthError;
use shapes_auth::storage::{
    CookieStore, DurableStore, StorageKind, TokenPersistence, TokenStore, TOKEN_KEY,
};
use shapes_auth::ui;
use tempfile::TempDir;

/// Wide enough for the longest key hint row.
const TERMINAL_WIDTH: u16 = 110;
const TERMINAL_HEIGHT: u16 = 24;

/// Helper to convert a ratatui Buffer to a plain text string (no ANSI codes).
fn buffer_to_string(buffer: &ratatui::buffer::Buffer) -> String {
    let mut output = String::new();
    for y in 0..buffer.area().height {
        for x in 0..buffer.area().width {
            let cell = buffer.get(x, y);
            // Get just the symbol, strip color information
            output.push_str(cell.symbol());
        }
        output.push('\n');
    }
    output
}

fn app(dir: &TempDir) -> App {
    let persistence = TokenPersistence::new(
        Box::new(DurableStore::new(dir.path().join("storage.json"))),
        Box::new(CookieStore::new(dir.path().join("cookies.txt"))),
    );
    let flow = AuthFlow::new(
        Session::new("app-1234"),
        ShapesClient::with_defaults(),
        persistence,
        "http://localhost:8080/",
    );
    App::new(flow, Duration::from_secs(60))
}

/// An app holding a token loaded from the durable store.
fn app_with_token(dir: &TempDir) -> App {
    let mut durable = DurableStore::new(dir.path().join("storage.json"));
    durable.set(TOKEN_KEY, "abcd1234efgh5678").unwrap();

    let mut app = app(dir);
    app.load_token();
    app
}

fn render(app: &App) -> String {
    let backend = TestBackend::new(TERMINAL_WIDTH, TERMINAL_HEIGHT);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|f| ui::ui(f, app)).unwrap();
    buffer_to_string(terminal.backend().buffer())
}

// ─────────────────────────────────────────────────────────────────────────────
// Login steps
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn initial_screen() {
    let dir = TempDir::new().unwrap();
    let output = render(&app(&dir));
    assert_snapshot!(output);
}

#[test]
fn code_form_with_prefilled_code() {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    app.handle_callback("http://localhost:8080/?code=abc123");

    let output = render(&app);
    assert_snapshot!(output);
}

#[test]
fn exchange_error_above_code_form() {
    let dir = TempDir::new().unwrap();
    let mut app = app(&dir);
    app.flow.session.begin_login();
    app.flow.session.set_code_input("old");
    app.flow.session.begin_exchange().unwrap();
    app.flow
        .session
        .finish_exchange(Err(AuthError::Exchange("code expired".to_string())));

    let output = render(&app);
    assert_snapshot!(output);
}

// ─────────────────────────────────────────────────────────────────────────────
// Token held
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn token_ready_with_response() {
    let dir = TempDir::new().unwrap();
    let mut app = app_with_token(&dir);
    app.flow.session.pending_message = "hello".to_string();
    app.flow.session.begin_send().unwrap();
    app.flow
        .session
        .finish_send(Ok("hi from shapes\nsecond line".to_string()));

    let output = render(&app);
    assert!(!output.contains("abcd1234efgh5678"));
    assert_snapshot!(output);
}

#[test]
fn notices_top_right() {
    let dir = TempDir::new().unwrap();
    let mut app = app_with_token(&dir);
    app.store_token(StorageKind::Cookie);
    app.drain_notices();

    let output = render(&app);
    assert_snapshot!(output);
}
