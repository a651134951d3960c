use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend, Terminal};

use crate::app::App;
use crate::auth::AuthStep;
use crate::config::Config;
use crate::storage::StorageKind;
use crate::ui;

/// Result of handling a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleResult {
    /// Continue running the app
    Continue,
    /// Exit the app
    Exit,
}

/// Poll interval while a request is in flight.
const BUSY_POLL_MS: u64 = 16;

/// Run the main application loop.
pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    config: &Config,
) -> io::Result<()> {
    loop {
        // Apply finished network calls first
        app.process_exchange();
        app.process_send();

        app.drain_notices();
        app.tick_notices();

        terminal.draw(|f| ui::ui(f, app))?;

        let timeout = if app.is_busy() {
            Duration::from_millis(BUSY_POLL_MS)
        } else {
            Duration::from_millis(config.behavior.idle_poll_ms)
        };

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && handle_key_event(app, key.code, key.modifiers) == HandleResult::Exit
                {
                    return Ok(());
                }
            }
        }
    }
}

/// Handle a key event and return whether to continue or exit.
pub fn handle_key_event(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> HandleResult {
    // Global shortcuts (work in all steps)
    if modifiers.contains(KeyModifiers::CONTROL) {
        match code {
            KeyCode::Char('c') | KeyCode::Char('d') => return HandleResult::Exit,
            _ => {}
        }
    }

    match app.step() {
        AuthStep::Initial => handle_initial_keys(app, code),
        AuthStep::AwaitingCode { .. } => handle_code_keys(app, code),
        AuthStep::TokenReady { .. } => handle_token_keys(app, code, modifiers),
    }
}

/// Keys on the start screen.
fn handle_initial_keys(app: &mut App, code: KeyCode) -> HandleResult {
    match code {
        KeyCode::Enter | KeyCode::Char('l') => app.login(),
        KeyCode::Char('o') => app.load_token(),
        KeyCode::Esc | KeyCode::Char('q') => return HandleResult::Exit,
        _ => {}
    }
    HandleResult::Continue
}

/// Keys while the one-time code form is shown.
fn handle_code_keys(app: &mut App, code: KeyCode) -> HandleResult {
    if app.is_busy() {
        return HandleResult::Continue;
    }
    match code {
        KeyCode::Enter => app.submit_code(),
        KeyCode::Esc => app.cancel(),
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Char(c) => app.push_char(c),
        _ => {}
    }
    HandleResult::Continue
}

/// Keys once a token is held.
fn handle_token_keys(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> HandleResult {
    if modifiers.contains(KeyModifiers::CONTROL) {
        match code {
            KeyCode::Char('s') => app.store_token(StorageKind::Durable),
            KeyCode::Char('k') => app.store_token(StorageKind::Cookie),
            KeyCode::Char('r') => app.reset(),
            _ => {}
        }
        return HandleResult::Continue;
    }

    if app.is_busy() {
        return HandleResult::Continue;
    }
    match code {
        KeyCode::Enter => app.send_message(),
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Esc => return HandleResult::Exit,
        KeyCode::Char(c) => app.push_char(c),
        _ => {}
    }
    HandleResult::Continue
}
