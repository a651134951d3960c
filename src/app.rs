use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::auth::{callback, AuthFlow, AuthStep, Notice};
use crate::error::{AuthError, AuthResult};
use crate::storage::StorageKind;

/// A notice with the time it was raised.
#[derive(Debug, Clone)]
pub struct TimedNotice {
    pub notice: Notice,
    pub raised_at: Instant,
}

/// Notices currently on screen, newest last.
#[derive(Debug, Clone)]
pub struct NoticeQueue {
    items: VecDeque<TimedNotice>,
    ttl: Duration,
    max_visible: usize,
}

impl NoticeQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            ttl,
            max_visible: 3,
        }
    }

    pub fn push(&mut self, notice: Notice) {
        self.items.push_back(TimedNotice {
            notice,
            raised_at: Instant::now(),
        });
        while self.items.len() > self.max_visible {
            self.items.pop_front();
        }
    }

    /// Drop notices older than the configured lifetime.
    pub fn tick(&mut self) {
        let ttl = self.ttl;
        self.items.retain(|n| n.raised_at.elapsed() < ttl);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimedNotice> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Application state for the login form.
pub struct App {
    pub flow: AuthFlow,
    pub notices: NoticeQueue,
    /// Authorize URL from the last login, shown while awaiting the code.
    pub authorize_url: Option<String>,
    exchange_rx: Option<oneshot::Receiver<AuthResult<String>>>,
    send_rx: Option<oneshot::Receiver<AuthResult<String>>>,
}

impl App {
    pub fn new(flow: AuthFlow, notice_ttl: Duration) -> Self {
        Self {
            flow,
            notices: NoticeQueue::new(notice_ttl),
            authorize_url: None,
            exchange_rx: None,
            send_rx: None,
        }
    }

    /// Whether a network request is in flight.
    pub fn is_busy(&self) -> bool {
        self.flow.session.is_loading()
    }

    pub fn step(&self) -> &AuthStep {
        self.flow.session.step()
    }

    /// Move notices raised by the session onto the screen queue.
    pub fn drain_notices(&mut self) {
        for notice in self.flow.session.take_notices() {
            self.notices.push(notice);
        }
    }

    pub fn tick_notices(&mut self) {
        self.notices.tick();
    }

    /// Start login and open the authorize page in the browser.
    pub fn login(&mut self) {
        if self.is_busy() {
            return;
        }
        let url = self.flow.login();
        if let Err(err) = open::that(&url) {
            tracing::warn!(error = %err, "failed to open browser");
            self.flow.session.push_notice(Notice::error(
                "Could Not Open Browser",
                "Open the authorize URL shown below manually.",
            ));
        }
        self.authorize_url = Some(url);
    }

    /// Apply a returned callback address, e.g. from `--callback` or a pasted URL.
    pub fn handle_callback(&mut self, location: &str) -> bool {
        match callback::parse_location(location) {
            Some(mut url) => self.flow.handle_callback(&mut url),
            None => false,
        }
    }

    /// Edit the code or message field, depending on the step.
    pub fn push_char(&mut self, c: char) {
        if self.is_busy() {
            return;
        }
        match self.flow.session.step() {
            AuthStep::AwaitingCode { code } => {
                let mut code = code.clone();
                code.push(c);
                self.flow.session.set_code_input(code);
            }
            AuthStep::TokenReady { .. } => self.flow.session.pending_message.push(c),
            AuthStep::Initial => {}
        }
    }

    /// Delete the last character of the active field.
    pub fn pop_char(&mut self) {
        if self.is_busy() {
            return;
        }
        match self.flow.session.step() {
            AuthStep::AwaitingCode { code } => {
                let mut code = code.clone();
                code.pop();
                self.flow.session.set_code_input(code);
            }
            AuthStep::TokenReady { .. } => {
                self.flow.session.pending_message.pop();
            }
            AuthStep::Initial => {}
        }
    }

    /// Submit the code field. A pasted callback URL is treated as a callback.
    pub fn submit_code(&mut self) {
        let input = self.flow.session.one_time_code().unwrap_or_default().to_string();
        if callback::parse_location(&input).is_some() {
            if !self.handle_callback(&input) {
                self.flow.session.set_code_input(String::new());
            }
            return;
        }

        let code = match self.flow.session.begin_exchange() {
            Ok(code) => code,
            Err(err) => return self.flow.session.report(&err),
        };

        let (tx, rx) = oneshot::channel();
        self.exchange_rx = Some(rx);

        let client = self.flow.client().clone();
        let app_id = self.flow.session.app_id().to_string();
        tokio::spawn(async move {
            let result = client.exchange_code(&app_id, &code).await;
            let _ = tx.send(result);
        });
    }

    /// Send the message field with the held token.
    pub fn send_message(&mut self) {
        let (token, text) = match self.flow.session.begin_send() {
            Ok(pair) => pair,
            Err(AuthError::MissingToken) => return,
            Err(err) => return self.flow.session.report(&err),
        };

        let (tx, rx) = oneshot::channel();
        self.send_rx = Some(rx);

        let client = self.flow.client().clone();
        let app_id = self.flow.session.app_id().to_string();
        tokio::spawn(async move {
            let result = client.send_message(&app_id, &token, &text).await;
            let _ = tx.send(result);
        });
    }

    /// Apply a finished code exchange, if any. Returns true when one was applied.
    pub fn process_exchange(&mut self) -> bool {
        let Some(mut rx) = self.exchange_rx.take() else {
            return false;
        };
        match rx.try_recv() {
            Ok(result) => {
                self.flow.session.finish_exchange(result);
                true
            }
            Err(TryRecvError::Empty) => {
                // Still pending, put the receiver back
                self.exchange_rx = Some(rx);
                false
            }
            Err(TryRecvError::Closed) => {
                self.flow.session.finish_exchange(Err(AuthError::Transport(
                    "Token exchange task failed".to_string(),
                )));
                true
            }
        }
    }

    /// Apply a finished send, if any. Returns true when one was applied.
    pub fn process_send(&mut self) -> bool {
        let Some(mut rx) = self.send_rx.take() else {
            return false;
        };
        match rx.try_recv() {
            Ok(result) => {
                self.flow.session.finish_send(result);
                true
            }
            Err(TryRecvError::Empty) => {
                self.send_rx = Some(rx);
                false
            }
            Err(TryRecvError::Closed) => {
                self.flow.session.finish_send(Err(AuthError::Transport(
                    "Send task failed".to_string(),
                )));
                true
            }
        }
    }

    pub fn cancel(&mut self) {
        self.flow.cancel();
        if matches!(self.step(), AuthStep::Initial) {
            self.authorize_url = None;
        }
    }

    pub fn store_token(&mut self, kind: StorageKind) {
        self.flow.store_token(kind);
    }

    pub fn load_token(&mut self) {
        if !self.is_busy() {
            self.flow.load_token();
        }
    }

    pub fn reset(&mut self) {
        if !self.is_busy() {
            self.flow.reset();
            self.authorize_url = None;
        }
    }
}

/// Mask a token for display, showing only the first and last 4 characters.
///
/// Examples:
/// - "abcd1234efgh5678" -> "abcd...5678"
/// - "short" -> "*****"
/// - "" -> ""
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Session, ShapesClient};
    use crate::storage::{CookieStore, DurableStore, TokenPersistence};
    use tempfile::TempDir;

    fn app(dir: &TempDir) -> App {
        let persistence = TokenPersistence::new(
            Box::new(DurableStore::new(dir.path().join("storage.json"))),
            Box::new(CookieStore::new(dir.path().join("cookies.txt"))),
        );
        let flow = AuthFlow::new(
            Session::new("app"),
            ShapesClient::with_defaults(),
            persistence,
            "http://localhost:8080/",
        );
        App::new(flow, Duration::from_secs(4))
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token(""), "");
        assert_eq!(mask_token("short"), "*****");
        assert_eq!(mask_token("abcd1234efgh5678"), "abcd...5678");
    }

    #[test]
    fn test_callback_prefills_code() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        assert!(app.handle_callback("http://localhost:8080/?code=abc123"));
        assert_eq!(app.flow.session.one_time_code(), Some("abc123"));
    }

    #[test]
    fn test_pasted_callback_url_fills_code() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.flow.session.begin_login();
        for c in "http://localhost:8080/?code=xyz".chars() {
            app.push_char(c);
        }
        app.submit_code();
        assert_eq!(app.flow.session.one_time_code(), Some("xyz"));
        assert!(!app.is_busy());
    }

    #[test]
    fn test_typing_edits_code() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.flow.session.begin_login();
        app.push_char('a');
        app.push_char('b');
        app.pop_char();
        assert_eq!(app.flow.session.one_time_code(), Some("a"));
    }

    #[test]
    fn test_notice_queue_caps_visible() {
        let mut queue = NoticeQueue::new(Duration::from_secs(10));
        for i in 0..5 {
            queue.push(Notice::info(format!("n{}", i), ""));
        }
        let titles: Vec<&str> = queue.iter().map(|n| n.notice.title.as_str()).collect();
        assert_eq!(titles, vec!["n2", "n3", "n4"]);
    }

    #[test]
    fn test_notice_queue_expires() {
        let mut queue = NoticeQueue::new(Duration::ZERO);
        queue.push(Notice::info("gone", ""));
        queue.tick();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_load_miss_raises_notice() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.load_token();
        app.drain_notices();
        assert_eq!(app.notices.iter().next().unwrap().notice.title, "Not Found");
    }
}
