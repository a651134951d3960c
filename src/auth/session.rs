//! Login state machine.
//!
//! A [`Session`] moves through three steps: `Initial`, `AwaitingCode` and
//! `TokenReady`. Each step carries the data it owns, so a token exists
//! exactly when the session is `TokenReady`. Network work is split into a
//! `begin_*` call that validates and sets the loading flag, and a `finish_*`
//! call that applies the result, so the caller decides where the request runs.

use std::collections::VecDeque;

use super::client::EXCHANGE_FALLBACK;
use crate::error::{AuthError, AuthResult};
use crate::storage::LoadedToken;

/// Notice text for an exchange the server rejected without saying why.
const EXCHANGE_FAILED_NOTICE: &str = "Token exchange failed.";

/// Progress through the login flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthStep {
    /// No code, no token.
    #[default]
    Initial,
    /// A code was requested or received but not yet exchanged.
    AwaitingCode {
        /// The one-time code, possibly still being typed.
        code: String,
    },
    /// A bearer token is held.
    TokenReady {
        /// The non-empty bearer token.
        token: String,
    },
}

impl AuthStep {
    /// Short name of the step.
    pub fn name(&self) -> &'static str {
        match self {
            AuthStep::Initial => "initial",
            AuthStep::AwaitingCode { .. } => "awaitingCode",
            AuthStep::TokenReady { .. } => "tokenReady",
        }
    }
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient notification for the view to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, description)
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, description)
    }
}

/// In-memory state of one login session.
#[derive(Debug, Clone)]
pub struct Session {
    app_id: String,
    step: AuthStep,
    /// Draft of the next chat message.
    pub pending_message: String,
    last_response: Option<String>,
    last_error: Option<String>,
    is_loading: bool,
    rejected_code: Option<String>,
    notices: VecDeque<Notice>,
}

impl Session {
    /// Create a session in the `Initial` step.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            step: AuthStep::Initial,
            pending_message: String::new(),
            last_response: None,
            last_error: None,
            is_loading: false,
            rejected_code: None,
            notices: VecDeque::new(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn step(&self) -> &AuthStep {
        &self.step
    }

    /// The one-time code, while awaiting one.
    pub fn one_time_code(&self) -> Option<&str> {
        match &self.step {
            AuthStep::AwaitingCode { code } => Some(code),
            _ => None,
        }
    }

    /// The bearer token, once acquired.
    pub fn auth_token(&self) -> Option<&str> {
        match &self.step {
            AuthStep::TokenReady { token } => Some(token),
            _ => None,
        }
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Drain the queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    fn fail(&mut self, err: &AuthError) {
        self.last_error = Some(err.to_string());
        self.notify(Notice::error(err.title(), err.to_string()));
    }

    /// The user started login; the caller redirects to the authorize page.
    pub fn begin_login(&mut self) {
        self.last_error = None;
        self.step = AuthStep::AwaitingCode {
            code: String::new(),
        };
        tracing::info!(step = self.step.name(), "login started");
        self.notify(Notice::info(
            "Redirecting to Shapes Inc.",
            "Please login and authorize. You will be redirected back to complete the process.",
        ));
    }

    /// Pre-fill a code delivered by the authorization callback.
    ///
    /// Ignored while a token is held, while a request is in flight, and for
    /// the code that was most recently rejected by the exchange endpoint.
    pub fn accept_callback_code(&mut self, code: &str) -> bool {
        if code.is_empty() || self.is_loading || self.auth_token().is_some() {
            return false;
        }
        if self.rejected_code.as_deref() == Some(code) {
            tracing::debug!("ignoring callback code that was already rejected");
            return false;
        }

        self.step = AuthStep::AwaitingCode {
            code: code.to_string(),
        };
        tracing::info!(step = self.step.name(), "callback code received");
        self.notify(Notice::info(
            "Code Retrieved",
            "One-time code auto-filled. Please submit.",
        ));
        true
    }

    /// Replace the code being typed. No effect outside `AwaitingCode`.
    pub fn set_code_input(&mut self, input: impl Into<String>) {
        if let AuthStep::AwaitingCode { code } = &mut self.step {
            *code = input.into();
        }
    }

    /// Start a code exchange. Returns the code to send.
    pub fn begin_exchange(&mut self) -> AuthResult<String> {
        if self.is_loading {
            return Err(AuthError::Busy);
        }
        let code = match &self.step {
            AuthStep::AwaitingCode { code } if !code.is_empty() => code.clone(),
            AuthStep::AwaitingCode { .. } => {
                return Err(AuthError::InvalidState("Enter the one-time code first."))
            }
            _ => return Err(AuthError::InvalidState("No code exchange is pending.")),
        };

        self.last_error = None;
        self.is_loading = true;
        Ok(code)
    }

    /// Apply the result of a code exchange.
    pub fn finish_exchange(&mut self, result: AuthResult<String>) {
        self.is_loading = false;
        match result {
            Ok(token) if !token.is_empty() => {
                self.step = AuthStep::TokenReady { token };
                self.rejected_code = None;
                tracing::info!(step = self.step.name(), "auth token received");
                self.notify(Notice::success("Success!", "Auth token received."));
            }
            Ok(_) => self.reject_code(&AuthError::Exchange(
                "Token exchange returned an empty token.".to_string(),
            )),
            Err(err) => self.reject_code(&err),
        }
    }

    fn reject_code(&mut self, err: &AuthError) {
        tracing::warn!(error = %err, "code exchange failed");
        let code = self.one_time_code().map(str::to_string);
        if code.is_some() {
            self.rejected_code = code;
        }

        self.last_error = Some(err.to_string());
        let description = match err {
            AuthError::Exchange(msg) if msg == EXCHANGE_FALLBACK => {
                EXCHANGE_FAILED_NOTICE.to_string()
            }
            other => other.to_string(),
        };
        self.notify(Notice::error(err.title(), description));
    }

    /// Abandon the pending code and return to `Initial`.
    pub fn cancel(&mut self) {
        if matches!(self.step, AuthStep::AwaitingCode { .. }) && !self.is_loading {
            self.step = AuthStep::Initial;
        }
    }

    /// Start sending the draft message. Returns `(token, text)`.
    pub fn begin_send(&mut self) -> AuthResult<(String, String)> {
        let Some(token) = self.auth_token().map(str::to_string) else {
            self.last_error = Some(AuthError::MissingToken.to_string());
            self.notify(Notice::error("Error", "Auth token is missing."));
            return Err(AuthError::MissingToken);
        };
        if self.is_loading {
            return Err(AuthError::Busy);
        }
        if self.pending_message.is_empty() {
            return Err(AuthError::InvalidState("Type a message first."));
        }

        self.last_error = None;
        self.last_response = None;
        self.is_loading = true;
        Ok((token, self.pending_message.clone()))
    }

    /// Apply the result of a send.
    pub fn finish_send(&mut self, result: AuthResult<String>) {
        self.is_loading = false;
        match result {
            Ok(text) => {
                self.last_response = Some(text);
                self.pending_message.clear();
                self.notify(Notice::success("Message Sent", "Response received."));
            }
            Err(err) => {
                tracing::warn!(error = %err, "send failed");
                self.fail(&err);
            }
        }
    }

    /// Apply the outcome of loading a token from storage.
    pub fn token_loaded(&mut self, loaded: Option<LoadedToken>) {
        self.last_error = None;
        match loaded {
            Some(LoadedToken { token, source }) => {
                self.step = AuthStep::TokenReady { token };
                tracing::info!(%source, "auth token loaded");
                self.notify(Notice::success(
                    "Token Loaded",
                    format!("Auth token loaded from {}.", source),
                ));
            }
            None => {
                let miss = AuthError::StorageMiss;
                self.notify(Notice::error(miss.title(), miss.to_string()));
            }
        }
    }

    /// Record a failure from outside the state machine, such as storage I/O.
    pub fn report(&mut self, err: &AuthError) {
        tracing::warn!(error = %err, "action failed");
        self.fail(err);
    }

    /// Raise a notice from outside the state machine.
    pub fn push_notice(&mut self, notice: Notice) {
        self.notify(notice);
    }

    /// Drop all session state except the app id and return to `Initial`.
    pub fn reset(&mut self) {
        let app_id = std::mem::take(&mut self.app_id);
        let notices = std::mem::take(&mut self.notices);
        *self = Self {
            notices,
            ..Self::new(app_id)
        };
        tracing::info!(step = self.step.name(), "session reset");
        self.notify(Notice::info(
            "State Reset",
            "Application state and stored tokens have been cleared.",
        ));
    }
}
