//! User actions over the session, the Shapes client and token storage.

use url::Url;

use super::callback;
use super::client::ShapesClient;
use super::session::{Notice, Session};
use crate::error::AuthError;
use crate::storage::{StorageKind, TokenPersistence};

/// Coordinates one [`Session`] with the network and storage collaborators.
#[derive(Debug)]
pub struct AuthFlow {
    pub session: Session,
    client: ShapesClient,
    persistence: TokenPersistence,
    redirect_uri: String,
}

impl AuthFlow {
    pub fn new(
        session: Session,
        client: ShapesClient,
        persistence: TokenPersistence,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            session,
            client,
            persistence,
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn client(&self) -> &ShapesClient {
        &self.client
    }

    /// Start login and return the authorize URL to send the user to.
    pub fn login(&mut self) -> String {
        self.session.begin_login();
        self.client
            .endpoints()
            .authorize_url(self.session.app_id(), &self.redirect_uri)
    }

    /// Consume the `code` parameter of a returned address.
    ///
    /// The parameter is stripped whether or not the session accepts it.
    pub fn handle_callback(&mut self, location: &mut Url) -> bool {
        match callback::take_code(location) {
            Some(code) => self.session.accept_callback_code(&code),
            None => false,
        }
    }

    /// Exchange the pending code for a token.
    pub async fn submit_code(&mut self) {
        let code = match self.session.begin_exchange() {
            Ok(code) => code,
            Err(err) => return self.session.report(&err),
        };
        let result = self
            .client
            .exchange_code(self.session.app_id(), &code)
            .await;
        self.session.finish_exchange(result);
    }

    /// Return to `Initial`, discarding the pending code.
    pub fn cancel(&mut self) {
        self.session.cancel();
    }

    /// Send the draft message with the held token.
    pub async fn send_message(&mut self) {
        let (token, text) = match self.session.begin_send() {
            Ok(pair) => pair,
            Err(AuthError::MissingToken) => return,
            Err(err) => return self.session.report(&err),
        };
        let result = self
            .client
            .send_message(self.session.app_id(), &token, &text)
            .await;
        self.session.finish_send(result);
    }

    /// Save the held token to the selected backend. Does nothing without a token.
    pub fn store_token(&mut self, kind: StorageKind) {
        let Some(token) = self.session.auth_token().map(str::to_string) else {
            return;
        };
        match self.persistence.store(kind, &token) {
            Ok(()) => self.session.push_notice(Notice::success(
                "Token Stored",
                format!("Auth token saved to {}.", kind),
            )),
            Err(err) => self.session.report(&err),
        }
    }

    /// Look for a stored token, durable store first.
    pub fn load_token(&mut self) {
        match self.persistence.load() {
            Ok(loaded) => self.session.token_loaded(loaded),
            Err(err) => self.session.report(&err),
        }
    }

    /// Clear the session and both storage backends.
    pub fn reset(&mut self) {
        self.session.reset();
        if let Err(err) = self.persistence.clear() {
            self.session.report(&err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthStep;
    use crate::storage::{CookieStore, DurableStore};
    use tempfile::TempDir;

    fn flow(dir: &TempDir) -> AuthFlow {
        let persistence = TokenPersistence::new(
            Box::new(DurableStore::new(dir.path().join("storage.json"))),
            Box::new(CookieStore::new(dir.path().join("cookies.txt"))),
        );
        AuthFlow::new(
            Session::new("app-id"),
            ShapesClient::with_defaults(),
            persistence,
            "http://localhost:8080/",
        )
    }

    #[test]
    fn test_login_builds_authorize_url() {
        let dir = TempDir::new().unwrap();
        let mut f = flow(&dir);
        let url = f.login();
        assert_eq!(
            url,
            "https://shapes.inc/authorize?app_id=app-id&redirect_uri=http%3A%2F%2Flocalhost%3A8080%2F"
        );
        assert!(matches!(f.session.step(), AuthStep::AwaitingCode { .. }));
    }

    #[test]
    fn test_callback_strips_code_even_when_ignored() {
        let dir = TempDir::new().unwrap();
        let mut f = flow(&dir);
        f.session.token_loaded(Some(crate::storage::LoadedToken {
            token: "t".into(),
            source: StorageKind::Durable,
        }));

        let mut location = Url::parse("http://localhost:8080/?code=abc").unwrap();
        assert!(!f.handle_callback(&mut location));
        assert_eq!(location.query(), None);
        assert_eq!(f.session.auth_token(), Some("t"));
    }

    #[test]
    fn test_store_without_token_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut f = flow(&dir);
        f.store_token(StorageKind::Durable);
        assert!(f.session.take_notices().is_empty());
        assert!(!dir.path().join("storage.json").exists());
    }

    #[test]
    fn test_reset_clears_storage() {
        let dir = TempDir::new().unwrap();
        let mut f = flow(&dir);
        f.session.token_loaded(Some(crate::storage::LoadedToken {
            token: "t".into(),
            source: StorageKind::Durable,
        }));
        f.store_token(StorageKind::Durable);
        f.store_token(StorageKind::Cookie);

        f.reset();
        f.load_token();
        assert_eq!(f.session.step(), &AuthStep::Initial);
    }
}
