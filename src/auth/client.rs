//! HTTP client for the Shapes Inc. auth and chat endpoints.
//!
//! Two calls are made: `POST {auth_base}/nonce` trades a one-time code for a
//! bearer token, and `POST {api_base}/chat/completions` sends a single user
//! message with that token. Failures are normalized into [`AuthError`] with
//! the server's own message when it sent one.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Default site hosting the authorize page.
pub const DEFAULT_SITE_BASE: &str = "https://shapes.inc";

/// Default auth API base URL.
pub const DEFAULT_AUTH_BASE: &str = "https://api.shapes.inc/auth";

/// Default chat API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.shapes.inc/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "shapesinc/shaperobot";

pub(crate) const EXCHANGE_FALLBACK: &str =
    "Failed to exchange code for token. Ensure the code is correct and not expired.";
const SEND_FALLBACK: &str = "Failed to send message or no response content.";

/// Base URLs of the three Shapes services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub site_base: String,
    pub auth_base: String,
    pub api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            site_base: DEFAULT_SITE_BASE.to_string(),
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Build the authorize page URL the user is sent to.
    pub fn authorize_url(&self, app_id: &str, redirect_uri: &str) -> String {
        format!(
            "{}/authorize?app_id={}&redirect_uri={}",
            self.site_base.trim_end_matches('/'),
            urlencoding::encode(app_id),
            urlencoding::encode(redirect_uri)
        )
    }

    fn nonce_url(&self) -> String {
        format!("{}/nonce", self.auth_base.trim_end_matches('/'))
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Code exchange request body.
#[derive(Debug, Serialize)]
struct NonceRequest<'a> {
    app_id: &'a str,
    code: &'a str,
}

/// Code exchange response body. Every field is optional; absence is a failure.
#[derive(Debug, Default, Deserialize)]
struct NonceResponse {
    #[serde(default)]
    auth_token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Chat request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat response body.
#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    #[serde(default)]
    message: Option<String>,
}

/// Parse a body leniently: anything that isn't the expected JSON reads as empty.
fn parse_lenient<T: Default + for<'de> Deserialize<'de>>(body: &str) -> T {
    serde_json::from_str(body).unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Client for the Shapes Inc. API.
#[derive(Debug, Clone)]
pub struct ShapesClient {
    client: Client,
    endpoints: Endpoints,
    model: String,
}

impl ShapesClient {
    /// Create a client for the given endpoints and chat model.
    pub fn new(endpoints: Endpoints, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoints,
            model: model.into(),
        }
    }

    /// Create a client for the public Shapes endpoints.
    pub fn with_defaults() -> Self {
        Self::new(Endpoints::default(), DEFAULT_MODEL)
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Exchange a one-time code for a bearer token.
    pub async fn exchange_code(&self, app_id: &str, code: &str) -> AuthResult<String> {
        let url = self.endpoints.nonce_url();
        tracing::debug!(%url, "exchanging one-time code");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&NonceRequest { app_id, code })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let data: NonceResponse = parse_lenient(&body);

        if status.is_success() {
            if let Some(token) = non_empty(data.auth_token) {
                return Ok(token);
            }
        }

        tracing::warn!(%status, "code exchange rejected");
        Err(AuthError::Exchange(
            non_empty(data.message).unwrap_or_else(|| EXCHANGE_FALLBACK.to_string()),
        ))
    }

    /// Send a single user message and return the first completion's content.
    pub async fn send_message(&self, app_id: &str, token: &str, text: &str) -> AuthResult<String> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let url = self.endpoints.completions_url();
        tracing::debug!(%url, model = %self.model, "sending chat message");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: text,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-App-ID", app_id)
            .header("X-User-Auth", token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let data: ChatResponse = parse_lenient(&body);

        if status.is_success() {
            if let Some(choice) = data.choices.into_iter().next() {
                return Ok(choice.message.content.unwrap_or_default());
            }
        }

        tracing::warn!(%status, "chat request rejected");
        let message = non_empty(data.message)
            .or_else(|| data.error.and_then(|e| non_empty(e.message)))
            .unwrap_or_else(|| SEND_FALLBACK.to_string());
        Err(AuthError::Send(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.site_base, "https://shapes.inc");
        assert_eq!(endpoints.auth_base, "https://api.shapes.inc/auth");
        assert_eq!(endpoints.api_base, "https://api.shapes.inc/v1");
    }

    #[test]
    fn test_authorize_url_encodes_redirect() {
        let url = Endpoints::default().authorize_url("app-1", "http://localhost:8080/cb?x=1");
        assert_eq!(
            url,
            "https://shapes.inc/authorize?app_id=app-1&redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcb%3Fx%3D1"
        );
    }

    #[test]
    fn test_endpoint_urls_trim_trailing_slash() {
        let endpoints = Endpoints {
            site_base: "http://site/".into(),
            auth_base: "http://auth/".into(),
            api_base: "http://api/v1/".into(),
        };
        assert_eq!(endpoints.nonce_url(), "http://auth/nonce");
        assert_eq!(endpoints.completions_url(), "http://api/v1/chat/completions");
        assert!(endpoints.authorize_url("a", "b").starts_with("http://site/authorize?"));
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "shapesinc/shaperobot",
            messages: vec![ChatMessage {
                role: "user",
                content: "Hello",
            }],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"model":"shapesinc/shaperobot","messages":[{"role":"user","content":"Hello"}]}"#
        );
    }

    #[test]
    fn test_lenient_parse_of_garbage() {
        let data: NonceResponse = parse_lenient("<html>502</html>");
        assert!(data.auth_token.is_none());
        assert!(data.message.is_none());
    }

    #[test]
    fn test_chat_response_with_nested_error() {
        let data: ChatResponse = parse_lenient(r#"{"error":{"message":"bad key"}}"#);
        assert!(data.choices.is_empty());
        assert_eq!(data.error.unwrap().message.as_deref(), Some("bad key"));
    }

    #[tokio::test]
    async fn test_send_with_empty_token_fails_locally() {
        let client = ShapesClient::with_defaults();
        let result = client.send_message("app", "", "hi").await;
        assert_eq!(result, Err(AuthError::MissingToken));
    }
}
