//! The HTTP boundary: request construction, response envelope handling, and
//! failure classification.
//!
//! Every server reply is wrapped in a JSON envelope:
//!
//! ```json
//! { "success": true, "data": { ... }, "message": "optional" }
//! ```
//!
//! [`Transport`] validates and discards the envelope, handing callers only the
//! `data` payload. It never retries and never recovers errors; it classifies
//! them into [`ApiError`] and forwards.
//!
//! A `401 Unauthorized` from any endpoint is additionally broadcast on a
//! notification channel (see [`Transport::subscribe_unauthorized`]) so the
//! session layer can discard state that is no longer valid anywhere. The
//! transport itself holds no reference to the session.

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;

pub use reqwest::Method;

/// Error type for all client/server interactions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received (DNS failure, refused connection, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server replied with a 4xx/5xx status.
    #[error("http {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body, or the canonical reason.
        message: String,
    },

    /// Anything else, including replies that violate the response envelope.
    #[error("unexpected response: {0}")]
    Unknown(String),
}

impl ApiError {
    /// Returns `true` if no response reached the client.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns `true` if the server rejected the request as unauthenticated.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// The HTTP status code, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        Self::Unknown(err.to_string())
    }
}

/// Notification emitted when any endpoint replies `401`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthorized;

/// Body of an outgoing request.
pub enum RequestBody {
    /// No body.
    Empty,
    /// A JSON body, sent with `Content-Type: application/json`.
    Json(Value),
    /// A multipart form. No content type is set here so the underlying stack
    /// can attach its own boundary.
    Multipart(Form),
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Multipart(_) => f.write_str("Multipart(..)"),
        }
    }
}

/// The server's response envelope.
#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    success: bool,
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP transport with a configured base URL and cookie-based credentials.
///
/// Cookies are stored and replayed automatically, which is how the server's
/// session cookie travels with every call.
///
/// # Example
///
/// ```rust,no_run
/// use marquee::config::ClientConfig;
/// use marquee::transport::{Method, RequestBody, Transport};
///
/// # async fn run() -> Result<(), marquee::transport::ApiError> {
/// let config = ClientConfig::with_base_url("http://localhost:3000".parse().unwrap());
/// let transport = Transport::new(&config)?;
///
/// let events: serde_json::Value = transport
///     .send(Method::GET, "/api/events", RequestBody::Empty)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Transport {
    http: reqwest::Client,
    base_url: Option<Url>,
    unauthorized_tx: broadcast::Sender<Unauthorized>,
}

impl Transport {
    /// Creates a transport from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unknown`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Unknown(e.to_string()))?;
        let (unauthorized_tx, _) = broadcast::channel(16);

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            unauthorized_tx,
        })
    }

    /// Subscribes to `401` notifications.
    ///
    /// The session store listens here; nothing in the transport depends on
    /// whether anyone is subscribed.
    #[must_use]
    pub fn subscribe_unauthorized(&self) -> broadcast::Receiver<Unauthorized> {
        self.unauthorized_tx.subscribe()
    }

    /// Resolves `path` against the configured base URL.
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        match &self.base_url {
            Some(base) => Ok(base.join(path)?),
            None => Ok(path.parse()?),
        }
    }

    /// Sends a request and returns the unwrapped `data` payload.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Network`] when no response was received
    /// - [`ApiError::Http`] for a 4xx/5xx reply, with the body's `message`
    ///   when present
    /// - [`ApiError::Unknown`] for replies that violate the envelope
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        debug!(%method, %url, "dispatching request");

        let mut request = self.http.request(method, url);
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request
                .header(CONTENT_TYPE, "application/json")
                .json(&value),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await.map_err(classify_send_error)?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if status.as_u16() == 401 {
            warn!(path, "unauthorized response, notifying subscribers");
            let _ = self.unauthorized_tx.send(Unauthorized);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(&text, status),
            });
        }

        unwrap_envelope(&text)
    }

    /// Sends a request and deserializes the unwrapped `data` payload.
    ///
    /// # Errors
    ///
    /// As [`Transport::send`]; a payload that does not match `T` classifies as
    /// [`ApiError::Unknown`].
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<T, ApiError> {
        let data = self.send(method, path, body).await?;
        serde_json::from_value(data).map_err(|e| ApiError::Unknown(e.to_string()))
    }

    /// Convenience for `GET` requests.
    ///
    /// # Errors
    ///
    /// As [`Transport::send_json`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(Method::GET, path, RequestBody::Empty).await
    }
}

/// Classifies an error raised before any response arrived.
fn classify_send_error(err: reqwest::Error) -> ApiError {
    if err.is_builder() {
        ApiError::Unknown(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

/// Pulls a human-readable message out of an error reply body.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

/// Validates the response envelope and unwraps its `data` field.
fn unwrap_envelope(body: &str) -> Result<Value, ApiError> {
    // Some write endpoints reply with an empty body on success.
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| ApiError::Unknown(format!("bad envelope: {e}")))?;

    if !envelope.success {
        let message = envelope
            .message
            .unwrap_or_else(|| "server reported failure".to_string());
        return Err(ApiError::Unknown(message));
    }

    Ok(envelope.data)
}
