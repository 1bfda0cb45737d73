use url::Url;

/// Environment variable selecting the backend base URL.
///
/// When unset, paths are used verbatim; a same-origin deployment supplies
/// absolute paths itself.
pub const BACKEND_URL_ENV: &str = "MARQUEE_BACKEND_URL";

/// Configuration for the client data layer.
///
/// # Example
///
/// ```rust
/// use marquee::config::ClientConfig;
///
/// let config = ClientConfig::with_base_url("http://localhost:3000".parse().unwrap());
/// assert!(config.base_url.is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Base URL that request paths are joined against.
    ///
    /// `None` means paths are passed to the transport as-is.
    pub base_url: Option<Url>,
}

impl ClientConfig {
    /// Creates a configuration with no base URL.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_url: None }
    }

    /// Creates a configuration pointing at the given backend.
    #[must_use]
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url: Some(base_url),
        }
    }

    /// Builds a configuration from the environment.
    ///
    /// Reads [`BACKEND_URL_ENV`]; absence yields a configuration without a
    /// base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is set but does not parse as a URL.
    pub fn from_env() -> Result<Self, url::ParseError> {
        match std::env::var(BACKEND_URL_ENV) {
            Ok(raw) if !raw.is_empty() => Ok(Self::with_base_url(raw.parse()?)),
            _ => Ok(Self::new()),
        }
    }
}
