//! connection configuration
//!
//! build a [`ClientConfig`] with the query endpoint, session token, and
//! optional overrides. pass it to [`crate::Connection::connect`] or
//! [`crate::shared::configure`].

use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// how the session token is presented to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// token as basic-auth username with an empty password
    #[default]
    Basic,
    /// `Authorization: Bearer <token>`
    Bearer,
}

/// configuration for a backend connection
#[derive(Clone)]
pub struct ClientConfig {
    /// original endpoint input
    pub(crate) raw_endpoint: String,

    /// graphql query endpoint (e.g., "<http://127.0.0.1:8080/query>")
    pub(crate) endpoint: Url,

    /// whether the provided endpoint parsed successfully
    pub(crate) endpoint_valid: bool,

    /// session token
    pub(crate) session_token: String,

    pub(crate) auth_scheme: AuthScheme,

    /// request timeout, none waits indefinitely
    pub(crate) timeout: Option<Duration>,

    /// user agent string
    pub(crate) user_agent: String,

    /// whether to verify ssl certificates
    pub(crate) verify_ssl: bool,

    /// additional headers to send with every request
    pub(crate) extra_headers: HeaderMap,

    /// prebuilt http client (takes precedence over http_client_builder)
    pub(crate) http_client: Option<reqwest::Client>,

    /// callback to customize the http client builder before building
    pub(crate) http_client_builder:
        Option<Arc<dyn Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + Send + Sync>>,
}

impl ClientConfig {
    /// create a new configuration
    ///
    /// # arguments
    ///
    /// * `endpoint` - the graphql query endpoint of the backend session
    /// * `session_token` - the session token
    ///
    /// # example
    ///
    /// ```
    /// use chainql::ClientConfig;
    ///
    /// let config = ClientConfig::new("http://127.0.0.1:8080/query", "session-token");
    /// ```
    pub fn new(endpoint: impl AsRef<str>, session_token: impl Into<String>) -> Self {
        let raw = endpoint.as_ref();

        let (endpoint, endpoint_valid) =
            match Url::parse(raw).or_else(|_| Url::parse(&format!("http://{}", raw))) {
                Ok(url) => (url, true),
                Err(_) => (Url::parse("http://invalid.invalid/query").unwrap(), false),
            };

        Self {
            raw_endpoint: raw.to_string(),
            endpoint,
            endpoint_valid,
            session_token: session_token.into(),
            auth_scheme: AuthScheme::Basic,
            timeout: None,
            user_agent: format!("chainql/{} (Rust)", env!("CARGO_PKG_VERSION")),
            verify_ssl: true,
            extra_headers: HeaderMap::new(),
            http_client: None,
            http_client_builder: None,
        }
    }

    /// configuration for a local session listening on `port`
    pub fn local(port: u16, session_token: impl Into<String>) -> Self {
        Self::new(format!("http://127.0.0.1:{port}/query"), session_token)
    }

    /// set the request timeout
    ///
    /// default: none
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// choose how the session token is sent
    ///
    /// default: basic
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    /// set a custom user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// disable ssl certificate verification (not recommended for production)
    ///
    /// default: enabled
    pub fn with_ssl_verification(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// add a header to every request
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.insert(name, value);
        self
    }

    /// add a set of headers to every request
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.extra_headers.extend(headers);
        self
    }

    /// inject a prebuilt http client.
    ///
    /// when set, this client is used as-is and takes precedence over
    /// `with_http_client_builder`. tls, timeouts, and the user agent come
    /// from the prebuilt client; the session token is still attached to
    /// every request unless it is empty.
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// customize the http client builder before the client is created.
    ///
    /// the callback receives a builder that already has the extra headers,
    /// user agent, timeout, and ssl settings applied.
    ///
    /// ignored if `with_http_client` is also set.
    pub fn with_http_client_builder<F>(mut self, f: F) -> Self
    where
        F: Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + Send + Sync + 'static,
    {
        self.http_client_builder = Some(Arc::new(f));
        self
    }

    /// the query endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// configured request timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// access extra headers configured on this connection
    pub fn extra_headers(&self) -> &HeaderMap {
        &self.extra_headers
    }

    /// validate the configuration
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.endpoint_valid {
            return Err(Error::Config(format!(
                "invalid endpoint: {}",
                self.raw_endpoint
            )));
        }

        if self.endpoint.scheme() != "http" && self.endpoint.scheme() != "https" {
            return Err(Error::Config(format!(
                "invalid url scheme: {}. must be http or https",
                self.endpoint.scheme()
            )));
        }

        // the token is only optional when the caller manages the transport
        if self.http_client.is_none() && self.session_token.is_empty() {
            return Err(Error::Config("session token cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("auth_scheme", &self.auth_scheme)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("verify_ssl", &self.verify_ssl)
            .field("extra_headers", &self.extra_headers.len())
            .field("http_client", &self.http_client.is_some())
            .field("http_client_builder", &self.http_client_builder.is_some())
            .field("session_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config() {
        let config = ClientConfig::new("http://127.0.0.1:8080/query", "test-token");
        assert_eq!(config.endpoint.as_str(), "http://127.0.0.1:8080/query");
        assert_eq!(config.session_token, "test-token");
        assert_eq!(config.timeout, None);
        assert_eq!(config.auth_scheme, AuthScheme::Basic);
    }

    #[test]
    fn test_local_config() {
        let config = ClientConfig::local(4321, "token");
        assert_eq!(config.endpoint().as_str(), "http://127.0.0.1:4321/query");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_scheme_defaults_to_http() {
        let config = ClientConfig::new("127.0.0.1:9000", "token");
        assert_eq!(config.endpoint.as_str(), "http://127.0.0.1:9000/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = ClientConfig::new("http://127.0.0.1:8080/query", "token");
        assert!(config.validate().is_ok());

        let empty_token = ClientConfig::new("http://127.0.0.1:8080/query", "");
        assert!(empty_token.validate().is_err());

        // empty token is allowed when a prebuilt client handles auth
        let empty_token_prebuilt = ClientConfig::new("http://127.0.0.1:8080/query", "")
            .with_http_client(reqwest::Client::new());
        assert!(empty_token_prebuilt.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut config = ClientConfig::new("http://127.0.0.1:8080/query", "token");
        config.endpoint_valid = false;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validation_invalid_scheme() {
        let config = ClientConfig::new("ftp://example.com/query", "token");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_builder_helpers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-test"),
            HeaderValue::from_static("value"),
        );

        let config = ClientConfig::new("http://127.0.0.1:8080/query", "token")
            .with_timeout(Duration::from_secs(5))
            .with_auth_scheme(AuthScheme::Bearer)
            .with_user_agent("chainql-test")
            .with_ssl_verification(false)
            .with_headers(headers.clone())
            .with_header(
                HeaderName::from_static("x-other"),
                HeaderValue::from_static("other"),
            );

        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.auth_scheme, AuthScheme::Bearer);
        assert_eq!(config.user_agent, "chainql-test");
        assert!(!config.verify_ssl);
        assert_eq!(config.extra_headers.get("x-test").unwrap(), "value");
        assert_eq!(config.extra_headers.get("x-other").unwrap(), "other");
        assert_eq!(config.extra_headers(), &config.extra_headers);
    }

    #[test]
    fn test_with_http_client_builder() {
        let config = ClientConfig::new("http://127.0.0.1:8080/query", "token")
            .with_http_client_builder(|b| b.connection_verbose(true));
        assert!(config.http_client.is_none());
        assert!(config.http_client_builder.is_some());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig::new("http://127.0.0.1:8080/query", "secret-token");
        let debug = format!("{config:?}");
        assert!(debug.contains("\"<redacted>\""));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("http_client: false"));
    }
}
