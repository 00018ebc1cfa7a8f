//! transports
//!
//! a [`Transport`] sends one graphql request and returns the parsed
//! response. [`HttpTransport`] posts to the session endpoint with reqwest;
//! [`from_fn`] wraps a closure for tests or custom channels.

use crate::config::{AuthScheme, ClientConfig};
use crate::error::{Error, Result};
use crate::graphql::{GraphQlRequest, GraphQlResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// request/response channel to the execution backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// send one request and return the parsed response.
    ///
    /// graphql errors in the body are returned as part of the response;
    /// only transport and protocol failures are errors here.
    async fn send(&self, request: GraphQlRequest) -> Result<GraphQlResponse<Value>>;
}

/// graphql over http post
#[derive(Clone)]
pub struct HttpTransport {
    endpoint: Url,
    session_token: String,
    auth_scheme: AuthScheme,
    timeout: Option<Duration>,
    http: reqwest::Client,
}

impl HttpTransport {
    /// create a new http transport
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = match &config.http_client {
            Some(http) => http.clone(),
            None => {
                let mut builder = reqwest::Client::builder()
                    .default_headers(config.extra_headers.clone())
                    .user_agent(config.user_agent.clone())
                    .danger_accept_invalid_certs(!config.verify_ssl);
                if let Some(timeout) = config.timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(customize) = &config.http_client_builder {
                    builder = customize(builder);
                }
                builder
                    .build()
                    .map_err(|err| Error::Config(format!("failed to build http client: {err}")))?
            }
        };

        Ok(Self {
            endpoint: config.endpoint.clone(),
            session_token: config.session_token.clone(),
            auth_scheme: config.auth_scheme,
            timeout: config.timeout,
            http,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.session_token.is_empty() {
            return request;
        }
        match self.auth_scheme {
            AuthScheme::Basic => request.basic_auth(&self.session_token, Some("")),
            AuthScheme::Bearer => request.bearer_auth(&self.session_token),
        }
    }

    pub(crate) async fn send_with<F, Fut>(
        &self,
        request: GraphQlRequest,
        send: F,
    ) -> Result<GraphQlResponse<Value>>
    where
        F: FnOnce(Url, Value) -> Fut,
        Fut: Future<Output = Result<(StatusCode, String)>>,
    {
        let body = serde_json::to_value(&request)?;
        let (status, text) = send(self.endpoint.clone(), body).await?;
        parse_graphql_response(status, text)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: GraphQlRequest) -> Result<GraphQlResponse<Value>> {
        self.send_with(request, |url, body| async move {
            let response = self
                .authorize(self.http.post(url))
                .json(&body)
                .send()
                .await
                .map_err(|err| translate_reqwest_error(err, self.timeout))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|err| translate_reqwest_error(err, self.timeout))?;
            Ok((status, text))
        })
        .await
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("auth_scheme", &self.auth_scheme)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn translate_reqwest_error(err: reqwest::Error, timeout: Option<Duration>) -> Error {
    if err.is_timeout() {
        Error::ExecuteTimeout { timeout }
    } else if err.is_connect() {
        Error::ClientConnection(err.to_string())
    } else {
        Error::Transport(err.to_string())
    }
}

fn parse_graphql_response(status: StatusCode, text: String) -> Result<GraphQlResponse<Value>> {
    let value: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(err) if status.is_success() => {
            return Err(Error::protocol(format!("response is not json: {err}"), text));
        }
        Err(_) => return Err(http_status_error(status, &text)),
    };

    let is_graphql = value
        .as_object()
        .is_some_and(|body| body.contains_key("data") || body.contains_key("errors"));
    if !is_graphql {
        if !status.is_success() {
            return Err(http_status_error(status, &text));
        }
        return Err(Error::protocol(
            "response has neither `data` nor `errors`",
            text,
        ));
    }

    let parsed: GraphQlResponse<Value> = serde_json::from_value(value)?;
    if !status.is_success() && parsed.errors.is_empty() {
        return Err(http_status_error(status, &text));
    }

    Ok(parsed)
}

fn http_status_error(status: StatusCode, text: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::ClientConnection(format!("session rejected: {status}"))
        }
        _ => Error::Transport(format!("graphql http error: {status}: {}", text.trim())),
    }
}

/// transport backed by a closure
pub struct FnTransport<F> {
    send: F,
}

/// build a transport from a closure
///
/// ```
/// use chainql::transport::from_fn;
/// use chainql::{Connection, GraphQlResponse};
///
/// let connection = Connection::with_transport(from_fn(|_request| async {
///     Ok(GraphQlResponse::from_data(serde_json::json!({"version": "1.0"})))
/// }));
/// ```
pub fn from_fn<F, Fut>(send: F) -> FnTransport<F>
where
    F: Fn(GraphQlRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<GraphQlResponse<Value>>> + Send + 'static,
{
    FnTransport { send }
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(GraphQlRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<GraphQlResponse<Value>>> + Send + 'static,
{
    async fn send(&self, request: GraphQlRequest) -> Result<GraphQlResponse<Value>> {
        (self.send)(request).await
    }
}
