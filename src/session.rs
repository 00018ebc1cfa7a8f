//! session bootstrap
//!
//! a session is identified by a local port and a session token. they come
//! either from the environment or from the first stdout line of a companion
//! process, encoded as json.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use serde::Deserialize;

/// environment variable holding the session port
pub const SESSION_PORT_ENV: &str = "CHAINQL_SESSION_PORT";
/// environment variable holding the session token
pub const SESSION_TOKEN_ENV: &str = "CHAINQL_SESSION_TOKEN";

/// connection parameters of a running session
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct SessionParams {
    pub port: u16,
    pub session_token: String,
}

impl SessionParams {
    /// read session parameters from the environment
    ///
    /// returns `Ok(None)` when neither variable is set.
    pub fn from_env() -> Result<Option<Self>> {
        let port = std::env::var(SESSION_PORT_ENV).ok();
        let token = std::env::var(SESSION_TOKEN_ENV).ok();
        Self::from_vars(port.as_deref(), token.as_deref())
    }

    fn from_vars(port: Option<&str>, token: Option<&str>) -> Result<Option<Self>> {
        match (port, token) {
            (None, None) => Ok(None),
            (Some(port), Some(token)) => {
                let port = port.trim().parse::<u16>().map_err(|err| {
                    Error::SessionStart(format!("invalid {SESSION_PORT_ENV} {port:?}: {err}"))
                })?;
                Ok(Some(Self {
                    port,
                    session_token: token.to_string(),
                }))
            }
            (None, Some(_)) => Err(Error::SessionStart(format!(
                "{SESSION_TOKEN_ENV} is set but {SESSION_PORT_ENV} is missing"
            ))),
            (Some(_), None) => Err(Error::SessionStart(format!(
                "{SESSION_PORT_ENV} is set but {SESSION_TOKEN_ENV} is missing"
            ))),
        }
    }

    /// parse the json line a companion process prints once its session is ready
    ///
    /// ```
    /// use chainql::SessionParams;
    ///
    /// let params = SessionParams::parse_bootstrap_line(r#"{"port": 8080, "session_token": "abc"}"#).unwrap();
    /// assert_eq!(params.port, 8080);
    /// ```
    pub fn parse_bootstrap_line(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Err(Error::SessionStart(
                "companion process exited before reporting a session".to_string(),
            ));
        }
        serde_json::from_str(line)
            .map_err(|err| Error::SessionStart(format!("invalid session bootstrap line: {err}")))
    }

    /// configuration for the local query endpoint of this session
    pub fn into_config(self) -> ClientConfig {
        ClientConfig::local(self.port, self.session_token)
    }
}

impl std::fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionParams")
            .field("port", &self.port)
            .field("session_token", &"<redacted>")
            .finish()
    }
}
