//! error types
//!
//! structured errors for config, transport, protocol, and graphql responses.

use crate::graphql::GraphQlError;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// library result type
pub type Result<T> = std::result::Result<T, Error>;

/// error type for the connection, transport, and query builder
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// the backend could not be reached or closed the connection
    #[error("failed to connect to the backend: {0}")]
    ClientConnection(String),

    /// session bootstrap parameters were missing or malformed
    #[error("failed to start session: {0}")]
    SessionStart(String),

    #[error("{}", timeout_message(.timeout))]
    ExecuteTimeout {
        /// configured request timeout, if known
        timeout: Option<Duration>,
    },

    #[error("transport error: {0}")]
    Transport(String),

    /// the server answered with something that is not a graphql response
    #[error("unexpected response: {message}")]
    Protocol {
        /// what was wrong with the response
        message: String,
        /// raw response body
        body: String,
    },

    #[error(transparent)]
    Query(#[from] QueryError),

    /// the query builder was misused (empty selection, null for a required field)
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

fn timeout_message(timeout: &Option<Duration>) -> String {
    match timeout {
        Some(timeout) => format!("request timed out after {timeout:?}"),
        None => "request timed out".to_string(),
    }
}

impl Error {
    /// true if the error is a request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ExecuteTimeout { .. })
    }

    /// true if the error came back from the backend as a graphql error
    pub fn is_query_error(&self) -> bool {
        matches!(self, Error::Query(_))
    }

    /// the structured query error, if any
    pub fn as_query_error(&self) -> Option<&QueryError> {
        match self {
            Error::Query(err) => Some(err),
            _ => None,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>, body: impl Into<String>) -> Self {
        Error::Protocol {
            message: message.into(),
            body: body.into(),
        }
    }
}

/// error returned by the backend for a specific query
#[derive(Debug, Clone)]
pub struct QueryError {
    /// all structured error records from the response
    pub errors: Vec<GraphQlError>,
    /// query document that produced the error
    pub query: String,
    /// kind selected from the first error's `_type` extension
    pub kind: QueryErrorKind,
}

/// specialized error kinds keyed by the `_type` extension
#[derive(Debug, Clone, PartialEq)]
pub enum QueryErrorKind {
    Generic,
    Exec(ExecError),
}

/// a command executed by the backend exited with a non-zero code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecError {
    pub cmd: Vec<String>,
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

impl QueryError {
    /// build a query error from the response error list
    pub fn new(errors: Vec<GraphQlError>, query: impl Into<String>) -> Self {
        let kind = errors
            .first()
            .and_then(|err| err.extensions.as_ref())
            .map(QueryErrorKind::from_extensions)
            .unwrap_or(QueryErrorKind::Generic);
        Self {
            errors,
            query: query.into(),
            kind,
        }
    }

    /// first error message
    pub fn message(&self) -> &str {
        self.errors
            .first()
            .map(|err| err.message.as_str())
            .unwrap_or("unknown error")
    }

    /// exec details if this is an exec error
    pub fn exec(&self) -> Option<&ExecError> {
        match &self.kind {
            QueryErrorKind::Exec(exec) => Some(exec),
            QueryErrorKind::Generic => None,
        }
    }

    /// render the query with line numbers and a caret under each error location
    pub fn debug_query(&self) -> String {
        let locations: Vec<_> = self
            .errors
            .iter()
            .flat_map(|err| err.locations.iter())
            .collect();
        let lines: Vec<&str> = self.query.lines().collect();
        let width = lines.len().to_string().len();

        let mut out = String::new();
        for (idx, line) in lines.iter().enumerate() {
            let number = idx as i64 + 1;
            out.push_str(&format!("{number:>width$}: {line}\n"));
            for location in locations.iter().filter(|loc| loc.line == number) {
                let column = location.column.max(1) as usize;
                out.push_str(&" ".repeat(width + 2 + column - 1));
                out.push_str("^\n");
            }
        }
        out
    }
}

impl QueryErrorKind {
    fn from_extensions(extensions: &Map<String, Value>) -> Self {
        match extensions.get("_type").and_then(Value::as_str) {
            Some("EXEC_ERROR") => ExecError::from_extensions(extensions)
                .map(QueryErrorKind::Exec)
                .unwrap_or(QueryErrorKind::Generic),
            _ => QueryErrorKind::Generic,
        }
    }
}

impl ExecError {
    fn from_extensions(extensions: &Map<String, Value>) -> Option<Self> {
        let text = |key: &str| {
            extensions
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let cmd = extensions
            .get("cmd")?
            .as_array()?
            .iter()
            .filter_map(|arg| arg.as_str().map(str::to_string))
            .collect();
        Some(Self {
            cmd,
            exit_code: extensions.get("exitCode")?.as_i64()?,
            stdout: text("stdout"),
            stderr: text("stderr"),
        })
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            QueryErrorKind::Exec(exec) => write!(f, "{exec}"),
            QueryErrorKind::Generic => write!(f, "{}", self.message()),
        }
    }
}

impl std::error::Error for QueryError {}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "process \"{}\" did not complete successfully: exit code: {}",
            self.cmd.join(" "),
            self.exit_code
        )?;
        if !self.stdout.is_empty() {
            write!(f, "\n\nstdout:\n{}", self.stdout)?;
        }
        if !self.stderr.is_empty() {
            write!(f, "\n\nstderr:\n{}", self.stderr)?;
        }
        Ok(())
    }
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::GraphQlLocation;
    use serde_json::json;

    fn graphql_error(message: &str, extensions: Option<Value>) -> GraphQlError {
        GraphQlError {
            message: message.to_string(),
            locations: vec![],
            path: vec![],
            extensions: extensions.and_then(|ext| ext.as_object().cloned()),
        }
    }

    #[test]
    fn test_exec_error_kind() {
        let err = QueryError::new(
            vec![graphql_error(
                "boom",
                Some(json!({
                    "_type": "EXEC_ERROR",
                    "cmd": ["false"],
                    "exitCode": 1,
                    "stdout": "",
                    "stderr": "boom",
                })),
            )],
            "query{ok}",
        );

        let exec = err.exec().expect("exec error");
        assert_eq!(exec.exit_code, 1);
        assert_eq!(exec.cmd, vec!["false".to_string()]);
        assert_eq!(exec.stderr, "boom");
        assert!(err.to_string().contains("exit code: 1"));
    }

    #[test]
    fn test_unknown_type_falls_back_to_generic() {
        let err = QueryError::new(
            vec![
                graphql_error("first", Some(json!({"_type": "SOMETHING_ELSE"}))),
                graphql_error("second", None),
            ],
            "query{ok}",
        );
        assert_eq!(err.kind, QueryErrorKind::Generic);
        assert_eq!(err.errors.len(), 2);
        assert_eq!(err.to_string(), "first");
    }

    #[test]
    fn test_exec_error_missing_exit_code_is_generic() {
        let err = QueryError::new(
            vec![graphql_error("boom", Some(json!({"_type": "EXEC_ERROR"})))],
            "query{ok}",
        );
        assert_eq!(err.kind, QueryErrorKind::Generic);
    }

    #[test]
    fn test_debug_query_marks_column() {
        let mut error = graphql_error("bad field", None);
        error.locations = vec![GraphQlLocation { line: 2, column: 3 }];
        let err = QueryError::new(vec![error], "query {\n  nope\n}");
        let rendered = err.debug_query();
        assert_eq!(rendered, "1: query {\n2:   nope\n     ^\n3: }\n");
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::ExecuteTimeout {
            timeout: Some(Duration::from_secs(5)),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "request timed out after 5s");
    }
}
