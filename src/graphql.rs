//! graphql types
//!
//! wire types for graphql requests, responses, and errors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// graphql request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlRequest {
    /// query document
    pub query: String,
    /// query variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    /// operation to run when the document has several
    #[serde(
        default,
        rename = "operationName",
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

impl GraphQlRequest {
    /// request for a single query document without variables
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation_name: None,
        }
    }

    /// attach variables
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }
}

/// graphql response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    /// response data or null if errors
    pub data: Option<T>,
    /// graphql errors array
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
    /// optional response extensions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl<T> GraphQlResponse<T> {
    /// successful response carrying `data`
    pub fn from_data(data: T) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
            extensions: None,
        }
    }

    /// true if the response contains graphql errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// graphql error entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    /// error message
    pub message: String,
    /// error locations in the query
    #[serde(default)]
    pub locations: Vec<GraphQlLocation>,
    /// response path
    #[serde(default)]
    pub path: Vec<Value>,
    /// optional extensions payload
    #[serde(default)]
    pub extensions: Option<Map<String, Value>>,
}

/// graphql error location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlLocation {
    /// line number (1-based)
    pub line: i64,
    /// column number (1-based)
    pub column: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_errors() {
        let ok = GraphQlResponse::from_data(json!({"ok": true}));
        assert!(!ok.has_errors());

        let err = GraphQlResponse::<Value> {
            data: None,
            errors: vec![GraphQlError {
                message: "boom".to_string(),
                locations: vec![],
                path: vec![],
                extensions: None,
            }],
            extensions: None,
        };
        assert!(err.has_errors());
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GraphQlRequest::new("query{ok}")).unwrap();
        assert_eq!(body, json!({"query": "query{ok}"}));

        let mut request = GraphQlRequest::new("query Q{ok}").with_variables(json!({"a": 1}));
        request.operation_name = Some("Q".to_string());
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["operationName"], "Q");
        assert_eq!(body["variables"]["a"], 1);
    }

    #[test]
    fn test_error_extensions_parse() {
        let err: GraphQlError = serde_json::from_value(json!({
            "message": "boom",
            "locations": [{"line": 1, "column": 2}],
            "path": ["container", 0],
            "extensions": {"_type": "EXEC_ERROR"},
        }))
        .unwrap();
        assert_eq!(err.locations[0].column, 2);
        assert_eq!(err.path.len(), 2);
        assert_eq!(err.extensions.unwrap()["_type"], "EXEC_ERROR");
    }
}
