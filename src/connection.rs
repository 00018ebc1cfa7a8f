//! backend connection
//!
//! a [`Connection`] owns the transport to a running session. it is cheap to
//! clone and every query context holds one.

use crate::config::ClientConfig;
use crate::error::{Error, QueryError, Result};
use crate::graphql::{GraphQlRequest, GraphQlResponse};
use crate::session::SessionParams;
use crate::transport::{HttpTransport, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// standard introspection query used to fetch a schema from a live session
pub const INTROSPECTION_QUERY: &str = r#"query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    types { ...FullType }
  }
}

fragment FullType on __Type {
  kind
  name
  description
  fields(includeDeprecated: true) {
    name
    description
    args { ...InputValue }
    type { ...TypeRef }
    isDeprecated
    deprecationReason
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) {
    name
    description
    isDeprecated
    deprecationReason
  }
  possibleTypes { ...TypeRef }
}

fragment InputValue on __InputValue {
  name
  description
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
        }
      }
    }
  }
}
"#;

/// live channel to an execution backend
#[derive(Clone)]
pub struct Connection {
    transport: Arc<dyn Transport>,
}

impl Connection {
    /// connect over http using `config`
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        tracing::debug!(endpoint = %config.endpoint(), "connecting to session");
        Ok(Self::with_transport(transport))
    }

    /// connect to the session described by the environment
    pub fn from_env() -> Result<Self> {
        let params = SessionParams::from_env()?.ok_or_else(|| {
            Error::ClientConnection(format!(
                "no session configured: set {} and {}",
                crate::session::SESSION_PORT_ENV,
                crate::session::SESSION_TOKEN_ENV
            ))
        })?;
        Self::connect(params.into_config())
    }

    /// use a custom transport
    pub fn with_transport<T: Transport + 'static>(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// send a request as-is; graphql errors stay in the response
    pub async fn send(&self, request: GraphQlRequest) -> Result<GraphQlResponse<Value>> {
        self.transport.send(request).await
    }

    /// execute a raw graphql query
    pub async fn execute_raw(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<GraphQlResponse<Value>> {
        let mut request = GraphQlRequest::new(query);
        request.variables = variables;
        let response = self.send(request).await?;
        if response.has_errors() {
            return Err(QueryError::new(response.errors, query).into());
        }
        Ok(response)
    }

    /// execute a raw graphql query and deserialize its data
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T> {
        let response = self.execute_raw(query, variables).await?;
        let data = response.data.unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }

    /// fetch the schema of the session as an introspection result
    pub async fn introspect(&self) -> Result<Value> {
        self.execute(INTROSPECTION_QUERY, None).await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}
