//! chainable graphql client runtime
//!
//! generated clients are thin typed wrappers over a [`Context`]: every
//! method call appends a field selection, and nothing is sent until a
//! method returning a scalar (or a list of objects) is awaited. at that
//! point the whole chain is rendered into one query, unexecuted objects
//! passed as arguments are resolved to their ids concurrently, and the
//! response is walked back into a typed value.
//!
//! ## quick start
//!
//! ```no_run
//! use chainql::{Arg, ClientConfig, Connection, Context, IntoArg};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connection = Connection::connect(ClientConfig::local(8080, "token"))?;
//! let stdout: String = Context::new(connection)
//!     .select("Query", "container", vec![])
//!     .select("Container", "from", vec![Arg::new("address", "alpine".into_arg())])
//!     .select("Container", "stdout", vec![])
//!     .execute()
//!     .await?;
//! println!("{stdout}");
//! # Ok(())
//! # }
//! ```
//!
//! ## generated clients
//!
//! use the `chainql-codegen` tool (or [`codegen::generate`] from a build
//! script) to turn a schema into a typed client module.

pub mod codegen;
mod config;
mod connection;
mod convert;
mod error;
mod graphql;
mod querybuilder;
mod session;
pub mod shared;
pub mod transport;

pub use config::{AuthScheme, ClientConfig};
pub use connection::{Connection, INTROSPECTION_QUERY};
pub use convert::{
    from_json, object_from_response, FromResponse, IdArg, IdLoader, IntoArg, IntoId, ObjectType,
    Prefetched,
};
pub use error::{Error, ExecError, QueryError, QueryErrorKind, Result};
pub use graphql::{GraphQlError, GraphQlLocation, GraphQlRequest, GraphQlResponse};
pub use querybuilder::{Arg, ArgValue, Context, LazyObject, Selection};
pub use session::{SessionParams, SESSION_PORT_ENV, SESSION_TOKEN_ENV};
