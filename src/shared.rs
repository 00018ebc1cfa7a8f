//! process-wide shared connection
//!
//! the shared connection is established lazily on first use, from the
//! configuration passed to [`configure`] or from the session environment.
//! once established its configuration is locked until [`close`].

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::Result;
use std::sync::{Mutex, MutexGuard};

struct Shared {
    config: Option<ClientConfig>,
    connection: Option<Connection>,
}

static SHARED: Mutex<Shared> = Mutex::new(Shared {
    config: None,
    connection: None,
});

fn lock() -> MutexGuard<'static, Shared> {
    SHARED.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// set the configuration used to establish the shared connection
///
/// returns false (and logs a warning) if the connection is already
/// established; the active session is left untouched.
pub fn configure(config: ClientConfig) -> bool {
    let mut shared = lock();
    if shared.connection.is_some() {
        tracing::warn!("shared connection already established, ignoring new configuration");
        return false;
    }
    shared.config = Some(config);
    true
}

/// the shared connection, establishing it on first use
pub fn connection() -> Result<Connection> {
    let mut shared = lock();
    if let Some(connection) = &shared.connection {
        return Ok(connection.clone());
    }

    let connection = match &shared.config {
        Some(config) => Connection::connect(config.clone())?,
        None => Connection::from_env()?,
    };
    tracing::debug!("shared connection established");
    shared.connection = Some(connection.clone());
    Ok(connection)
}

/// true once [`connection`] has established the session
pub fn is_established() -> bool {
    lock().connection.is_some()
}

/// drop the shared session; the next [`connection`] call establishes a new one
pub fn close() {
    let mut shared = lock();
    if shared.connection.take().is_some() {
        tracing::debug!("shared connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // one test owns the global state for the whole lifecycle
    #[test]
    fn test_shared_lifecycle() {
        close();

        assert!(configure(ClientConfig::local(7001, "first")));
        assert!(!is_established());

        let first = connection().unwrap();
        assert!(is_established());
        let _again = connection().unwrap();

        // reconfiguring an established session is rejected
        assert!(!configure(ClientConfig::local(7002, "second")));

        drop(first);
        close();
        assert!(!is_established());

        assert!(configure(ClientConfig::local(7003, "third")));
        connection().unwrap();
        assert!(is_established());
        close();
    }
}
