//! # Service Provider Interface
//!
//! Contracts the routing core consumes from the transport layer.
//!
//! The routing core never speaks the wire protocol itself. A driver embeds
//! the core by implementing two traits against its own transport:
//!
//! - [`Connection`] - an open connection that can run a server procedure and
//!   report the server version
//! - [`ConnectionPool`] - per-address pooling with `acquire` / `purge` /
//!   `active_connections`
//!
//! The [`Record`] / [`Value`] model is the minimal result shape the routing
//! procedure returns; [`ServerVersion`] selects between the legacy and the
//! parameterized routing procedure.

mod connection;
mod record;
mod version;

pub use connection::{Connection, ConnectionPool};
pub use record::{Record, Value};
pub use version::ServerVersion;
