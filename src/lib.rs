//! # Zeta4G Routing
//!
//! Client-side cluster routing core for [Zeta4G](https://github.com/zeta9044/zeta4g)
//! graph database drivers.
//!
//! ## Features
//!
//! - **Access-Mode Routing** - Read operations go to followers, writes to the leader
//! - **Rediscovery** - Routing tables refresh themselves via the cluster routing
//!   procedure, with bounded retries and bootstrap fallback
//! - **Least-Connected Selection** - Traffic migrates away from hot servers, with
//!   round-robin rotation under equal load
//! - **Failure Recovery** - Broken servers are forgotten and their pooled
//!   connections purged, transparently to the caller
//! - **Async/Await** - Built on Tokio; a blocking entry point wraps the same core
//!
//! ## Quick Start
//!
//! The core is transport-agnostic: a driver embeds it by implementing the
//! [`spi::Connection`] and [`spi::ConnectionPool`] contracts against its own
//! wire protocol, then routes every acquisition through the [`LoadBalancer`].
//!
//! ```ignore
//! use zeta4g_routing::{AccessMode, LoadBalancer, RoutingConfig, ServerAddress};
//!
//! // Bootstrap from a single cluster member
//! let config = RoutingConfig::new(ServerAddress::new("cluster.local", 7687))?;
//! let balancer = LoadBalancer::new(config, pool).await?;
//!
//! // Acquire by access mode; the routing table refreshes itself when stale
//! let read_connection = balancer.acquire(AccessMode::Read).await?;
//! let write_connection = balancer.acquire(AccessMode::Write).await?;
//! ```
//!
//! ## Routing Context
//!
//! Key/value metadata can be forwarded to the cluster so it returns topology
//! appropriate to this client (e.g. by data-center):
//!
//! ```
//! use zeta4g_routing::RoutingContext;
//!
//! let context = RoutingContext::empty()
//!     .with_entry("region", "ap-northeast-2")
//!     .with_entry("policy", "read-replicas");
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`RoutingResult`]:
//!
//! - [`RoutingError::ServiceUnavailable`] - rediscovery exhausted all routers;
//!   the cluster is unreachable
//! - [`RoutingError::SessionExpired`] - the selected server stopped being
//!   suitable; re-acquire to continue
//! - [`RoutingError::Authentication`] - never swallowed, never retried
//!
//! ## Modules
//!
//! - [`routing`] - Routing table, rediscovery, load balancer
//! - [`spi`] - Contracts consumed from the transport/pool layer
//! - [`clock`] - Injectable time source
//! - [`error`] - Error types

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod clock;
pub mod error;
pub mod routing;
pub mod spi;

// Re-exports for convenience
pub use clock::{Clock, MonotonicClock};
pub use error::{RoutingError, RoutingResult, ServerError};
pub use routing::{
    AccessMode, AddressSet, ClusterComposition, ClusterCompositionProvider, DnsHostNameResolver,
    HostNameResolver, LoadBalancer, NextAttemptStrategy, PassthroughResolver, Rediscovery,
    RoutingConfig, RoutingConnection, RoutingContext, RoutingErrorHandler, RoutingProcedureRunner,
    RoutingSettings, RoutingTable, ServerAddress, ServerRole,
};
pub use spi::{Connection, ConnectionPool, Record, ServerVersion, Value};
