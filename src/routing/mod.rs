//! # Routing Module
//!
//! Client-side cluster routing core.
//!
//! Routes each operation to an appropriate cluster member based on whether
//! it reads or writes, tolerates membership changes and recovers
//! transparently from stale knowledge of the cluster.
//!
//! ## Core Types
//!
//! - [`LoadBalancer`] - Front door: guarantees a fresh routing table on
//!   every acquisition and selects a connection by access mode
//! - [`RoutingTable`] - Cached view of the cluster's router/reader/writer
//!   sets with per-role staleness tests
//! - [`Rediscovery`] - Refreshes the routing table via the routing
//!   procedure, with retries and bootstrap fallback
//! - [`RoutingConnection`] - Wrapper that turns transport failures into
//!   "forget this address" signals
//!
//! ## Example
//!
//! ```ignore
//! use zeta4g_routing::{AccessMode, LoadBalancer, RoutingConfig, ServerAddress};
//!
//! let config = RoutingConfig::new(ServerAddress::new("cluster.local", 7687))?;
//! let balancer = LoadBalancer::new(config, pool).await?;
//!
//! // 읽기 연결 (팔로워로 라우팅)
//! let connection = balancer.acquire(AccessMode::Read).await?;
//!
//! // 쓰기 연결 (리더로 라우팅)
//! let connection = balancer.acquire(AccessMode::Write).await?;
//! ```

mod address;
mod composition;
mod connection;
mod load_balancer;
mod provider;
mod rediscovery;
mod resolver;
mod settings;
mod table;

#[cfg(test)]
pub(crate) mod testing;

pub use address::{AddressSet, ServerAddress, DEFAULT_PORT};
pub use composition::{ClusterComposition, ServerRole};
pub use connection::{RoutingConnection, RoutingErrorHandler};
pub use load_balancer::LoadBalancer;
pub use provider::{
    ClusterCompositionProvider, RoutingProcedureRunner, GET_ROUTING_TABLE,
    GET_ROUTING_TABLE_PARAM, GET_SERVERS,
};
pub use rediscovery::{NextAttemptStrategy, Rediscovery};
pub use resolver::{DnsHostNameResolver, HostNameResolver, PassthroughResolver};
pub use settings::{RoutingConfig, RoutingContext, RoutingSettings};
pub use table::{AccessMode, RoutingTable};
