//! In-memory presence state: live shopper sessions and their geographic
//! clusters.
//!
//! Everything here is synchronous and lock-free; the gateway owns instances
//! of [`registry::SessionRegistry`] and [`cluster::ClusterIndex`] behind its
//! own locks and serializes access. Nothing in this crate performs I/O.

pub mod cluster;
pub mod geo;
pub mod registry;

pub use {
    cluster::{Cluster, ClusterIndex, ClusterSnapshot},
    registry::{SessionRegistry, SessionSnapshot, ShopperSession},
};
