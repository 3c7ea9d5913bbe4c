use std::{
    collections::BTreeSet,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {serde::Serialize, tracing::debug};

use dray_protocol::GeoPoint;

use crate::geo::haversine_km;

/// Clustering radius used when none is configured.
pub const DEFAULT_RADIUS_KM: f64 = 2.0;

/// A fixed-radius geographic grouping of shoppers.
///
/// The center is pinned at creation and never recomputed as members move;
/// membership only grows. Clusters are an approximation for a dispatch
/// process to query, not a faithful partition of current positions.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: String,
    pub center: GeoPoint,
    members: BTreeSet<String>,
    pub last_updated: SystemTime,
}

impl Cluster {
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    pub fn contains(&self, shopper_id: &str) -> bool {
        self.members.contains(shopper_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Read-only view of a cluster for the host process and the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSnapshot {
    pub id: String,
    pub center: GeoPoint,
    pub members: Vec<String>,
    pub last_updated_ms: u64,
}

/// Incremental, first-match cluster index.
///
/// Scan order is creation order, oldest first, and the scan stops at the
/// first cluster within the radius even when a later one is closer. That
/// asymmetry is intentional: it keeps assignment O(clusters) with no
/// re-balancing, at the cost of greedy membership.
#[derive(Debug)]
pub struct ClusterIndex {
    clusters: Vec<Cluster>,
    radius_km: f64,
    seq: u64,
}

impl ClusterIndex {
    pub fn new(radius_km: f64) -> Self {
        Self {
            clusters: Vec::new(),
            radius_km,
            seq: 0,
        }
    }

    /// Place a shopper's position into a cluster, creating one when nothing
    /// is within the radius. Returns the id of the cluster the shopper now
    /// belongs to.
    ///
    /// A non-finite position yields NaN distances, matches nothing, and ends
    /// up in its own never-again-matched cluster rather than an error.
    pub fn assign(&mut self, shopper_id: &str, point: GeoPoint, now: SystemTime) -> String {
        for cluster in &mut self.clusters {
            if haversine_km(point, cluster.center) <= self.radius_km {
                cluster.members.insert(shopper_id.to_string());
                cluster.last_updated = now;
                return cluster.id.clone();
            }
        }

        let id = self.next_id(now);
        debug!(cluster = %id, lat = point.lat, lng = point.lng, "new location cluster");
        let mut members = BTreeSet::new();
        members.insert(shopper_id.to_string());
        self.clusters.push(Cluster {
            id: id.clone(),
            center: point,
            members,
            last_updated: now,
        });
        id
    }

    /// Drop whole clusters that have seen no update for `ttl`. Membership
    /// within surviving clusters is untouched. Returns how many were removed.
    pub fn expire_idle(&mut self, ttl: Duration, now: SystemTime) -> usize {
        let before = self.clusters.len();
        self.clusters
            .retain(|c| now.duration_since(c.last_updated).unwrap_or_default() <= ttl);
        before - self.clusters.len()
    }

    pub fn get(&self, cluster_id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == cluster_id)
    }

    /// Member ids of one cluster, or `None` for an unknown id.
    pub fn members_of(&self, cluster_id: &str) -> Option<Vec<String>> {
        self.get(cluster_id)
            .map(|c| c.members().map(str::to_string).collect())
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn snapshot(&self) -> Vec<ClusterSnapshot> {
        self.clusters
            .iter()
            .map(|c| ClusterSnapshot {
                id: c.id.clone(),
                center: c.center,
                members: c.members().map(str::to_string).collect(),
                last_updated_ms: c
                    .last_updated
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0),
            })
            .collect()
    }

    /// Time-derived id: creation unix-millis plus a process-local sequence so
    /// two clusters born in the same millisecond stay distinct.
    fn next_id(&mut self, now: SystemTime) -> String {
        let ms = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.seq += 1;
        format!("cluster-{ms}-{}", self.seq)
    }
}

impl Default for ClusterIndex {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_KM)
    }
}
