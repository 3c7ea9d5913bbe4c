use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use tokio::sync::{RwLock, mpsc};

use {
    dray_presence::{ClusterIndex, ClusterSnapshot, SessionRegistry, SessionSnapshot},
    dray_protocol::GeoPoint,
};

// ── Connected client ─────────────────────────────────────────────────────────

/// A WebSocket client currently connected to the gateway.
#[derive(Debug)]
pub struct ConnectedClient {
    pub conn_id: String,
    pub remote_ip: Option<String>,
    /// Channel for sending serialized frames to this client's write loop.
    pub sender: mpsc::UnboundedSender<String>,
    pub connected_at: Instant,
}

impl ConnectedClient {
    /// Send a serialized JSON frame to this client.
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(frame.to_string()).is_ok()
    }
}

// ── Gateway state ────────────────────────────────────────────────────────────

/// Shared gateway runtime state, wrapped in Arc for use across async tasks.
///
/// Both presence maps live here, each behind its own lock; handlers release
/// the registry guard before touching the cluster index, so lock order is
/// fixed and mutations on each map are serialized.
pub struct GatewayState {
    /// All connected WebSocket clients, keyed by conn_id.
    clients: RwLock<HashMap<String, ConnectedClient>>,
    /// Live shopper sessions.
    registry: RwLock<SessionRegistry>,
    /// Append-only location clusters.
    clusters: RwLock<ClusterIndex>,
    /// Server version string.
    pub version: String,
}

impl GatewayState {
    pub fn new(radius_km: f64) -> Arc<Self> {
        Arc::new(Self {
            clients: RwLock::new(HashMap::new()),
            registry: RwLock::new(SessionRegistry::new()),
            clusters: RwLock::new(ClusterIndex::new(radius_km)),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    // ── Connection lifecycle ─────────────────────────────────────────────

    /// Track a new client connection.
    pub async fn register_client(&self, client: ConnectedClient) {
        let conn_id = client.conn_id.clone();
        self.clients.write().await.insert(conn_id, client);
    }

    /// Tear down a connection: drop the client entry and whatever session
    /// was registered on this handle. Cluster membership is left as-is.
    pub async fn close_client(&self, conn_id: &str) -> Option<ConnectedClient> {
        self.registry.write().await.remove_by_conn(conn_id);
        self.clients.write().await.remove(conn_id)
    }

    /// Number of connected clients (registered or not).
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Queue a serialized frame for one connection. `false` when the handle
    /// is unknown or its write loop has already gone away.
    pub async fn send_to_conn(&self, conn_id: &str, frame: &str) -> bool {
        match self.clients.read().await.get(conn_id) {
            Some(client) => client.send(frame),
            None => false,
        }
    }

    // ── Presence operations ──────────────────────────────────────────────

    /// Create or overwrite the session for a shopper on this connection.
    /// Always succeeds. An initial location counts as a first position
    /// report and feeds the cluster index.
    pub async fn register_shopper(
        &self,
        shopper_id: &str,
        conn_id: &str,
        location: Option<GeoPoint>,
    ) {
        let now = SystemTime::now();
        self.registry
            .write()
            .await
            .register(shopper_id, conn_id, location, now);
        if let Some(point) = location {
            self.clusters.write().await.assign(shopper_id, point, now);
        }
    }

    /// Record a position report. Unknown shoppers are a silent no-op
    /// (`None`); known shoppers also feed the cluster index, and the id of
    /// the cluster the position landed in comes back.
    pub async fn update_location(&self, shopper_id: &str, location: GeoPoint) -> Option<String> {
        let now = SystemTime::now();
        let known = self
            .registry
            .write()
            .await
            .update_location(shopper_id, location, now);
        if !known {
            return None;
        }
        Some(self.clusters.write().await.assign(shopper_id, location, now))
    }

    // ── Read accessors for the host process ──────────────────────────────

    pub async fn get_session(&self, shopper_id: &str) -> Option<SessionSnapshot> {
        self.registry.read().await.snapshot_one(shopper_id)
    }

    pub async fn session_count(&self) -> usize {
        self.registry.read().await.len()
    }

    pub async fn list_sessions(&self) -> Vec<SessionSnapshot> {
        self.registry.read().await.snapshot()
    }

    pub async fn list_clusters(&self) -> Vec<ClusterSnapshot> {
        self.clusters.read().await.snapshot()
    }

    pub async fn list_cluster_members(&self, cluster_id: &str) -> Option<Vec<String>> {
        self.clusters.read().await.members_of(cluster_id)
    }

    pub async fn cluster_count(&self) -> usize {
        self.clusters.read().await.len()
    }

    // ── Maintenance hooks ────────────────────────────────────────────────

    /// Sweep clusters idle for longer than `ttl`. Returns how many were
    /// dropped.
    pub async fn expire_idle_clusters(&self, ttl: Duration) -> usize {
        self.clusters
            .write()
            .await
            .expire_idle(ttl, SystemTime::now())
    }
}
