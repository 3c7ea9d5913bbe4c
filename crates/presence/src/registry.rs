use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Serialize;

use dray_protocol::GeoPoint;

/// A live shopper session: logical identity plus the connection carrying it.
#[derive(Debug, Clone)]
pub struct ShopperSession {
    pub shopper_id: String,
    pub conn_id: String,
    pub location: Option<GeoPoint>,
    pub last_seen: SystemTime,
}

/// Read-only view of a session, safe to hand to the rest of the process.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub shopper_id: String,
    pub location: Option<GeoPoint>,
    pub last_seen_ms: u64,
}

/// Registry of live shopper sessions.
///
/// Disconnect cleanup only knows the low-level connection id, so a reverse
/// index `conn_id → shopper_id` is kept alongside the primary map for O(1)
/// removal.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// shopper_id → session
    sessions: HashMap<String, ShopperSession>,
    /// conn_id → shopper_id
    by_conn: HashMap<String, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the session for a shopper. Always succeeds; a
    /// re-register silently replaces the previous entry, including one held
    /// by a different connection.
    pub fn register(
        &mut self,
        shopper_id: &str,
        conn_id: &str,
        location: Option<GeoPoint>,
        now: SystemTime,
    ) {
        if let Some(old) = self.sessions.get(shopper_id)
            && old.conn_id != conn_id
        {
            self.by_conn.remove(&old.conn_id);
        }
        self.by_conn
            .insert(conn_id.to_string(), shopper_id.to_string());
        self.sessions.insert(shopper_id.to_string(), ShopperSession {
            shopper_id: shopper_id.to_string(),
            conn_id: conn_id.to_string(),
            location,
            last_seen: now,
        });
    }

    /// Update a shopper's position. Returns `false` (a no-op) for unknown
    /// shoppers; the caller decides whether the update also feeds clustering.
    pub fn update_location(&mut self, shopper_id: &str, location: GeoPoint, now: SystemTime) -> bool {
        match self.sessions.get_mut(shopper_id) {
            Some(session) => {
                session.location = Some(location);
                session.last_seen = now;
                true
            },
            None => false,
        }
    }

    /// Remove the session attached to a connection. `None` for handles the
    /// registry never saw (or that a re-register already displaced).
    pub fn remove_by_conn(&mut self, conn_id: &str) -> Option<ShopperSession> {
        let shopper_id = self.by_conn.remove(conn_id)?;
        self.sessions.remove(&shopper_id)
    }

    pub fn get(&self, shopper_id: &str) -> Option<&ShopperSession> {
        self.sessions.get(shopper_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        self.sessions.values().map(snapshot_of).collect()
    }

    pub fn snapshot_one(&self, shopper_id: &str) -> Option<SessionSnapshot> {
        self.sessions.get(shopper_id).map(snapshot_of)
    }
}

fn snapshot_of(session: &ShopperSession) -> SessionSnapshot {
    let last_seen_ms = session
        .last_seen
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    SessionSnapshot {
        shopper_id: session.shopper_id.clone(),
        location: session.location,
        last_seen_ms,
    }
}
