use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrayConfig {
    pub gateway: GatewaySection,
    pub clustering: ClusteringSection,
    pub maintenance: MaintenanceSection,
}

/// Listener settings for the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 4178,
        }
    }
}

/// Geo-clustering knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSection {
    /// Radius in kilometres within which a position joins an existing
    /// cluster.
    pub radius_km: f64,

    /// When set, clusters idle for this many seconds are swept by the
    /// maintenance timer. Unset means clusters live for the process
    /// lifetime.
    pub cluster_ttl_secs: Option<u64>,
}

impl Default for ClusteringSection {
    fn default() -> Self {
        Self {
            radius_km: 2.0,
            cluster_ttl_secs: None,
        }
    }
}

/// The scheduled stale-log purge. The endpoint belongs to the host
/// application; the gateway only fires the request on a timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceSection {
    /// External cleanup endpoint. Unset disables the timer entirely.
    pub log_cleanup_url: Option<String>,

    /// Seconds between cleanup calls (and TTL sweeps, when enabled).
    pub interval_secs: u64,
}

impl Default for MaintenanceSection {
    fn default() -> Self {
        Self {
            log_cleanup_url: None,
            interval_secs: 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: DrayConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.gateway.bind, "127.0.0.1");
        assert_eq!(cfg.gateway.port, 4178);
        assert_eq!(cfg.clustering.radius_km, 2.0);
        assert!(cfg.clustering.cluster_ttl_secs.is_none());
        assert!(cfg.maintenance.log_cleanup_url.is_none());
        assert_eq!(cfg.maintenance.interval_secs, 3600);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: DrayConfig = toml::from_str(
            r#"
            [clustering]
            radius_km = 5.0
            cluster_ttl_secs = 900
            "#,
        )
        .unwrap();
        assert_eq!(cfg.clustering.radius_km, 5.0);
        assert_eq!(cfg.clustering.cluster_ttl_secs, Some(900));
        assert_eq!(cfg.gateway.port, 4178);
    }
}
