use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use dray_config::DrayConfig;

use crate::state::GatewayState;

/// Spawn the periodic maintenance task, if anything is configured to run.
///
/// Two jobs share the timer: the external stale-log purge (an HTTP call to
/// the host application, no shared state with presence) and the optional
/// cluster TTL sweep. With neither configured, no task is spawned.
pub fn spawn(state: Arc<GatewayState>, config: &DrayConfig) -> Option<tokio::task::JoinHandle<()>> {
    let cleanup_url = config.maintenance.log_cleanup_url.clone();
    let cluster_ttl = config.clustering.cluster_ttl_secs.map(Duration::from_secs);
    if cleanup_url.is_none() && cluster_ttl.is_none() {
        return None;
    }

    let period = Duration::from_secs(config.maintenance.interval_secs.max(1));
    let client = reqwest::Client::new();

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; skip it so work starts one
        // full period after boot.
        interval.tick().await;
        loop {
            interval.tick().await;

            if let Some(ttl) = cluster_ttl {
                let dropped = state.expire_idle_clusters(ttl).await;
                if dropped > 0 {
                    debug!(dropped, "swept idle clusters");
                }
            }

            if let Some(url) = cleanup_url.as_deref() {
                match client.post(url).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        debug!(url, "log cleanup triggered");
                    },
                    Ok(resp) => {
                        warn!(url, status = %resp.status(), "log cleanup returned an error");
                    },
                    Err(e) => {
                        warn!(url, error = %e, "log cleanup request failed");
                    },
                }
            }
        }
    }))
}
