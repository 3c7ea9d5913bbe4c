use std::{net::SocketAddr, sync::Arc, time::Instant};

use {
    axum::extract::ws::{Message, WebSocket},
    futures::{SinkExt, StreamExt},
    tokio::sync::mpsc,
    tracing::{debug, info, trace},
};

use dray_protocol::{ClientFrame, ServerFrame, decode_client_frame};

use crate::state::{ConnectedClient, GatewayState};

/// Drive one client connection until it closes.
///
/// A connection moves through unregistered → registered → closed, but only
/// the registry knows which shopper (if any) it carries; the event loop
/// itself is stateless and every inbound frame is handled the same way in
/// any state. Replies go only to this connection's write queue — nothing is
/// broadcast.
pub async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>, addr: SocketAddr) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Write loop: drain the outbound queue into the socket.
    let write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    state
        .register_client(ConnectedClient {
            conn_id: conn_id.clone(),
            remote_ip: Some(addr.ip().to_string()),
            sender: tx,
            connected_at: Instant::now(),
        })
        .await;
    debug!(conn_id, %addr, "client connected");

    // Read loop: decode, dispatch, reply.
    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };
        match msg {
            Message::Text(text) => {
                match decode_client_frame(text.as_str()) {
                    Ok(frame) => {
                        // Replies are routed by connection handle so they can
                        // only ever reach the connection that sent the event.
                        if let Some(reply) = dispatch(&state, &conn_id, frame).await
                            && let Ok(json) = reply.to_json()
                        {
                            state.send_to_conn(&conn_id, &json).await;
                        }
                    },
                    // Malformed frames are dropped without a reply.
                    Err(e) => trace!(conn_id, error = %e, "dropping undecodable frame"),
                }
            },
            Message::Close(_) => break,
            // Binary frames are not part of the protocol; ping/pong is
            // handled by the transport.
            _ => {},
        }
    }

    state.close_client(&conn_id).await;
    write_task.abort();
    debug!(conn_id, "client disconnected");
}

/// Route one decoded frame. Returns the reply to send back on the same
/// connection, if the event has one.
pub(crate) async fn dispatch(
    state: &Arc<GatewayState>,
    conn_id: &str,
    frame: ClientFrame,
) -> Option<ServerFrame> {
    match frame {
        ClientFrame::ShopperRegister { user_id, location } => {
            state.register_shopper(&user_id, conn_id, location).await;
            info!(conn_id, shopper = %user_id, "shopper registered");
            Some(ServerFrame::registered(user_id))
        },
        ClientFrame::LocationUpdate { user_id, location } => {
            match state.update_location(&user_id, location).await {
                Some(cluster_id) => {
                    trace!(shopper = %user_id, cluster = %cluster_id, "location update")
                },
                // Unknown shopper: ignored, per the registry contract.
                None => trace!(shopper = %user_id, "location update for unknown shopper"),
            }
            None
        },
        // Order acknowledgements are pure echoes; entitlement checks belong
        // to the dispatch service, which never routes through this socket.
        ClientFrame::AcceptOrder { order_id } => Some(ServerFrame::order_accepted(order_id)),
        ClientFrame::RejectOrder { order_id } => Some(ServerFrame::order_rejected(order_id)),
        ClientFrame::Ping => Some(ServerFrame::Pong),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use dray_protocol::GeoPoint;

    fn state() -> Arc<GatewayState> {
        GatewayState::new(2.0)
    }

    #[tokio::test]
    async fn register_creates_session_and_acks() {
        let state = state();
        let reply = dispatch(
            &state,
            "c1",
            ClientFrame::ShopperRegister {
                user_id: "w1".into(),
                location: Some(GeoPoint::new(-1.95, 30.06)),
            },
        )
        .await;

        assert_eq!(reply, Some(ServerFrame::Registered {
            success: true,
            user_id: "w1".into(),
        }));
        assert!(state.get_session("w1").await.is_some());
        // The initial location seeds a cluster right away.
        assert_eq!(state.cluster_count().await, 1);
    }

    #[tokio::test]
    async fn register_without_location_creates_no_cluster() {
        let state = state();
        dispatch(&state, "c1", ClientFrame::ShopperRegister {
            user_id: "w1".into(),
            location: None,
        })
        .await;

        assert!(state.get_session("w1").await.is_some());
        assert_eq!(state.cluster_count().await, 0);
    }

    #[tokio::test]
    async fn location_update_clusters_and_stays_silent() {
        let state = state();
        dispatch(&state, "c1", ClientFrame::ShopperRegister {
            user_id: "w1".into(),
            location: None,
        })
        .await;

        let reply = dispatch(&state, "c1", ClientFrame::LocationUpdate {
            user_id: "w1".into(),
            location: GeoPoint::new(-1.95, 30.06),
        })
        .await;

        assert_eq!(reply, None);
        assert_eq!(state.cluster_count().await, 1);
    }

    #[tokio::test]
    async fn location_update_for_unknown_shopper_is_dropped() {
        let state = state();
        let reply = dispatch(&state, "c1", ClientFrame::LocationUpdate {
            user_id: "ghost".into(),
            location: GeoPoint::new(0.0, 0.0),
        })
        .await;

        assert_eq!(reply, None);
        assert_eq!(state.cluster_count().await, 0);
        assert_eq!(state.session_count().await, 0);
    }

    #[tokio::test]
    async fn order_ack_needs_no_registration() {
        let state = state();
        let reply = dispatch(&state, "c1", ClientFrame::AcceptOrder {
            order_id: "X".into(),
        })
        .await;
        assert_eq!(reply, Some(ServerFrame::OrderAccepted {
            order_id: "X".into(),
            success: true,
        }));

        let reply = dispatch(&state, "c1", ClientFrame::RejectOrder {
            order_id: "X".into(),
        })
        .await;
        assert_eq!(reply, Some(ServerFrame::OrderRejected {
            order_id: "X".into(),
            success: true,
        }));
    }

    #[tokio::test]
    async fn ping_pongs_in_any_state() {
        let state = state();
        assert_eq!(
            dispatch(&state, "c1", ClientFrame::Ping).await,
            Some(ServerFrame::Pong)
        );
    }

    #[tokio::test]
    async fn disconnect_removes_session_but_not_cluster_membership() {
        let state = state();
        dispatch(&state, "c1", ClientFrame::ShopperRegister {
            user_id: "w1".into(),
            location: None,
        })
        .await;
        dispatch(&state, "c1", ClientFrame::LocationUpdate {
            user_id: "w1".into(),
            location: GeoPoint::new(-1.95, 30.06),
        })
        .await;

        state.close_client("c1").await;

        assert_eq!(state.session_count().await, 0);
        let clusters = state.list_clusters().await;
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec!["w1".to_string()]);
    }

    #[tokio::test]
    async fn two_nearby_shoppers_share_a_cluster() {
        let state = state();
        // w1 registers with its position up front; w2 reports in afterwards
        // from ≈1.4 km away.
        dispatch(&state, "c1", ClientFrame::ShopperRegister {
            user_id: "w1".into(),
            location: Some(GeoPoint::new(-1.95, 30.06)),
        })
        .await;
        dispatch(&state, "c2", ClientFrame::ShopperRegister {
            user_id: "w2".into(),
            location: None,
        })
        .await;
        dispatch(&state, "c2", ClientFrame::LocationUpdate {
            user_id: "w2".into(),
            location: GeoPoint::new(-1.96, 30.07),
        })
        .await;

        let clusters = state.list_clusters().await;
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![
            "w1".to_string(),
            "w2".to_string()
        ]);

        let members = state.list_cluster_members(&clusters[0].id).await;
        assert_eq!(members, Some(vec!["w1".to_string(), "w2".to_string()]));
    }
}
