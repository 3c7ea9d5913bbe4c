//! Wire protocol for the shopper presence gateway.
//!
//! Frames are JSON text messages tagged on the `event` field. The enums here
//! are the closed set of shapes the gateway understands; anything that does
//! not decode into [`ClientFrame`] is dropped at the transport boundary.

use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

/// Protocol revision, reported by the health endpoint.
pub const PROTOCOL_VERSION: u16 = 1;

// ── Geo ──────────────────────────────────────────────────────────────────────

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

// ── Frames ───────────────────────────────────────────────────────────────────

/// Events a shopper client sends over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientFrame {
    /// Announce a shopper on this connection. Re-registering the same shopper
    /// overwrites the prior session without complaint.
    #[serde(rename_all = "camelCase")]
    ShopperRegister {
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<GeoPoint>,
    },
    /// Position report for an already-registered shopper.
    #[serde(rename_all = "camelCase")]
    LocationUpdate { user_id: String, location: GeoPoint },
    /// Acknowledge taking an order. The gateway echoes; assignment rules live
    /// elsewhere.
    #[serde(rename_all = "camelCase")]
    AcceptOrder { order_id: String },
    /// Decline an order; same echo semantics as accept.
    #[serde(rename_all = "camelCase")]
    RejectOrder { order_id: String },
    /// Liveness probe.
    Ping,
}

/// Events the gateway sends back. Replies always go to the connection that
/// produced the inbound frame; nothing here is broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerFrame {
    #[serde(rename_all = "camelCase")]
    Registered { success: bool, user_id: String },
    #[serde(rename_all = "camelCase")]
    OrderAccepted { order_id: String, success: bool },
    #[serde(rename_all = "camelCase")]
    OrderRejected { order_id: String, success: bool },
    Pong,
}

impl ServerFrame {
    pub fn registered(user_id: impl Into<String>) -> Self {
        Self::Registered {
            success: true,
            user_id: user_id.into(),
        }
    }

    pub fn order_accepted(order_id: impl Into<String>) -> Self {
        Self::OrderAccepted {
            order_id: order_id.into(),
            success: true,
        }
    }

    pub fn order_rejected(order_id: impl Into<String>) -> Self {
        Self::OrderRejected {
            order_id: order_id.into(),
            success: true,
        }
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode one inbound text message. Unknown event names and missing fields
/// both surface as [`ProtocolError::Malformed`]; the caller decides whether
/// to drop silently.
pub fn decode_client_frame(raw: &str) -> Result<ClientFrame, ProtocolError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_register_with_location() {
        let frame = decode_client_frame(
            r#"{"event":"shopper-register","userId":"w1","location":{"lat":-1.95,"lng":30.06}}"#,
        )
        .unwrap();
        assert_eq!(frame, ClientFrame::ShopperRegister {
            user_id: "w1".into(),
            location: Some(GeoPoint::new(-1.95, 30.06)),
        });
    }

    #[test]
    fn decodes_register_without_location() {
        let frame = decode_client_frame(r#"{"event":"shopper-register","userId":"w1"}"#).unwrap();
        assert_eq!(frame, ClientFrame::ShopperRegister {
            user_id: "w1".into(),
            location: None,
        });
    }

    #[test]
    fn decodes_location_update() {
        let frame = decode_client_frame(
            r#"{"event":"location-update","userId":"w2","location":{"lat":0.0,"lng":1.0}}"#,
        )
        .unwrap();
        assert_eq!(frame, ClientFrame::LocationUpdate {
            user_id: "w2".into(),
            location: GeoPoint::new(0.0, 1.0),
        });
    }

    #[test]
    fn decodes_order_events_and_ping() {
        assert_eq!(
            decode_client_frame(r#"{"event":"accept-order","orderId":"o-9"}"#).unwrap(),
            ClientFrame::AcceptOrder {
                order_id: "o-9".into()
            }
        );
        assert_eq!(
            decode_client_frame(r#"{"event":"reject-order","orderId":"o-9"}"#).unwrap(),
            ClientFrame::RejectOrder {
                order_id: "o-9".into()
            }
        );
        assert_eq!(
            decode_client_frame(r#"{"event":"ping"}"#).unwrap(),
            ClientFrame::Ping
        );
    }

    #[test]
    fn unknown_event_is_malformed() {
        assert!(decode_client_frame(r#"{"event":"make-coffee"}"#).is_err());
    }

    #[test]
    fn missing_field_is_malformed() {
        // accept-order without its orderId
        assert!(decode_client_frame(r#"{"event":"accept-order"}"#).is_err());
        // location-update with a location that is not a coordinate pair
        assert!(
            decode_client_frame(r#"{"event":"location-update","userId":"w1","location":"here"}"#)
                .is_err()
        );
    }

    #[test]
    fn reply_frames_serialize_with_wire_names() {
        let json = ServerFrame::registered("w1").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "registered");
        assert_eq!(value["success"], true);
        assert_eq!(value["userId"], "w1");

        let json = ServerFrame::order_accepted("o-1").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "order-accepted");
        assert_eq!(value["orderId"], "o-1");

        let json = ServerFrame::Pong.to_json().unwrap();
        assert_eq!(json, r#"{"event":"pong"}"#);
    }
}
