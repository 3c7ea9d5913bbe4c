use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{ConnectInfo, State, WebSocketUpgrade},
        response::{IntoResponse, Json},
        routing::get,
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use {dray_config::DrayConfig, dray_protocol::PROTOCOL_VERSION};

use crate::{maintenance, state::GatewayState, ws::handle_connection};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let app_state = AppState { gateway: state };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_upgrade_handler))
        .layer(cors)
        .with_state(app_state)
}

/// Start the gateway HTTP + WebSocket server.
pub async fn start_gateway(config: DrayConfig) -> anyhow::Result<()> {
    let state = GatewayState::new(config.clustering.radius_km);

    let app = build_gateway_app(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let lines = [
        format!("dray gateway v{}", state.version),
        format!("protocol v{PROTOCOL_VERSION}, listening on {addr}"),
        format!("clustering radius {} km", config.clustering.radius_km),
        match config.clustering.cluster_ttl_secs {
            Some(ttl) => format!("cluster ttl {ttl}s"),
            None => "clusters kept for process lifetime".to_string(),
        },
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    // Maintenance timer: external log purge + optional cluster TTL sweep.
    maintenance::spawn(Arc::clone(&state), &config);

    // Run the server with ConnectInfo for remote IP extraction.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let connections = state.gateway.client_count().await;
    let sessions = state.gateway.session_count().await;
    let clusters = state.gateway.cluster_count().await;
    Json(serde_json::json!({
        "status": "ok",
        "version": state.gateway.version,
        "protocol": PROTOCOL_VERSION,
        "connections": connections,
        "sessions": sessions,
        "clusters": clusters,
    }))
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state.gateway, addr))
}
