//! Gateway: the WebSocket server that tracks live shopper sessions, feeds
//! the geo-clustering index, and echoes order acknowledgements back to the
//! connection that sent them.
//!
//! Lifecycle:
//! 1. Load config
//! 2. Build shared state (session registry + cluster index)
//! 3. Start the HTTP server (health) and attach the WebSocket upgrade
//! 4. Spawn the maintenance timer (log purge, optional cluster TTL sweep)
//!
//! Dispatch/assignment logic lives outside this process; it reads presence
//! through the accessors on [`state::GatewayState`].

pub mod maintenance;
pub mod server;
pub mod state;
pub mod ws;
