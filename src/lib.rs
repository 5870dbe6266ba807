pub mod config;
pub mod errors;
pub mod game;
pub mod logging;
pub mod network;

#[cfg(test)]
mod tests;

// Re-export commonly used items for convenience
pub use errors::{HubError, HubResult};
pub use game::chess::ChessEngine;
pub use game::rules::RulesEngine;
pub use game::session_store::{SessionStore, SnapshotFile};
pub use network::broadcast::BroadcastPolicy;
pub use network::connection_manager::ConnectionRegistry;
pub use network::relay::RelayDispatcher;
pub use network::server::WebsocketServer;
