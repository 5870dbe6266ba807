use std::path::PathBuf;

use clap::Parser;

use crate::network::broadcast::BroadcastPolicy;

/// Real-time chess session hub.
#[derive(Debug, Clone, Parser)]
#[command(name = "server", version, about)]
pub struct HubConfig {
    /// Address the WebSocket hub listens on.
    #[arg(long, env = "HUB_WS_ADDR", default_value = "127.0.0.1:8080")]
    pub ws_addr: String,

    /// Address the HTTP API listens on.
    #[arg(long, env = "HUB_HTTP_ADDR", default_value = "127.0.0.1:4000")]
    pub http_addr: String,

    /// JSON file holding the session snapshot.
    #[arg(long, env = "HUB_SNAPSHOT_PATH", default_value = "games.json")]
    pub snapshot_path: PathBuf,

    /// Who receives move updates.
    #[arg(long, env = "HUB_BROADCAST", value_enum, default_value_t = BroadcastPolicy::OpponentOnly)]
    pub broadcast: BroadcastPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_locally() {
        let config = HubConfig::parse_from(["server"]);
        assert_eq!(config.ws_addr, "127.0.0.1:8080");
        assert_eq!(config.http_addr, "127.0.0.1:4000");
        assert_eq!(config.snapshot_path, PathBuf::from("games.json"));
        assert_eq!(config.broadcast, BroadcastPolicy::OpponentOnly);
    }

    #[test]
    fn broadcast_mode_is_selectable() {
        let config = HubConfig::parse_from(["server", "--broadcast", "all"]);
        assert_eq!(config.broadcast, BroadcastPolicy::AllConnected);
    }
}
