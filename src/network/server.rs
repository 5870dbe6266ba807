use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::game::rules::RulesEngine;
use crate::network::connection_handler::ConnectionHandler;
use crate::network::relay::RelayDispatcher;
use crate::HubResult;

pub struct WebsocketServer<E: RulesEngine> {
    listener: TcpListener,
    relay: Arc<RelayDispatcher<E>>,
}

impl<E: RulesEngine> WebsocketServer<E> {
    pub async fn bind(address: &str, relay: Arc<RelayDispatcher<E>>) -> HubResult<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| crate::HubError::TransportFailure {
                message: format!("cannot listen on {}: {}", address, e),
            })?;
        Ok(Self { listener, relay })
    }

    pub fn local_addr(&self) -> HubResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| crate::HubError::TransportFailure {
                message: e.to_string(),
            })
    }

    /// Accepts connections forever, one task per connection.
    pub async fn run(self) -> HubResult<()> {
        tracing::info!(address = %self.local_addr()?, "WebSocket hub listening");

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    continue;
                }
            };
            tracing::debug!(peer = %peer, "New connection");

            let relay = self.relay.clone();
            tokio::spawn(async move {
                if let Err(e) = ConnectionHandler::handle_connection(stream, peer, relay).await {
                    tracing::warn!(peer = %peer, error = %e, "Error handling connection");
                }
            });
        }
    }
}
