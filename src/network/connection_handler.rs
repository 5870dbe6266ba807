use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message, WebSocketStream};
use url::form_urlencoded;
use uuid::Uuid;

use crate::game::rules::RulesEngine;
use crate::network::relay::{Flow, RelayDispatcher};
use crate::HubResult;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

pub struct ConnectionHandler;

impl ConnectionHandler {
    /// Runs one client connection from handshake to close. The registry entry
    /// is tied to a lease, so it is released on every exit path.
    pub async fn handle_connection<E: RulesEngine>(
        stream: TcpStream,
        peer: SocketAddr,
        relay: Arc<RelayDispatcher<E>>,
    ) -> HubResult<()> {
        let mut requested_identity = None;
        let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| {
            requested_identity = identity_from_query(request.uri().query());
            Ok::<Response, ErrorResponse>(response)
        })
        .await?;

        let identity = requested_identity.unwrap_or_else(|| Uuid::new_v4().to_string());
        tracing::info!(identity = %identity, peer = %peer, "WebSocket connection established");

        let (ws_sender, mut ws_receiver) = ws_stream.split();
        let (frame_sender, frame_receiver) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(Self::write_frames(identity.clone(), ws_sender, frame_receiver));

        let lease = relay.connections().register(&identity, frame_sender);
        relay.greet(&identity)?;

        let result = Self::read_frames(&identity, &mut ws_receiver, &relay).await;

        // Releasing the entry drops the last sender, which ends the writer
        // and closes the socket.
        drop(lease);
        if let Err(e) = writer.await {
            tracing::error!(identity = %identity, error = %e, "Connection writer panicked");
        }

        match &result {
            Ok(()) => tracing::info!(identity = %identity, "Connection closed"),
            Err(e) => tracing::warn!(identity = %identity, error = %e, "Connection dropped"),
        }
        result
    }

    /// Feeds frames to the dispatcher one at a time, in arrival order.
    async fn read_frames<E: RulesEngine>(
        identity: &str,
        receiver: &mut WsSource,
        relay: &RelayDispatcher<E>,
    ) -> HubResult<()> {
        while let Some(frame) = receiver.next().await {
            match frame? {
                Message::Text(text) => {
                    if relay.handle_text(identity, &text).await == Flow::Close {
                        tracing::info!(identity = %identity, "Client left");
                        break;
                    }
                }
                Message::Close(_) => {
                    tracing::debug!(identity = %identity, "Client requested close");
                    break;
                }
                _ => continue,
            }
        }
        Ok(())
    }

    async fn write_frames(
        identity: String,
        mut sink: WsSink,
        mut frames: mpsc::UnboundedReceiver<String>,
    ) {
        while let Some(frame) = frames.recv().await {
            if let Err(e) = sink.send(Message::Text(frame)).await {
                tracing::warn!(identity = %identity, error = %e, "Failed to write frame");
                break;
            }
        }
        let _ = sink.close().await;
    }
}

/// Identity requested through the `id` query parameter, percent-decoded.
pub fn identity_from_query(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, value)| key == "id" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_comes_from_the_id_parameter() {
        assert_eq!(identity_from_query(Some("id=alice")), Some("alice".to_string()));
        assert_eq!(
            identity_from_query(Some("room=1&id=bob")),
            Some("bob".to_string())
        );
    }

    #[test]
    fn identity_is_percent_decoded() {
        assert_eq!(
            identity_from_query(Some("id=alice%40example.com")),
            Some("alice@example.com".to_string())
        );
        assert_eq!(
            identity_from_query(Some("id=bob+smith&room=2")),
            Some("bob smith".to_string())
        );
        assert_eq!(identity_from_query(Some("id=a%2Bb")), Some("a+b".to_string()));
    }

    #[test]
    fn missing_or_empty_id_yields_none() {
        assert_eq!(identity_from_query(None), None);
        assert_eq!(identity_from_query(Some("id=")), None);
        assert_eq!(identity_from_query(Some("name=alice")), None);
    }
}
