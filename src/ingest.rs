//! Stream Ingestor - the live subscription.
//!
//! Connects over WebSocket, sends the `mark` control object, then decodes
//! every inbound frame and forwards well-formed messages, in arrival order,
//! to the mutation loop. A bad frame is logged and skipped; losing the
//! connection ends the ingestor with an error.

use futures_util::{SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::decode_message;
use crate::error::StreamError;
use crate::message::Message;

pub type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Control object sent once after connecting.
#[derive(Debug, Serialize)]
struct Control {
    cmd: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
}

/// Running counters, returned when the ingestor stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub frames: u64,
    pub messages: u64,
    pub decode_errors: u64,
}

pub struct StreamIngestor {
    url: String,
    offset: Option<i64>,
    stats: IngestStats,
}

impl StreamIngestor {
    pub fn new(url: impl Into<String>, offset: Option<i64>) -> Self {
        Self {
            url: url.into(),
            offset,
            stats: IngestStats::default(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// JSON control object: `{"cmd":"mark"}` or `{"cmd":"mark","offset":N}`.
    pub fn handshake(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Control {
            cmd: "mark",
            offset: self.offset,
        })
    }

    /// Open the subscription and send the handshake.
    pub async fn connect(&self) -> Result<FeedStream, StreamError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(StreamError::Url(self.url.clone()));
        }
        let (mut ws, _resp) = connect_async(self.url.as_str())
            .await
            .map_err(|e| StreamError::Connect {
                url: self.url.clone(),
                source: Box::new(e),
            })?;
        let hello = self.handshake()?;
        ws.send(WsMessage::Text(hello)).await?;
        info!(url = %self.url, offset = ?self.offset, "subscribed");
        Ok(ws)
    }

    /// Decode one frame. Errors are counted and logged, never returned.
    pub fn handle_frame(&mut self, bytes: &[u8]) -> Option<Message> {
        self.stats.frames += 1;
        match decode_message(bytes) {
            Ok(msg) => {
                self.stats.messages += 1;
                Some(msg)
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                warn!(
                    frame = self.stats.frames,
                    len = bytes.len(),
                    errors = self.stats.decode_errors,
                    error = %e,
                    "dropping undecodable frame"
                );
                None
            }
        }
    }

    /// Receive loop. Returns `Ok` on cancellation or when the consumer is
    /// gone, `Err` when the subscription is lost.
    pub async fn run<S>(
        mut self,
        mut stream: S,
        tx: UnboundedSender<Message>,
        cancel: CancellationToken,
    ) -> Result<IngestStats, StreamError>
    where
        S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
    {
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(stats = ?self.stats, "ingestor cancelled");
                    return Ok(self.stats);
                }
                frame = stream.next() => frame,
            };

            let msg = match frame {
                Some(Ok(WsMessage::Binary(bytes))) => self.handle_frame(&bytes),
                Some(Ok(WsMessage::Text(text))) => self.handle_frame(text.as_bytes()),
                Some(Ok(WsMessage::Close(reason))) => {
                    info!(?reason, stats = ?self.stats, "stream closed by peer");
                    return Err(StreamError::Closed);
                }
                Some(Ok(_)) => None,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(StreamError::Closed),
            };

            if let Some(msg) = msg {
                if tx.send(msg).is_err() {
                    return Ok(self.stats);
                }
            }
        }
    }
}
