//! Snapshot Client - one depth request per TCP connection.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tracing::debug;

use crate::codec::{decode_snapshot_response, encode_snapshot_request, read_frame, write_frame};
use crate::error::SnapshotError;
use crate::message::SnapshotResponse;

#[derive(Clone, Debug)]
pub struct SnapshotClient {
    endpoint: String,
    timeout: Duration,
}

impl SnapshotClient {
    /// `endpoint` is `host:port`; `timeout` bounds the whole exchange.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the top `max_levels` of `symbol`/`source`. No retries.
    pub async fn fetch(
        &self,
        symbol: &str,
        source: u32,
        max_levels: u16,
    ) -> Result<SnapshotResponse, SnapshotError> {
        match timeout(self.timeout, self.exchange(symbol, source, max_levels)).await {
            Ok(result) => result,
            Err(_) => Err(SnapshotError::Timeout(self.timeout)),
        }
    }

    async fn exchange(
        &self,
        symbol: &str,
        source: u32,
        max_levels: u16,
    ) -> Result<SnapshotResponse, SnapshotError> {
        let addr = self.resolve().await?;
        let mut stream = TcpStream::connect(addr).await.map_err(|e| match e.kind() {
            io::ErrorKind::ConnectionRefused => SnapshotError::Refused(addr),
            _ => SnapshotError::Io(e),
        })?;
        stream.set_nodelay(true)?;

        let request = encode_snapshot_request(symbol, source, max_levels)?;
        write_frame(&mut stream, &request).await?;
        let payload = read_frame(&mut stream).await?;
        let book = decode_snapshot_response(&payload)?;

        debug!(
            %symbol,
            source,
            bids = book.bids.len(),
            asks = book.asks.len(),
            "snapshot received"
        );
        Ok(book)
    }

    async fn resolve(&self) -> Result<SocketAddr, SnapshotError> {
        lookup_host(self.endpoint.as_str())
            .await
            .map_err(|_| SnapshotError::Resolve(self.endpoint.clone()))?
            .next()
            .ok_or_else(|| SnapshotError::Resolve(self.endpoint.clone()))
    }
}
