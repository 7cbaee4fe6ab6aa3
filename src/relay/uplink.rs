//! Uplink connection management
//!
//! One outbound link to the central ingest endpoint. Connecting retries
//! forever at a fixed delay; a failed send gets the old link discarded,
//! a fresh connection (with the handshake replayed so the remote peer
//! re-establishes session context), and exactly one resend. A frame
//! that fails the resend too is dropped. No backoff growth: the process
//! is expected to run under external supervision.
//!
//! No internal locking. Each session owns one link, one caller at a
//! time, and a reconnect replaces the link wholesale.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::protocol::constants::RECONNECT_DELAY;

/// Manages one outbound uplink with fixed-delay reconnect
#[derive(Debug, Clone)]
pub struct UplinkConnector {
    target: String,
    handshake: Option<String>,
    retry_delay: Duration,
}

impl UplinkConnector {
    /// Connector for `target` (host:port), no handshake text.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            handshake: None,
            retry_delay: RECONNECT_DELAY,
        }
    }

    /// Text sent as the first message of every (re)connection.
    pub fn with_handshake(mut self, text: impl Into<String>) -> Self {
        self.handshake = Some(text.into());
        self
    }

    /// Override the fixed reconnect delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Target address.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Connect, retrying forever at the fixed delay.
    ///
    /// On success the handshake text (if any) has already been sent as
    /// the first message when this returns.
    pub async fn connect_with_retry(&self) -> TcpStream {
        loop {
            match self.try_connect().await {
                Ok(link) => {
                    tracing::info!(target = %self.target, "Uplink connected");
                    return link;
                }
                Err(e) => {
                    tracing::warn!(
                        target = %self.target,
                        error = %e,
                        retry_in = ?self.retry_delay,
                        "Uplink connect failed"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn try_connect(&self) -> std::io::Result<TcpStream> {
        let mut link = TcpStream::connect(self.target.as_str()).await?;
        link.set_nodelay(true)?;

        if let Some(text) = &self.handshake {
            link.write_all(text.as_bytes()).await?;
            link.write_all(b"\n").await?;
            link.flush().await?;
        }

        Ok(link)
    }

    /// Send `payload` on `link`, reconnecting and retrying once on
    /// failure.
    ///
    /// Returns the link later sends should use: the original on
    /// success, the fresh one after a reconnect. If the retry fails as
    /// well the payload is dropped and the fresh link is still
    /// returned.
    pub async fn send_with_reconnect(&self, mut link: TcpStream, payload: &[u8]) -> TcpStream {
        match send(&mut link, payload).await {
            Ok(()) => link,
            Err(e) => {
                tracing::warn!(
                    target = %self.target,
                    error = %e,
                    "Uplink send failed, reconnecting"
                );

                // Best-effort close of the dead link
                let _ = link.shutdown().await;
                drop(link);

                let mut fresh = self.connect_with_retry().await;
                if let Err(e) = send(&mut fresh, payload).await {
                    tracing::warn!(
                        target = %self.target,
                        error = %e,
                        bytes = payload.len(),
                        "Send failed after reconnect, frame dropped"
                    );
                }
                fresh
            }
        }
    }
}

async fn send(link: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
    link.write_all(payload).await?;
    link.flush().await
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    async fn read_line(stream: &mut TcpStream) -> String {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            stream.read_exact(&mut byte).await.unwrap();
            if byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        String::from_utf8(line).unwrap()
    }

    #[tokio::test]
    async fn test_connect_sends_handshake_first() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let connector = UplinkConnector::new(addr.to_string()).with_handshake("CFG");
        let mut link = connector.connect_with_retry().await;

        let (mut accepted, _) = listener.accept().await.unwrap();
        assert_eq!(read_line(&mut accepted).await, "CFG");

        // Frames flow after the handshake
        link.write_all(b"frame").await.unwrap();
        let mut buf = [0u8; 5];
        accepted.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"frame");
    }

    #[tokio::test]
    async fn test_send_with_reconnect_delivers_exactly_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let connector = UplinkConnector::new(addr.to_string())
            .with_handshake("CFG")
            .with_retry_delay(Duration::from_millis(10));

        let mut link = connector.connect_with_retry().await;
        let (mut first_conn, _) = listener.accept().await.unwrap();
        assert_eq!(read_line(&mut first_conn).await, "CFG");

        // Kill our write half so the next send fails deterministically
        link.shutdown().await.unwrap();

        let new_link = connector.send_with_reconnect(link, b"PAYLOAD").await;

        // The reconnect produced a second connection that got the
        // handshake again, then the payload exactly once.
        let (mut second_conn, _) = listener.accept().await.unwrap();
        assert_eq!(read_line(&mut second_conn).await, "CFG");

        let mut buf = [0u8; 7];
        second_conn.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"PAYLOAD");

        // The first connection never saw the payload
        drop(new_link);
        let mut rest = Vec::new();
        first_conn.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_returned_link_is_usable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let connector =
            UplinkConnector::new(addr.to_string()).with_retry_delay(Duration::from_millis(10));

        let mut link = connector.connect_with_retry().await;
        let (accepted, _) = listener.accept().await.unwrap();
        link.shutdown().await.unwrap();
        drop(accepted);

        let link = connector.send_with_reconnect(link, b"one").await;
        let (mut second, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 3];
        second.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"one");

        // Later sends reuse the returned link without reconnecting
        let _link = connector.send_with_reconnect(link, b"two").await;
        second.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"two");
    }
}
