//! A connected byte stream shared by control messages and frame bodies.
//!
//! [`Connection`] is generic over the stream so the drivers run unchanged
//! over TCP and over in-memory pipes:
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> framewire::error::Result<()> {
//! use framewire::protocol::ControlMessage;
//! use framewire::transport::{Connection, Role};
//!
//! let (a, b) = tokio::io::duplex(1024);
//! let mut sender = Connection::new(a, Role::Sender);
//! let mut receiver = Connection::new(b, Role::Receiver);
//!
//! sender.send_message(&ControlMessage::Value(3)).await?;
//! assert_eq!(receiver.read_message().await?, "3");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{FramewireError, Result};
use crate::protocol::{ControlBuffer, ControlMessage, MAX_CONTROL_MESSAGE_LEN};

/// Which end of the transfer a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Initiates the connection and drives the sequence.
    Sender,
    /// Accepts the connection and stores frames.
    Receiver,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Sender => f.write_str("sender"),
            Role::Receiver => f.write_str("receiver"),
        }
    }
}

/// An open bidirectional stream owned by one driver.
pub struct Connection<S> {
    stream: S,
    /// Bytes read past the end of the last control message.
    buffer: ControlBuffer,
    role: Role,
    peer: Option<SocketAddr>,
    open: bool,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream.
    pub fn new(stream: S, role: Role) -> Self {
        Self {
            stream,
            buffer: ControlBuffer::new(),
            role,
            peer: None,
            open: true,
        }
    }

    /// Wrap a connected stream with a known peer address.
    pub fn with_peer(stream: S, role: Role, peer: SocketAddr) -> Self {
        let mut conn = Self::new(stream, role);
        conn.peer = Some(peer);
        conn
    }

    /// Local role.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Peer address, when the stream is a socket.
    #[inline]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// `false` after shutdown or once the peer has closed.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Send one control message and flush.
    pub async fn send_message(&mut self, message: &ControlMessage) -> Result<()> {
        tracing::debug!(role = %self.role, "-> {}", message);
        self.stream.write_all(&message.encode()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read one control message, without its terminator.
    ///
    /// Messages split across reads and several messages in one read are
    /// both handled; bytes after the message stay buffered for
    /// [`Connection::read_body`].
    pub async fn read_message(&mut self) -> Result<String> {
        let mut chunk = [0u8; MAX_CONTROL_MESSAGE_LEN];

        loop {
            if let Some(message) = self.buffer.next_message()? {
                tracing::debug!(role = %self.role, "<- {}", message);
                return Ok(message);
            }

            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                self.open = false;
                return Err(FramewireError::ConnectionClosed);
            }
            self.buffer.extend(&chunk[..n]);
        }
    }

    /// Write raw body bytes.
    pub async fn write_body(&mut self, chunk: &[u8]) -> Result<()> {
        self.stream.write_all(chunk).await?;
        Ok(())
    }

    /// Flush buffered writes.
    pub async fn flush(&mut self) -> Result<()> {
        self.stream.flush().await?;
        Ok(())
    }

    /// Read up to `buf.len()` body bytes; `Ok(0)` means the peer closed.
    ///
    /// Bytes already buffered behind the last control message come first.
    pub async fn read_body(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.buffer.is_empty() {
            return Ok(self.buffer.drain_into(buf));
        }

        let n = self.stream.read(buf).await?;
        if n == 0 {
            self.open = false;
        }
        Ok(n)
    }

    /// Shut down the write side and mark the connection closed.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.stream.shutdown().await?;
        }
        Ok(())
    }

    /// Unwrap the stream. Buffered unread bytes are discarded.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("role", &self.role)
            .field("peer", &self.peer)
            .field("open", &self.open)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn pair() -> (
        Connection<tokio::io::DuplexStream>,
        Connection<tokio::io::DuplexStream>,
    ) {
        let (a, b) = duplex(64 * 1024);
        (Connection::new(a, Role::Sender), Connection::new(b, Role::Receiver))
    }

    #[tokio::test]
    async fn test_message_roundtrip() {
        let (mut tx, mut rx) = pair();

        tx.send_message(&ControlMessage::Value(2000)).await.unwrap();
        tx.send_message(&ControlMessage::Ack(4)).await.unwrap();

        assert_eq!(rx.read_message().await.unwrap(), "2000");
        assert_eq!(rx.read_message().await.unwrap(), "OK FRAME 4");
    }

    #[tokio::test]
    async fn test_body_after_message_is_preserved() {
        let (a, b) = duplex(1024);
        let mut raw = a;
        let mut rx = Connection::new(b, Role::Receiver);

        raw.write_all(b"5\nhello7\n").await.unwrap();

        assert_eq!(rx.read_message().await.unwrap(), "5");

        let mut body = [0u8; 5];
        let mut got = 0;
        while got < 5 {
            got += rx.read_body(&mut body[got..]).await.unwrap();
        }
        assert_eq!(&body, b"hello");
        assert_eq!(rx.read_message().await.unwrap(), "7");
    }

    #[tokio::test]
    async fn test_split_message_across_writes() {
        let (a, b) = duplex(1024);
        let mut raw = a;
        let mut rx = Connection::new(b, Role::Receiver);

        let reader = tokio::spawn(async move { rx.read_message().await });

        raw.write_all(b"OK FR").await.unwrap();
        tokio::task::yield_now().await;
        raw.write_all(b"AME 1\n").await.unwrap();

        assert_eq!(reader.await.unwrap().unwrap(), "OK FRAME 1");
    }

    #[tokio::test]
    async fn test_peer_close_while_reading_message() {
        let (tx, mut rx) = pair();
        drop(tx);

        let err = rx.read_message().await.unwrap_err();
        assert!(matches!(err, FramewireError::ConnectionClosed));
        assert!(!rx.is_open());
    }

    #[tokio::test]
    async fn test_read_body_eof() {
        let (tx, mut rx) = pair();
        drop(tx);

        let mut buf = [0u8; 8];
        assert_eq!(rx.read_body(&mut buf).await.unwrap(), 0);
        assert!(!rx.is_open());
    }

    #[tokio::test]
    async fn test_overlong_message_rejected() {
        let (a, b) = duplex(4 * 1024);
        let mut raw = a;
        let mut rx = Connection::new(b, Role::Receiver);

        raw.write_all(&[b'9'; MAX_CONTROL_MESSAGE_LEN + 1]).await.unwrap();

        let err = rx.read_message().await.unwrap_err();
        assert!(matches!(err, FramewireError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_shutdown_marks_closed() {
        let (mut tx, mut rx) = pair();
        assert!(tx.is_open());
        assert_eq!(tx.role(), Role::Sender);
        assert_eq!(tx.peer_addr(), None);

        tx.shutdown().await.unwrap();
        assert!(!tx.is_open());
        tx.shutdown().await.unwrap();

        assert!(matches!(
            rx.read_message().await,
            Err(FramewireError::ConnectionClosed)
        ));
    }
}
