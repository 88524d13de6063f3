//! Sending-side protocol driver.
//!
//! The [`FrameSender`] owns its connection and drives the whole sequence:
//! 1. Announce the total frame count and the numbering increment
//! 2. For each frame: send its size, stream its body, wait for `OK FRAME <n>`
//! 3. Shut the connection down
//!
//! # Example
//!
//! ```ignore
//! use framewire::config::SenderConfig;
//! use framewire::sender::FrameSender;
//!
//! let mut sender = FrameSender::connect(SenderConfig::new("192.168.1.20")).await?;
//! let bodies = vec![std::fs::read("capture/frame0.jpg")?];
//! let summary = sender.send_sequence(0, 1, &bodies).await?;
//! sender.finish().await?;
//! ```

use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;

use crate::config::{AckPolicy, SenderConfig};
use crate::error::{FramewireError, Result};
use crate::manifest::TransferSummary;
use crate::protocol::{ControlMessage, Frame, FrameNumbering};
use crate::state::TransferState;
use crate::transport::{open_as_sender, Connection};

/// Drives the outbound frame sequence over one connection.
pub struct FrameSender<S> {
    conn: Connection<S>,
    config: SenderConfig,
    state: TransferState,
    /// Acks naming a frame other than the awaited one.
    mismatched_acks: u64,
}

impl FrameSender<TcpStream> {
    /// Connect to the receiver named in `config`.
    pub async fn connect(config: SenderConfig) -> Result<Self> {
        let conn = open_as_sender(&config.address, config.port).await?;
        Ok(Self::new(conn, config))
    }
}

impl<S> FrameSender<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Drive an already open connection.
    pub fn new(conn: Connection<S>, config: SenderConfig) -> Self {
        Self {
            conn,
            config,
            state: TransferState::Init,
            mismatched_acks: 0,
        }
    }

    /// Current protocol state.
    #[inline]
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Number of mismatched acks seen so far.
    #[inline]
    pub fn mismatched_acks(&self) -> u64 {
        self.mismatched_acks
    }

    /// The active configuration.
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection<S> {
        &self.conn
    }

    /// Give up the driver and keep the connection.
    pub fn into_connection(self) -> Connection<S> {
        self.conn
    }

    /// Announce how many frames will follow. No ack is expected.
    pub async fn announce_total(&mut self, total_frames: u64) -> Result<()> {
        self.state.expect(&[TransferState::Init], "announce total")?;
        let result = self
            .conn
            .send_message(&ControlMessage::Value(total_frames))
            .await;
        self.track(result)?;
        self.state.advance(TransferState::CountNegotiated)?;

        tracing::info!(total_frames, "Announced frame count");
        Ok(())
    }

    /// Announce the frame-number increment. No ack is expected.
    pub async fn announce_increment(&mut self, increment: u64) -> Result<()> {
        self.state
            .expect(&[TransferState::CountNegotiated], "announce increment")?;
        if increment == 0 {
            return Err(FramewireError::Protocol(
                "Frame increment must be at least 1".to_string(),
            ));
        }
        let result = self
            .conn
            .send_message(&ControlMessage::Value(increment))
            .await;
        self.track(result)?;
        self.state.advance(TransferState::IncrementNegotiated)?;

        tracing::debug!(increment, "Announced frame increment");
        Ok(())
    }

    /// Send one frame whose body is read from `body`.
    ///
    /// `len` is announced first; `body` must yield exactly `len` bytes.
    /// Returns once the receiver has acknowledged the frame.
    pub async fn send_frame<R>(&mut self, frame_number: u64, body: R, len: u64) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        self.state.expect(
            &[TransferState::IncrementNegotiated, TransferState::Acked],
            "send frame",
        )?;

        if !self.config.pacing_delay.is_zero() {
            tokio::time::sleep(self.config.pacing_delay).await;
        }

        let result = self.conn.send_message(&ControlMessage::Value(len)).await;
        self.track(result)?;
        self.state.advance(TransferState::SizeSent)?;

        let result = self.stream_body(frame_number, body, len).await;
        self.track(result)?;
        self.state.advance(TransferState::BodyTransferred)?;

        tracing::debug!(frame = frame_number, bytes = len, "Body sent");
        self.wait_for_ack(frame_number).await?;

        tracing::info!(frame = frame_number, bytes = len, "Frame acknowledged");
        Ok(())
    }

    /// Send one frame from memory.
    pub async fn send_bytes(&mut self, frame_number: u64, body: &[u8]) -> Result<()> {
        self.send_frame(frame_number, body, body.len() as u64).await
    }

    /// Send one [`Frame`].
    pub async fn send(&mut self, frame: &Frame) -> Result<()> {
        self.send_bytes(frame.number, &frame.body).await
    }

    /// Send one frame read from a file; the size comes from its metadata.
    pub async fn send_file(&mut self, frame_number: u64, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let opened = async {
            let file = tokio::fs::File::open(path).await?;
            let len = file.metadata().await?.len();
            Ok::<_, std::io::Error>((file, len))
        }
        .await;

        let (file, len) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                let err = FramewireError::storage(path, e);
                return Err(self.fail(err));
            }
        };

        self.send_frame(frame_number, file, len).await
    }

    /// Announce and send a whole sequence numbered from `base`.
    pub async fn send_sequence<B>(
        &mut self,
        base: u64,
        increment: u64,
        bodies: &[B],
    ) -> Result<TransferSummary>
    where
        B: AsRef<[u8]>,
    {
        let numbering = FrameNumbering::new(base, increment)?;
        let total = bodies.len() as u64;

        // Every body needs a frame number before the count goes out.
        if total > 0 && numbering.nth(total - 1).is_none() {
            let err = FramewireError::Protocol(format!(
                "Frame numbers from {} by {} overflow before frame {} of {}",
                base, increment, total, total
            ));
            return Err(self.fail(err));
        }

        self.announce_total(total).await?;
        self.announce_increment(increment).await?;

        let mut summary = TransferSummary::new(total, base, increment);
        for (number, body) in numbering.numbers().zip(bodies) {
            let body = body.as_ref();
            self.send_bytes(number, body).await?;
            summary.push(number, body.len() as u64, None);
        }

        tracing::info!(
            frames = total,
            bytes = summary.total_bytes(),
            "Sequence sent"
        );
        Ok(summary)
    }

    /// Wait for `OK FRAME <frame_number>`, bounded by the ack timeout.
    ///
    /// Acks for other frames are counted and logged; under
    /// [`AckPolicy::Strict`] they fail the transfer instead.
    pub async fn wait_for_ack(&mut self, frame_number: u64) -> Result<()> {
        self.state
            .expect(&[TransferState::BodyTransferred], "wait for ack")?;

        let deadline = self.config.ack_timeout;
        match tokio::time::timeout(deadline, self.await_ack(frame_number)).await {
            Ok(result) => {
                self.track(result)?;
                self.state.advance(TransferState::Acked)
            }
            Err(_) => {
                self.state.advance(TransferState::TimedOut)?;
                tracing::error!(frame = frame_number, ?deadline, "Ack timed out");
                Err(FramewireError::Timeout {
                    frame: frame_number,
                    after: deadline,
                })
            }
        }
    }

    async fn await_ack(&mut self, frame_number: u64) -> Result<()> {
        let expected = ControlMessage::Ack(frame_number).to_string();

        loop {
            let message = self.conn.read_message().await?;
            if message == expected {
                return Ok(());
            }

            self.mismatched_acks += 1;
            tracing::warn!(
                frame = frame_number,
                received = %message,
                "Unexpected message while waiting for ack"
            );

            if self.config.ack_policy == AckPolicy::Strict {
                return Err(FramewireError::UnexpectedAck {
                    expected: frame_number,
                    received: message,
                });
            }
        }
    }

    async fn stream_body<R>(&mut self, frame_number: u64, mut body: R, len: u64) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let chunk_size = self.config.chunk_size.max(1);
        let mut buf = vec![0u8; chunk_size];
        let mut sent = 0u64;

        while sent < len {
            let want = (len - sent).min(chunk_size as u64) as usize;
            let n = body.read(&mut buf[..want]).await?;
            if n == 0 {
                return Err(FramewireError::Framing {
                    frame: frame_number,
                    expected: len,
                    actual: sent,
                });
            }
            self.conn.write_body(&buf[..n]).await?;
            sent += n as u64;
        }
        self.conn.flush().await?;

        // The source must be exhausted at exactly `len` bytes.
        let extra = body.read(&mut buf[..1]).await?;
        if extra > 0 {
            return Err(FramewireError::Framing {
                frame: frame_number,
                expected: len,
                actual: len + extra as u64,
            });
        }
        Ok(())
    }

    /// Close the connection after a completed sequence.
    pub async fn finish(&mut self) -> Result<()> {
        self.state.advance(TransferState::Done)?;
        self.conn.shutdown().await
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.fail(e))
    }

    fn fail(&mut self, err: FramewireError) -> FramewireError {
        if !self.state.is_terminal() {
            self.state = TransferState::Failed;
        }
        tracing::error!(state = %self.state, "Send failed: {}", err);
        err
    }
}
