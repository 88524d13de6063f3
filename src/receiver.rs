//! Receiving-side protocol driver.
//!
//! The [`FrameReceiver`] reads the announcements, then for every frame
//! reads its size, stores exactly that many body bytes under the
//! destination directory and answers `OK FRAME <n>`.
//!
//! # Example
//!
//! ```ignore
//! use framewire::config::ReceiverConfig;
//! use framewire::receiver::FrameReceiver;
//!
//! let mut receiver = FrameReceiver::listen(ReceiverConfig::new("/srv/frames")).await?;
//! let summary = receiver.receive_sequence(0).await?;
//! println!("stored {} frames", summary.frames.len());
//! ```

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::ReceiverConfig;
use crate::error::{FramewireError, Result};
use crate::manifest::TransferSummary;
use crate::protocol::{parse_value, ControlMessage, FrameNumbering};
use crate::state::TransferState;
use crate::transport::{open_as_receiver, Connection};

/// Drives the inbound frame sequence over one connection.
pub struct FrameReceiver<S> {
    conn: Connection<S>,
    config: ReceiverConfig,
    state: TransferState,
}

impl FrameReceiver<TcpStream> {
    /// Bind as configured and accept exactly one sender.
    pub async fn listen(config: ReceiverConfig) -> Result<Self> {
        let conn = open_as_receiver(config.bind_address.as_deref(), config.port).await?;
        Ok(Self::new(conn, config))
    }
}

impl<S> FrameReceiver<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Drive an already accepted connection.
    pub fn new(conn: Connection<S>, config: ReceiverConfig) -> Self {
        Self {
            conn,
            config,
            state: TransferState::Init,
        }
    }

    /// Current protocol state.
    #[inline]
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// The active configuration.
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection<S> {
        &self.conn
    }

    /// Read the announced total frame count.
    pub async fn read_total(&mut self) -> Result<u64> {
        self.state.expect(&[TransferState::Init], "read total")?;
        let total = self.read_value("total frame count").await?;
        self.state.advance(TransferState::CountNegotiated)?;

        tracing::info!(total_frames = total, "Frame count received");
        Ok(total)
    }

    /// Read the announced frame-number increment.
    pub async fn read_increment(&mut self) -> Result<u64> {
        self.state
            .expect(&[TransferState::CountNegotiated], "read increment")?;
        let increment = self.read_value("frame increment").await?;
        if increment == 0 {
            let err = FramewireError::Protocol("Frame increment must be at least 1".to_string());
            return Err(self.fail(err));
        }
        self.state.advance(TransferState::IncrementNegotiated)?;

        tracing::debug!(increment, "Frame increment received");
        Ok(increment)
    }

    /// Read the size announcement of the next frame.
    pub async fn read_size(&mut self) -> Result<u64> {
        self.state.expect(
            &[TransferState::IncrementNegotiated, TransferState::Acked],
            "read frame size",
        )?;
        let size = self.read_value("frame size").await?;
        self.state.advance(TransferState::SizeSent)?;
        Ok(size)
    }

    /// Store exactly `expected_size` body bytes as frame `frame_number`.
    ///
    /// Returns the stored path. The file is removed again if the body
    /// cannot be received in full.
    pub async fn receive_frame(&mut self, frame_number: u64, expected_size: u64) -> Result<PathBuf> {
        self.state
            .expect(&[TransferState::SizeSent], "receive frame")?;

        let path = self
            .config
            .naming
            .path_in(&self.config.destination, frame_number);

        let result = self.store_body(frame_number, expected_size, &path).await;
        let path = self.track(result)?;
        self.state.advance(TransferState::BodyTransferred)?;

        tracing::debug!(frame = frame_number, bytes = expected_size, path = %path.display(), "Frame stored");
        Ok(path)
    }

    /// Acknowledge frame `frame_number`.
    pub async fn send_ack(&mut self, frame_number: u64) -> Result<()> {
        self.state
            .expect(&[TransferState::BodyTransferred], "send ack")?;
        let result = self
            .conn
            .send_message(&ControlMessage::Ack(frame_number))
            .await;
        self.track(result)?;
        self.state.advance(TransferState::Acked)?;

        tracing::info!(frame = frame_number, "Frame acknowledged");
        Ok(())
    }

    /// Receive a whole sequence whose numbering starts at `base`.
    ///
    /// Writes `manifest.json` into the destination when enabled.
    pub async fn receive_sequence(&mut self, base: u64) -> Result<TransferSummary> {
        let total = self.read_total().await?;
        let increment = self.read_increment().await?;
        let numbering = FrameNumbering::new(base, increment)?;

        let mut summary = TransferSummary::new(total, base, increment);
        for number in numbering.numbers().take(total as usize) {
            let size = self.read_size().await?;
            let path = self.receive_frame(number, size).await?;
            self.send_ack(number).await?;
            summary.push(number, size, Some(path));
        }

        if !summary.is_complete() {
            let err = FramewireError::Protocol(format!(
                "Frame numbers overflow after {} of {} frames",
                summary.frames.len(),
                total
            ));
            return Err(self.fail(err));
        }

        if self.config.write_manifest {
            self.ensure_destination().await?;
            let result = summary.write_manifest(&self.config.destination).await;
            let manifest = self.track(result)?;
            tracing::debug!(path = %manifest.display(), "Manifest written");
        }

        tracing::info!(
            frames = total,
            bytes = summary.total_bytes(),
            "Sequence received"
        );
        Ok(summary)
    }

    /// Close the connection after a completed sequence.
    pub async fn finish(&mut self) -> Result<()> {
        self.state.advance(TransferState::Done)?;
        self.conn.shutdown().await
    }

    async fn read_value(&mut self, what: &str) -> Result<u64> {
        let result = match self.conn.read_message().await {
            Ok(message) => parse_value(&message, what),
            Err(e) => Err(e),
        };
        self.track(result)
    }

    async fn ensure_destination(&mut self) -> Result<()> {
        let dir = &self.config.destination;
        let result = tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| FramewireError::storage(dir, e));
        self.track(result)
    }

    async fn store_body(&mut self, frame_number: u64, expected: u64, path: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.config.destination)
            .await
            .map_err(|e| FramewireError::storage(&self.config.destination, e))?;
        let mut file = File::create(path)
            .await
            .map_err(|e| FramewireError::storage(path, e))?;

        match self.copy_body(frame_number, expected, &mut file, path).await {
            Ok(()) => {
                file.flush()
                    .await
                    .map_err(|e| FramewireError::storage(path, e))?;
                Ok(path.to_path_buf())
            }
            Err(e) => {
                drop(file);
                remove_partial(frame_number, path).await;
                Err(e)
            }
        }
    }

    async fn copy_body(
        &mut self,
        frame_number: u64,
        expected: u64,
        file: &mut File,
        path: &Path,
    ) -> Result<()> {
        let chunk_size = self.config.chunk_size.max(1);
        let read_timeout = self.config.read_timeout;
        let mut buf = vec![0u8; chunk_size];
        let mut received = 0u64;

        while received < expected {
            let want = (expected - received).min(chunk_size as u64) as usize;
            let read = tokio::time::timeout(read_timeout, self.conn.read_body(&mut buf[..want])).await;

            let n = match read {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(frame = frame_number, ?read_timeout, "Body read stalled");
                    0
                }
            };
            if n == 0 {
                return Err(FramewireError::Framing {
                    frame: frame_number,
                    expected,
                    actual: received,
                });
            }

            file.write_all(&buf[..n])
                .await
                .map_err(|e| FramewireError::storage(path, e))?;
            received += n as u64;
        }
        Ok(())
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.fail(e))
    }

    fn fail(&mut self, err: FramewireError) -> FramewireError {
        if !self.state.is_terminal() {
            self.state = TransferState::Failed;
        }
        tracing::error!(state = %self.state, "Receive failed: {}", err);
        err
    }
}

/// Delete a partially written frame file; returns whether it is gone.
async fn remove_partial(frame_number: u64, path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                frame = frame_number,
                path = %path.display(),
                "Partial frame file left behind: {}",
                e
            );
            false
        }
    }
}
