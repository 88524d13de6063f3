//! Configuration for both drivers.
//!
//! Addresses, ports and destination directories are passed in explicitly,
//! either through the builder-style setters or deserialized from JSON:
//!
//! ```
//! use framewire::config::ReceiverConfig;
//!
//! let config = ReceiverConfig::from_json(
//!     r#"{"port": 6000, "destination": "/var/frames", "read_timeout_ms": 2000}"#,
//! )
//! .unwrap();
//! assert_eq!(config.port, 6000);
//! assert_eq!(config.read_timeout.as_millis(), 2000);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{FramewireError, Result};
use crate::protocol::FileNaming;

/// Default TCP port for both roles.
pub const DEFAULT_PORT: u16 = 5000;

/// Default chunk size for body reads and writes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default deadline for a frame acknowledgment.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default idle deadline for a single body read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default wait before each frame (none: the ack gates the sender).
pub const DEFAULT_PACING_DELAY: Duration = Duration::ZERO;

/// What the sender does with an ack naming another frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckPolicy {
    /// Log a warning, count it, keep waiting.
    #[default]
    Ignore,
    /// Fail with `UnexpectedAck`.
    Strict,
}

fn duration_ms<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_ack_timeout() -> Duration {
    DEFAULT_ACK_TIMEOUT
}

fn default_read_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}

fn default_true() -> bool {
    true
}

fn check_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(FramewireError::Protocol(
            "Chunk size must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Configuration for the sending side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SenderConfig {
    /// Receiver host name or IP address.
    pub address: String,
    /// Receiver port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest body chunk written at once.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Wait before each frame.
    #[serde(default, rename = "pacing_delay_ms", deserialize_with = "duration_ms")]
    pub pacing_delay: Duration,
    /// Deadline for each acknowledgment.
    #[serde(
        default = "default_ack_timeout",
        rename = "ack_timeout_ms",
        deserialize_with = "duration_ms"
    )]
    pub ack_timeout: Duration,
    /// Handling of mismatched acknowledgments.
    #[serde(default)]
    pub ack_policy: AckPolicy,
}

impl SenderConfig {
    /// Create a config for `address` with default settings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: DEFAULT_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pacing_delay: DEFAULT_PACING_DELAY,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            ack_policy: AckPolicy::default(),
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        check_chunk_size(config.chunk_size)?;
        Ok(config)
    }

    /// Set the receiver port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the body chunk size (at least 1).
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the wait before each frame.
    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    /// Set the acknowledgment deadline.
    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Set the mismatched-ack policy.
    pub fn ack_policy(mut self, policy: AckPolicy) -> Self {
        self.ack_policy = policy;
        self
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

/// Configuration for the receiving side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReceiverConfig {
    /// Address to bind; `None` binds what `localhost` resolves to.
    #[serde(default)]
    pub bind_address: Option<String>,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory stored frames are written to.
    pub destination: PathBuf,
    /// Largest body chunk read at once.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Idle deadline for one body read.
    #[serde(
        default = "default_read_timeout",
        rename = "read_timeout_ms",
        deserialize_with = "duration_ms"
    )]
    pub read_timeout: Duration,
    /// File naming for stored frames.
    #[serde(default)]
    pub naming: FileNaming,
    /// Write `manifest.json` after a full sequence.
    #[serde(default = "default_true")]
    pub write_manifest: bool,
}

impl ReceiverConfig {
    /// Create a config writing into `destination` with default settings.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            bind_address: None,
            port: DEFAULT_PORT,
            destination: destination.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            naming: FileNaming::default(),
            write_manifest: true,
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        check_chunk_size(config.chunk_size)?;
        Ok(config)
    }

    /// Set the bind address.
    pub fn bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = Some(address.into());
        self
    }

    /// Set the listening port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the body chunk size (at least 1).
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the idle deadline for body reads.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the stored file naming.
    pub fn naming(mut self, naming: FileNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Enable or disable the manifest.
    pub fn write_manifest(mut self, enabled: bool) -> Self {
        self.write_manifest = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_defaults() {
        let config = SenderConfig::new("10.0.0.2");
        assert_eq!(config.address, "10.0.0.2");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.pacing_delay, Duration::ZERO);
        assert_eq!(config.ack_timeout, DEFAULT_ACK_TIMEOUT);
        assert_eq!(config.ack_policy, AckPolicy::Ignore);
    }

    #[test]
    fn test_sender_builder_chaining() {
        let config = SenderConfig::new("localhost")
            .port(6001)
            .chunk_size(0)
            .pacing_delay(Duration::from_millis(5))
            .ack_timeout(Duration::from_secs(2))
            .ack_policy(AckPolicy::Strict);

        assert_eq!(config.port, 6001);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.pacing_delay, Duration::from_millis(5));
        assert_eq!(config.ack_timeout, Duration::from_secs(2));
        assert_eq!(config.ack_policy, AckPolicy::Strict);
    }

    #[test]
    fn test_sender_from_json() {
        let config = SenderConfig::from_json(
            r#"{"address": "192.168.1.4", "pacing_delay_ms": 1000, "ack_policy": "strict"}"#,
        )
        .unwrap();

        assert_eq!(config.address, "192.168.1.4");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.pacing_delay, Duration::from_secs(1));
        assert_eq!(config.ack_timeout, DEFAULT_ACK_TIMEOUT);
        assert_eq!(config.ack_policy, AckPolicy::Strict);
    }

    #[test]
    fn test_sender_from_json_requires_address() {
        assert!(SenderConfig::from_json(r#"{"port": 1}"#).is_err());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = SenderConfig::from_json(r#"{"address": "a", "chunk_size": 0}"#).unwrap_err();
        assert!(err.to_string().contains("Chunk size"));
    }

    #[test]
    fn test_receiver_defaults() {
        let config = ReceiverConfig::new("/tmp/frames");
        assert_eq!(config.bind_address, None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.destination, PathBuf::from("/tmp/frames"));
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
        assert_eq!(config.naming, FileNaming::default());
        assert!(config.write_manifest);
    }

    #[test]
    fn test_receiver_from_json() {
        let config = ReceiverConfig::from_json(
            r#"{
                "bind_address": "0.0.0.0",
                "destination": "/srv/frames",
                "chunk_size": 4096,
                "naming": {"prefix": "img", "extension": "jpg"},
                "write_manifest": false
            }"#,
        )
        .unwrap();

        assert_eq!(config.bind_address.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.naming.file_name(3), "img3.jpg");
        assert!(!config.write_manifest);
    }

    #[test]
    fn test_receiver_builder_chaining() {
        let config = ReceiverConfig::new("out")
            .bind_address("127.0.0.1")
            .port(0)
            .chunk_size(1)
            .read_timeout(Duration::from_millis(100))
            .naming(FileNaming::new("f", ""))
            .write_manifest(false);

        assert_eq!(config.bind_address.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.port, 0);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.read_timeout, Duration::from_millis(100));
        assert_eq!(config.naming.file_name(1), "f1");
        assert!(!config.write_manifest);
    }
}
