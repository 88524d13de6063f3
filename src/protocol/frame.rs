//! Frames, frame numbering and stored artifact naming.
//!
//! # Example
//!
//! ```
//! use framewire::protocol::{FileNaming, FrameNumbering};
//!
//! let numbering = FrameNumbering::new(10, 5).unwrap();
//! let numbers: Vec<u64> = numbering.numbers().take(3).collect();
//! assert_eq!(numbers, vec![10, 15, 20]);
//!
//! let naming = FileNaming::default();
//! assert_eq!(naming.file_name(15), "frame15.bin");
//! ```

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Deserialize;

use crate::error::{FramewireError, Result};

/// One numbered byte body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sequence number.
    pub number: u64,
    /// Body bytes (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl Frame {
    /// Create a frame from a number and body.
    pub fn new(number: u64, body: impl Into<Bytes>) -> Self {
        Self {
            number,
            body: body.into(),
        }
    }

    /// Body length in bytes, as announced on the wire.
    #[inline]
    pub fn len(&self) -> u64 {
        self.body.len() as u64
    }

    /// Check if the body is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Frame numbers: `base`, `base + increment`, `base + 2 * increment`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameNumbering {
    base: u64,
    increment: u64,
}

impl FrameNumbering {
    /// Create a numbering. An increment of 0 is rejected.
    pub fn new(base: u64, increment: u64) -> Result<Self> {
        if increment == 0 {
            return Err(FramewireError::Protocol(
                "Frame increment must be at least 1".to_string(),
            ));
        }
        Ok(Self { base, increment })
    }

    /// First frame number.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Step between consecutive frame numbers.
    pub fn increment(&self) -> u64 {
        self.increment
    }

    /// Number of the frame at `index`, or `None` on overflow.
    pub fn nth(&self, index: u64) -> Option<u64> {
        index
            .checked_mul(self.increment)
            .and_then(|offset| self.base.checked_add(offset))
    }

    /// All frame numbers in order; ends at `u64` overflow.
    pub fn numbers(&self) -> impl Iterator<Item = u64> {
        let numbering = *self;
        (0u64..).map_while(move |index| numbering.nth(index))
    }
}

/// Deterministic file name for a stored frame: `<prefix><n>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileNaming {
    /// Text before the frame number.
    pub prefix: String,
    /// Extension without the dot; empty for none.
    pub extension: String,
}

impl FileNaming {
    /// Create a naming scheme.
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// File name for frame `number`.
    pub fn file_name(&self, number: u64) -> String {
        if self.extension.is_empty() {
            format!("{}{}", self.prefix, number)
        } else {
            format!("{}{}.{}", self.prefix, number, self.extension)
        }
    }

    /// Full path for frame `number` under `dir`.
    pub fn path_in(&self, dir: &Path, number: u64) -> PathBuf {
        dir.join(self.file_name(number))
    }
}

impl Default for FileNaming {
    fn default() -> Self {
        Self::new("frame", "bin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len() {
        let frame = Frame::new(3, vec![0xFFu8; 10]);
        assert_eq!(frame.number, 3);
        assert_eq!(frame.len(), 10);
        assert!(!frame.is_empty());
        assert!(Frame::new(0, Bytes::new()).is_empty());
    }

    #[test]
    fn test_numbering_sequence() {
        let numbering = FrameNumbering::new(0, 1).unwrap();
        let numbers: Vec<u64> = numbering.numbers().take(4).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_numbering_with_base_and_step() {
        let numbering = FrameNumbering::new(100, 25).unwrap();
        assert_eq!(numbering.nth(0), Some(100));
        assert_eq!(numbering.nth(4), Some(200));
        assert_eq!(numbering.base(), 100);
        assert_eq!(numbering.increment(), 25);
    }

    #[test]
    fn test_numbering_zero_increment_rejected() {
        assert!(FrameNumbering::new(0, 0).is_err());
    }

    #[test]
    fn test_numbering_stops_at_overflow() {
        let numbering = FrameNumbering::new(u64::MAX - 1, 1).unwrap();
        let numbers: Vec<u64> = numbering.numbers().collect();
        assert_eq!(numbers, vec![u64::MAX - 1, u64::MAX]);
    }

    #[test]
    fn test_file_naming() {
        let naming = FileNaming::default();
        assert_eq!(naming.file_name(0), "frame0.bin");

        let jpg = FileNaming::new("frame", "jpg");
        assert_eq!(jpg.file_name(12), "frame12.jpg");

        let bare = FileNaming::new("img-", "");
        assert_eq!(bare.file_name(1), "img-1");

        let path = naming.path_in(Path::new("/data/out"), 2);
        assert_eq!(path, PathBuf::from("/data/out/frame2.bin"));
    }

    #[test]
    fn test_file_naming_deserialize_defaults() {
        let naming: FileNaming = serde_json::from_str(r#"{"extension": "jpg"}"#).unwrap();
        assert_eq!(naming.prefix, "frame");
        assert_eq!(naming.extension, "jpg");
    }
}
