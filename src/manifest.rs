//! Transfer summary and the `manifest.json` written next to stored frames.
//!
//! The downstream consumer reads the total frame count from here:
//!
//! ```json
//! {
//!   "total": 3,
//!   "base": 0,
//!   "increment": 1,
//!   "frames": [
//!     { "number": 0, "size": 10, "path": "/srv/frames/frame0.bin" },
//!     { "number": 1, "size": 0, "path": "/srv/frames/frame1.bin" },
//!     { "number": 2, "size": 2000, "path": "/srv/frames/frame2.bin" }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FramewireError, Result};

/// File name of the manifest inside the destination directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// One transferred frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Frame number.
    pub number: u64,
    /// Body size in bytes.
    pub size: u64,
    /// Stored file (receiving side only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Outcome of a complete frame sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSummary {
    /// Announced frame count.
    pub total: u64,
    /// First frame number.
    pub base: u64,
    /// Step between frame numbers.
    pub increment: u64,
    /// Frames in transfer order.
    pub frames: Vec<FrameRecord>,
}

impl TransferSummary {
    /// Create an empty summary.
    pub fn new(total: u64, base: u64, increment: u64) -> Self {
        Self {
            total,
            base,
            increment,
            frames: Vec::with_capacity(total.min(4096) as usize),
        }
    }

    /// Record a transferred frame.
    pub fn push(&mut self, number: u64, size: u64, path: Option<PathBuf>) {
        self.frames.push(FrameRecord { number, size, path });
    }

    /// Sum of all body sizes.
    pub fn total_bytes(&self) -> u64 {
        self.frames.iter().map(|f| f.size).sum()
    }

    /// `true` when every announced frame was transferred.
    pub fn is_complete(&self) -> bool {
        self.frames.len() as u64 == self.total
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write `manifest.json` into `dir`; returns its path.
    pub async fn write_manifest(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let json = self.to_json()?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| FramewireError::storage(&path, e))?;
        Ok(path)
    }

    /// Read `manifest.json` from `dir`.
    pub async fn read_manifest(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| FramewireError::storage(&path, e))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransferSummary {
        let mut summary = TransferSummary::new(3, 0, 1);
        summary.push(0, 10, Some(PathBuf::from("out/frame0.bin")));
        summary.push(1, 0, Some(PathBuf::from("out/frame1.bin")));
        summary.push(2, 2000, Some(PathBuf::from("out/frame2.bin")));
        summary
    }

    #[test]
    fn test_totals() {
        let summary = sample();
        assert_eq!(summary.total_bytes(), 2010);
        assert!(summary.is_complete());

        let partial = TransferSummary::new(2, 0, 1);
        assert!(!partial.is_complete());
    }

    #[test]
    fn test_json_shape() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["total"], 3);
        assert_eq!(value["increment"], 1);
        assert_eq!(value["frames"][2]["size"], 2000);
        assert_eq!(value["frames"][0]["path"], "out/frame0.bin");
    }

    #[test]
    fn test_sender_records_omit_path() {
        let mut summary = TransferSummary::new(1, 4, 2);
        summary.push(4, 1, None);

        let json = summary.to_json().unwrap();
        assert!(!json.contains("path"));
        assert_eq!(TransferSummary::from_json(&json).unwrap(), summary);
    }

    #[tokio::test]
    async fn test_write_to_missing_dir_is_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("missing").join("nested");

        let err = sample().write_manifest(&dir).await.unwrap_err();
        assert!(matches!(err, FramewireError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_write_then_read_manifest() {
        let tmp = tempfile::tempdir().unwrap();

        let path = sample().write_manifest(tmp.path()).await.unwrap();
        assert_eq!(path, tmp.path().join(MANIFEST_FILE_NAME));
        assert_eq!(TransferSummary::read_manifest(tmp.path()).await.unwrap(), sample());
    }
}
