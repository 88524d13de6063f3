//! # framewire
//!
//! Acknowledged, frame-by-frame byte transfer over a single TCP connection.
//!
//! A sender announces how many frames follow and the step between frame
//! numbers, then for every frame sends its size and its raw body and waits
//! for the receiver to answer `OK FRAME <n>` before moving on.
//!
//! ## Wire format
//!
//! - **Control messages**: ASCII, `\n`-terminated, at most 1024 bytes
//! - **Bodies**: exactly as many raw bytes as the preceding size announced
//!
//! ```text
//! sender                         receiver
//!   "3\n"             ------>          total frame count
//!   "1\n"             ------>          frame increment
//!   "10\n"            ------>          size of frame 0
//!   <10 body bytes>   ------>
//!                     <------   "OK FRAME 0\n"
//!   ...
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use framewire::{FrameSender, SenderConfig};
//!
//! #[tokio::main]
//! async fn main() -> framewire::Result<()> {
//!     let mut sender = FrameSender::connect(SenderConfig::new("127.0.0.1")).await?;
//!     let bodies = vec![vec![0xFF; 10], Vec::new(), vec![7; 2000]];
//!     sender.send_sequence(0, 1, &bodies).await?;
//!     sender.finish().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod manifest;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod state;
pub mod transport;

pub use config::{AckPolicy, ReceiverConfig, SenderConfig};
pub use error::{FramewireError, Result};
pub use manifest::{FrameRecord, TransferSummary};
pub use protocol::{FileNaming, Frame, FrameNumbering};
pub use receiver::FrameReceiver;
pub use sender::FrameSender;
pub use state::TransferState;
