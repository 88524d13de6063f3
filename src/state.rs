//! Transfer state machine shared by both drivers.
//!
//! ```text
//!  Init ──count──▶ CountNegotiated ──increment──▶ IncrementNegotiated
//!
//!  IncrementNegotiated ──size──▶ SizeSent ──body──▶ BodyTransferred
//!          │                        ▲                     │
//!          │                        └──size── Acked ◀─ack─┘
//!          │                                    │
//!          └───────────────finish───────────────┴──▶ Done
//!
//!  any non-terminal state ──ack deadline──▶ TimedOut
//!  any non-terminal state ──error──▶ Failed
//! ```
//!
//! On the receiving side `SizeSent` means the size has been read.

use std::fmt;

use crate::error::{FramewireError, Result};

/// Every state a [`FrameSender`](crate::sender::FrameSender) or
/// [`FrameReceiver`](crate::receiver::FrameReceiver) can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferState {
    /// Nothing exchanged yet.
    #[default]
    Init,
    /// Total frame count announced.
    CountNegotiated,
    /// Frame-number increment announced; sizes may follow.
    IncrementNegotiated,
    /// Size of the current frame announced.
    SizeSent,
    /// Body of the current frame fully transferred.
    BodyTransferred,
    /// Current frame acknowledged.
    Acked,
    /// Sequence finished and connection released.
    Done,
    /// Acknowledgment deadline expired.
    TimedOut,
    /// Any other error ended the transfer.
    Failed,
}

impl TransferState {
    /// `true` once no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::TimedOut | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition(self, next: TransferState) -> bool {
        use TransferState::*;

        match (self, next) {
            (Init, CountNegotiated) => true,
            (CountNegotiated, IncrementNegotiated) => true,
            (IncrementNegotiated | Acked, SizeSent) => true,
            (SizeSent, BodyTransferred) => true,
            (BodyTransferred, Acked) => true,
            (IncrementNegotiated | Acked, Done) => true,
            (from, TimedOut | Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Move to `next`, or fail with a protocol error naming both states.
    pub fn advance(&mut self, next: TransferState) -> Result<()> {
        if !self.can_transition(next) {
            return Err(FramewireError::Protocol(format!(
                "Invalid transition {} -> {}",
                self, next
            )));
        }
        *self = next;
        Ok(())
    }

    /// Fail unless the current state is one of `allowed`.
    pub fn expect(self, allowed: &[TransferState], operation: &str) -> Result<()> {
        if allowed.contains(&self) {
            Ok(())
        } else {
            Err(FramewireError::Protocol(format!(
                "Cannot {} in state {}",
                operation, self
            )))
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
