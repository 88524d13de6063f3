//! Protocol module - control messages, frames and naming.
//!
//! This module implements the wire vocabulary shared by both drivers:
//! - `\n`-terminated ASCII control messages (counts, sizes, acks)
//! - Buffer for splitting socket reads into control messages
//! - Frame struct and frame numbering

mod control;
mod frame;

pub use control::{
    decode_message, encode, parse_ack, parse_value, ControlBuffer, ControlMessage, ACK_PREFIX,
    MAX_CONTROL_MESSAGE_LEN, TERMINATOR,
};
pub use frame::{FileNaming, Frame, FrameNumbering};
