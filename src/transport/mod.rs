//! Transport module - connection factory and the connection type.
//!
//! Provides:
//! - [`open_as_sender`] / [`open_as_receiver`] for TCP
//! - [`FrameListener`] when the port must be known before accepting
//! - [`Connection`] over any async byte stream

mod connection;
mod tcp;

pub use connection::{Connection, Role};
pub use tcp::{open_as_receiver, open_as_sender, FrameListener, TcpConnection};
