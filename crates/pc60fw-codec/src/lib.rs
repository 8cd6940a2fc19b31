//! PC-60FW wire codec.
//!
//! Reassembles sync-delimited frames from an arbitrarily fragmented
//! notification stream, checks the CRC-8/MAXIM trailer, maps decoded
//! payloads to vitals samples, and encodes the fixed outbound commands.

pub mod command;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod message;

pub use command::Command;
pub use decoder::{DecoderStats, FrameDecoder};
pub use error::CodecError;
pub use frame::{decode_frame, encode_frame, DecodedMessage};
pub use message::{interpret, interpret_at, MessageType};
