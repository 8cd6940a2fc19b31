//! PC-60FW session layer.
//!
//! This crate drives the connection state machine, feeds transport
//! notifications through the frame decoder, and persists the resulting
//! vitals samples to a sink.

pub mod config;
pub mod replay;
pub mod session;
pub mod sink;
