//! # Protocol Layer
//!
//! Session key ownership on top of the packet buffer.

pub mod session;
