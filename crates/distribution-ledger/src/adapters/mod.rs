//! # Adapters Layer (Outer Hexagon)
//!
//! In-memory implementations of the outbound ports.

pub mod custody;
pub mod event_sink;

pub use custody::*;
pub use event_sink::*;
