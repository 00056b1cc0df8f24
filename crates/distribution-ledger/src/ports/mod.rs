//! # Ports Layer (Middle Hexagon)
//!
//! - **Driving Port (Inbound)**: `DistributorApi`
//! - **Driven Ports (Outbound)**: `CustodyService`, `DistributorCallback`, `EventSink`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
