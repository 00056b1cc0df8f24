//! # Distribution Ledger Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs       # Shared deployments and allocation builders
//! │   └── integration/      # End-to-end flows across ledger, custody and sinks
//! │       ├── scenarios.rs
//! │       ├── concurrency.rs
//! │       ├── events.rs
//! │       └── telemetry.rs
//! └── benches/              # Criterion benchmarks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p distribution-tests
//!
//! # By category
//! cargo test -p distribution-tests integration::scenarios
//! cargo test -p distribution-tests integration::concurrency
//!
//! # Benchmarks
//! cargo bench -p distribution-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
