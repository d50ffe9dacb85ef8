//! # Redbin Core
//!
//! Core types shared by every Redbin crate: the unified error type, the
//! request clock used to decide logical expiry, and tracing initialisation.

pub mod clock;
pub mod error;
pub mod result;
pub mod telemetry;

pub use clock::*;
pub use error::*;
pub use result::*;

// Re-export shaku for dependency injection
pub use shaku::{module, Component, HasComponent, Interface};
