//! # Adapters Layer (Outer Hexagon)
//!
//! In-process implementations of the outbound ports. Production deployments
//! plug in a real token ledger and streaming protocol instead.

pub mod clock;
pub mod event_log;
pub mod memory_ledger;

pub use clock::*;
pub use event_log::*;
pub use memory_ledger::*;
