//! Ports layer for the streaming pool.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: pool API and flow lifecycle notifications
//! - Outbound (Driven) ports: asset ledger, flow provider, clock, events

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
