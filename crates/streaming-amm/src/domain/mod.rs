//! # Domain Layer - Streaming Pool
//!
//! Pure business logic. No I/O, no locking, no clock: the service layer
//! injects time and collaborators.
//!
//! ## Components
//!
//! - `entities`: PoolState, StreamRecord, PoolConfig, query results
//! - `math`: isqrt, mul_div, UQ112x112 encoding
//! - `reserves`: real-time reserve projection under active flows
//! - `settlement`: advances pool and stream state to a timestamp
//! - `registry`: per-depositor stream records
//! - `liquidity`: LP token supply and balances, protocol fee
//! - `pool`: StreamingPool with swap/mint/burn/sync/skim and flow lifecycle
//! - `errors`: PoolError, ArithmeticError
//!
//! ## Data Types
//!
//! - Address: `[u8; 20]`
//! - Amounts: `U256` (from primitive-types)
//! - Timestamp: `u64` seconds

pub mod entities;
pub mod errors;
pub mod liquidity;
pub mod math;
pub mod pool;
pub mod registry;
pub mod reserves;
pub mod settlement;

pub use entities::*;
pub use errors::*;
pub use liquidity::*;
pub use pool::*;
pub use registry::*;
pub use reserves::*;
pub use settlement::*;
