//! # Streaming AMM
//!
//! Constant-product pool that accepts continuous token flows as deposits
//! alongside classical discrete swaps.
//!
//! ## Purpose
//!
//! At any instant, without a write at that instant, the pool can answer
//! "what are the reserves now" and "what has each streamer been swapped out
//! so far". Flows are converted along the constant-product curve as time
//! passes; discrete swap/mint/burn run against freshly settled reserves.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | `reserve0 · reserve1` never grows from time alone; floor rounding only | `domain/reserves.rs` |
//! | Queries equal what a mutation at the same timestamp settles to | `domain/settlement.rs` (shared code path) |
//! | Ledger ≥ reserve + Σ streamer balances, surplus is dust | `domain/settlement.rs` floor division |
//! | Fee-adjusted product check on swap ("K") | `domain/pool.rs` - `swap()` |
//! | Failed calls leave state untouched | `domain/pool.rs` - commit after validation |
//! | Refused payouts undo the call | `service.rs` - `pay()` with `domain/pool.rs` checkpoints |
//! | No reentrant mutations; queries read committed state | `service.rs` - busy flag + `RwLock` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - in-memory ledger, manual clock, event log          │
//! │  service.rs - PoolService (locking, events, payouts, metrics)   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - StreamingPoolApi, FlowLifecycleHandler     │
//! │  ports/outbound.rs - AssetLedger, FlowProvider, TimeSource,     │
//! │                      EventPublisher                             │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/math.rs       - isqrt, mul_div, UQ112x112               │
//! │  domain/reserves.rs   - real-time reserve projection            │
//! │  domain/settlement.rs - pool and per-stream settlement          │
//! │  domain/pool.rs       - StreamingPool                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use streaming_amm::adapters::{InMemoryEventLog, InMemoryLedger, ManualClock};
//! use streaming_amm::domain::{PoolConfig, StreamingPool};
//! use streaming_amm::ports::{FlowLifecycleHandler, StreamingPoolApi};
//! use streaming_amm::service::PoolService;
//!
//! let clock = Arc::new(ManualClock::new(0));
//! let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
//! let pool = StreamingPool::new(pool_address, PoolConfig::default(), 0)?;
//! let service = PoolService::new(pool, ledger.clone(), ledger, Arc::new(InMemoryEventLog::new()), clock);
//!
//! service.mint(provider)?;
//! service.on_flow_created(streamer, Asset::Token0, rate)?;
//! let reserves = service.get_real_time_reserves()?;
//! ```

pub mod adapters;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;

pub use domain::{
    Address, Asset, PoolConfig, PoolError, PoolState, Reserves, StreamRecord, StreamingPool,
    UserBalances, U256,
};
pub use events::PoolEvent;
pub use service::PoolService;
