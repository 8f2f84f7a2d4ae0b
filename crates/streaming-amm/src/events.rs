//! # Pool Events
//!
//! Emitted through the `EventPublisher` port after a call has committed.
//! Every variant is serde-serializable for log shipping.
//!
//! | Event | Emitted by |
//! |-------|------------|
//! | `Mint` | `mint` |
//! | `Burn` | `burn` |
//! | `Swap` | `swap` |
//! | `Sync` | `swap`, `mint`, `burn`, `sync` |
//! | `LiquidityTransfer` | `transfer_liquidity` |
//! | `FlowSettled` | flow create / update / delete |

use crate::domain::{Address, Asset, FlowChange, Timestamp, U256};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoolEvent {
    Mint {
        to: Address,
        amount0: U256,
        amount1: U256,
        liquidity: U256,
    },
    Burn {
        to: Address,
        amount0: U256,
        amount1: U256,
        liquidity: U256,
    },
    Swap {
        to: Address,
        amount0_in: U256,
        amount1_in: U256,
        amount0_out: U256,
        amount1_out: U256,
        /// Opaque caller payload. Recorded, never executed.
        data: Vec<u8>,
    },
    Sync {
        reserve0: U256,
        reserve1: U256,
        timestamp: Timestamp,
    },
    LiquidityTransfer {
        from: Address,
        to: Address,
        amount: U256,
    },
    FlowSettled {
        user: Address,
        asset: Asset,
        change: FlowChange,
        flow_rate: U256,
        paid0: U256,
        paid1: U256,
        timestamp: Timestamp,
    },
}

impl PoolEvent {
    /// Event name for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            PoolEvent::Mint { .. } => "mint",
            PoolEvent::Burn { .. } => "burn",
            PoolEvent::Swap { .. } => "swap",
            PoolEvent::Sync { .. } => "sync",
            PoolEvent::LiquidityTransfer { .. } => "liquidity_transfer",
            PoolEvent::FlowSettled { .. } => "flow_settled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_tag() {
        let event = PoolEvent::Sync {
            reserve0: U256::from(1_000u64),
            reserve1: U256::from(2_000u64),
            timestamp: 42,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"sync\""));

        let back: PoolEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.kind(), "sync");
    }

    #[test]
    fn test_flow_event_carries_change() {
        let event = PoolEvent::FlowSettled {
            user: [3u8; 20],
            asset: Asset::Token1,
            change: FlowChange::Deleted,
            flow_rate: U256::zero(),
            paid0: U256::from(9u64),
            paid1: U256::zero(),
            timestamp: 7,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["change"], "Deleted");
        assert_eq!(json["asset"], "Token1");
    }
}
