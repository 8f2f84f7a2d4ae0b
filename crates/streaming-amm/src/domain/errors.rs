use super::entities::{Address, Asset, FlowRate, Timestamp, U256};
use thiserror::Error;

/// Integer arithmetic failures. Always fatal to the triggering call.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Post-swap constant-product check failed.
    #[error("K: constant-product invariant violated")]
    InvariantViolation,

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("Insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    #[error("Insufficient output amount")]
    InsufficientOutputAmount,

    #[error("Insufficient input amount")]
    InsufficientInputAmount,

    #[error("Invalid recipient: {0:?}")]
    InvalidRecipient(Address),

    /// A mutating call arrived while another one was in flight.
    #[error("Locked: reentrant call rejected")]
    Locked,

    #[error("Arithmetic failure: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("Invalid timestamp: requested {requested}, last settled {last_settled}")]
    InvalidTimestamp {
        requested: Timestamp,
        last_settled: Timestamp,
    },

    #[error("Invalid flow rate: {0}")]
    InvalidFlowRate(FlowRate),

    #[error("Flow rate mismatch for {asset:?}: notified {notified}, provider reports {actual}")]
    FlowRateMismatch {
        asset: Asset,
        notified: FlowRate,
        actual: FlowRate,
    },

    #[error("No {asset:?} stream for {user:?}")]
    StreamNotFound { user: Address, asset: Asset },

    #[error("{asset:?} stream already exists for {user:?}")]
    StreamAlreadyExists { user: Address, asset: Asset },

    #[error("Insufficient liquidity token balance: required {required}, available {available}")]
    InsufficientLiquidityBalance {
        required: U256,
        available: U256,
    },

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PoolError {
    /// Short label used for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvariantViolation => "k",
            Self::InsufficientLiquidity => "insufficient_liquidity",
            Self::InsufficientLiquidityMinted => "insufficient_liquidity_minted",
            Self::InsufficientLiquidityBurned => "insufficient_liquidity_burned",
            Self::InsufficientOutputAmount => "insufficient_output",
            Self::InsufficientInputAmount => "insufficient_input",
            Self::InvalidRecipient(_) => "invalid_recipient",
            Self::Locked => "locked",
            Self::Arithmetic(_) => "arithmetic",
            Self::InvalidTimestamp { .. } => "invalid_timestamp",
            Self::InvalidFlowRate(_) => "invalid_flow_rate",
            Self::FlowRateMismatch { .. } => "flow_rate_mismatch",
            Self::StreamNotFound { .. } => "stream_not_found",
            Self::StreamAlreadyExists { .. } => "stream_exists",
            Self::InsufficientLiquidityBalance { .. } => "insufficient_lp_balance",
            Self::Ledger(_) => "ledger",
            Self::InvalidConfig(_) => "config",
        }
    }
}
