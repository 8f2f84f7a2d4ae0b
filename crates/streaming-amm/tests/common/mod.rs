//! Shared fixture: one pool on an in-memory streaming ledger with a manual
//! clock, and a wallet funded with 10,000 of each token.

#![allow(dead_code)]

use std::sync::Arc;

use streaming_amm::adapters::{InMemoryEventLog, InMemoryLedger, ManualClock};
use streaming_amm::domain::{
    Address, Asset, FlowRate, MintReceipt, PoolConfig, StreamingPool, Timestamp, U256,
};
use streaming_amm::ports::{AssetLedger, FlowLifecycleHandler, StreamingPoolApi};
use streaming_amm::PoolService;

pub const POOL: Address = [0xAA; 20];
pub const WALLET: Address = [0x11; 20];
pub const OTHER: Address = [0x22; 20];
pub const START: Timestamp = 1_700_000_000;
pub const MINIMUM_LIQUIDITY: u64 = 1_000;

pub type Ledger = InMemoryLedger<ManualClock>;
pub type Service = PoolService<Ledger, Ledger, InMemoryEventLog, ManualClock>;

pub fn expand_to_18_decimals(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

pub fn dec(value: &str) -> U256 {
    U256::from_dec_str(value).unwrap()
}

pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<Ledger>,
    pub events: Arc<InMemoryEventLog>,
    pub service: Arc<Service>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        amm_telemetry::init_test_tracing();
        let clock = Arc::new(ManualClock::new(START));
        let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
        let events = Arc::new(InMemoryEventLog::new());
        ledger.mint(Asset::Token0, WALLET, expand_to_18_decimals(10_000));
        ledger.mint(Asset::Token1, WALLET, expand_to_18_decimals(10_000));

        let pool = StreamingPool::new(POOL, config, START).unwrap();
        let service = Arc::new(PoolService::new(
            pool,
            ledger.clone(),
            ledger.clone(),
            events.clone(),
            clock.clone(),
        ));
        Self {
            clock,
            ledger,
            events,
            service,
        }
    }

    pub fn now(&self) -> Timestamp {
        use streaming_amm::ports::TimeSource;
        self.clock.now()
    }

    pub fn deposit(&self, asset: Asset, amount: U256) {
        self.ledger.transfer(asset, &WALLET, &POOL, amount).unwrap();
    }

    pub fn add_liquidity(&self, amount0: U256, amount1: U256) -> MintReceipt {
        self.deposit(Asset::Token0, amount0);
        self.deposit(Asset::Token1, amount1);
        self.service.mint(WALLET).unwrap()
    }

    pub fn balance(&self, asset: Asset, account: &Address) -> U256 {
        self.ledger.balance_of(asset, account).unwrap()
    }

    pub fn start_flow(&self, user: Address, asset: Asset, rate: FlowRate) {
        self.ledger.create_flow(asset, user, POOL, rate).unwrap();
        self.service.on_flow_created(user, asset, rate).unwrap();
    }

    pub fn update_flow(&self, user: Address, asset: Asset, rate: FlowRate) {
        self.ledger.update_flow(asset, user, POOL, rate).unwrap();
        self.service.on_flow_updated(user, asset, rate).unwrap();
    }

    pub fn stop_flow(&self, user: Address, asset: Asset) {
        self.ledger.delete_flow(asset, user, POOL).unwrap();
        self.service.on_flow_deleted(user, asset).unwrap();
    }
}
