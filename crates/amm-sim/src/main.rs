//! # Streaming AMM Simulator
//!
//! Replays a fixed scenario against an in-memory pool on a manual clock:
//! a liquidity provider seeds the pool, two streamers open opposing flows,
//! a trader swaps halfway through, then both flows close and the pool is
//! reconciled against the ledger.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AMM_SIM_LIQUIDITY` | `1000` | Initial reserves, whole tokens per side |
//! | `AMM_SIM_RATE0` | `1000000000000000` | token0 flow rate, base units per second |
//! | `AMM_SIM_RATE1` | `500000000000000` | token1 flow rate, base units per second |
//! | `AMM_SIM_DURATION` | `3600` | Seconds simulated |
//! | `AMM_SIM_STEP` | `600` | Seconds between snapshots |
//! | `AMM_SIM_SWAP_AMOUNT` | `1` | token0 sold by the trader, whole tokens |
//! | `AMM_SIM_FEE_TO` | `false` | Turn the protocol fee on |
//!
//! Telemetry is configured through `amm-telemetry` (`AMM_LOG_LEVEL`,
//! `AMM_LOG_FORMAT`, `AMM_METRICS`). `--debug` raises the log level.

use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use tracing::{info, warn};

use amm_telemetry::{init_telemetry, TelemetryConfig};
use streaming_amm::adapters::{InMemoryLedger, LoggingEventPublisher, ManualClock};
use streaming_amm::domain::{math, Address, Asset, FlowRate, PoolConfig, StreamingPool, BPS};
use streaming_amm::ports::{AssetLedger, FlowLifecycleHandler, StreamingPoolApi, TimeSource};
use streaming_amm::{PoolService, U256};

const POOL: Address = [0xA0; 20];
const PROVIDER: Address = [0x01; 20];
const STREAMER0: Address = [0x02; 20];
const STREAMER1: Address = [0x03; 20];
const TRADER: Address = [0x04; 20];
const FEE_SINK: Address = [0x05; 20];

const GENESIS: u64 = 1_700_000_000;

type Ledger = InMemoryLedger<ManualClock>;
type Service = PoolService<Ledger, Ledger, LoggingEventPublisher, ManualClock>;

#[derive(Debug, Clone)]
struct SimConfig {
    liquidity: u64,
    rate0: FlowRate,
    rate1: FlowRate,
    duration: u64,
    step: u64,
    swap_amount: u64,
    fee_on: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            liquidity: 1_000,
            rate0: 1_000_000_000_000_000,
            rate1: 500_000_000_000_000,
            duration: 3_600,
            step: 600,
            swap_amount: 1,
            fee_on: false,
        }
    }
}

impl SimConfig {
    fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = parsed("AMM_SIM_LIQUIDITY") {
            config.liquidity = v;
        }
        if let Some(v) = parsed("AMM_SIM_RATE0") {
            config.rate0 = v;
        }
        if let Some(v) = parsed("AMM_SIM_RATE1") {
            config.rate1 = v;
        }
        if let Some(v) = parsed("AMM_SIM_DURATION") {
            config.duration = v;
        }
        if let Some(v) = parsed("AMM_SIM_STEP") {
            config.step = v;
        }
        if let Some(v) = parsed("AMM_SIM_SWAP_AMOUNT") {
            config.swap_amount = v;
        }
        if let Ok(v) = std::env::var("AMM_SIM_FEE_TO") {
            config.fee_on = v.to_lowercase() == "true" || v == "1";
        }

        config
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.liquidity > 0, "AMM_SIM_LIQUIDITY must be positive");
        ensure!(self.rate0 > 0 && self.rate1 > 0, "flow rates must be positive");
        ensure!(self.step > 0, "AMM_SIM_STEP must be positive");
        Ok(())
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

/// Output for `amount_in` against the given reserves, net of the swap fee.
fn quote_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u32,
) -> Result<U256> {
    let with_fee = math::mul(amount_in, U256::from(BPS - fee_bps))?;
    let denominator = math::add(math::mul(reserve_in, U256::from(BPS))?, with_fee)?;
    Ok(math::mul_div(with_fee, reserve_out, denominator)?)
}

struct Simulation {
    config: SimConfig,
    clock: Arc<ManualClock>,
    ledger: Arc<Ledger>,
    service: Service,
    fee_bps: u32,
}

impl Simulation {
    fn new(config: SimConfig) -> Result<Self> {
        let clock = Arc::new(ManualClock::new(GENESIS));
        let ledger = Arc::new(InMemoryLedger::new(clock.clone()));

        let mut pool_config = PoolConfig::default();
        if config.fee_on {
            pool_config = pool_config.with_fee_to(FEE_SINK);
        }
        let fee_bps = pool_config.swap_fee_bps;
        let pool = StreamingPool::new(POOL, pool_config, GENESIS).context("pool config")?;
        let service = PoolService::new(
            pool,
            ledger.clone(),
            ledger.clone(),
            Arc::new(LoggingEventPublisher),
            clock.clone(),
        );

        let float = tokens(config.liquidity * 10);
        for account in [PROVIDER, STREAMER0, STREAMER1, TRADER] {
            ledger.mint(Asset::Token0, account, float);
            ledger.mint(Asset::Token1, account, float);
        }

        Ok(Self {
            config,
            clock,
            ledger,
            service,
            fee_bps,
        })
    }

    fn seed(&self) -> Result<()> {
        let amount = tokens(self.config.liquidity);
        self.ledger.transfer(Asset::Token0, &PROVIDER, &POOL, amount)?;
        self.ledger.transfer(Asset::Token1, &PROVIDER, &POOL, amount)?;
        let receipt = self.service.mint(PROVIDER).context("seeding liquidity")?;
        info!(liquidity = %receipt.liquidity, "pool seeded");
        Ok(())
    }

    fn open_flows(&self) -> Result<()> {
        let opened = [
            (STREAMER0, Asset::Token0, self.config.rate0),
            (STREAMER1, Asset::Token1, self.config.rate1),
        ];
        for (user, asset, rate) in opened {
            self.ledger.create_flow(asset, user, POOL, rate)?;
            self.service
                .on_flow_created(user, asset, rate)
                .with_context(|| format!("opening {asset:?} flow"))?;
        }
        Ok(())
    }

    fn close_flows(&self) -> Result<()> {
        for (user, asset) in [(STREAMER0, Asset::Token0), (STREAMER1, Asset::Token1)] {
            self.ledger.delete_flow(asset, user, POOL)?;
            let receipt = self
                .service
                .on_flow_deleted(user, asset)
                .with_context(|| format!("closing {asset:?} flow"))?;
            info!(asset = ?asset, paid0 = %receipt.paid0, paid1 = %receipt.paid1, "flow closed");
        }
        Ok(())
    }

    fn trade(&self) -> Result<()> {
        let amount_in = tokens(self.config.swap_amount);
        let reserves = self.service.get_real_time_reserves()?;
        let amount_out = quote_out(amount_in, reserves.reserve0, reserves.reserve1, self.fee_bps)?;

        self.ledger.transfer(Asset::Token0, &TRADER, &POOL, amount_in)?;
        self.service
            .swap(U256::zero(), amount_out, TRADER, Vec::new())
            .context("trader swap")?;
        info!(amount_in = %amount_in, amount_out = %amount_out, "trader swapped");
        Ok(())
    }

    fn snapshot(&self) -> Result<()> {
        let reserves = self.service.get_real_time_reserves()?;
        let owed0 = self.service.get_real_time_user_balances(STREAMER0)?;
        let owed1 = self.service.get_real_time_user_balances(STREAMER1)?;
        info!(
            elapsed = self.clock.now() - GENESIS,
            reserve0 = %reserves.reserve0,
            reserve1 = %reserves.reserve1,
            streamer0_owed1 = %owed0.balance1,
            streamer1_owed0 = %owed1.balance0,
            "snapshot"
        );
        Ok(())
    }

    fn run(&self) -> Result<()> {
        self.seed()?;
        self.open_flows()?;

        let midpoint = GENESIS + self.config.duration / 2;
        let mut traded = false;
        let mut elapsed = 0;
        while elapsed < self.config.duration {
            let step = self.config.step.min(self.config.duration - elapsed);
            self.clock.advance(step);
            elapsed += step;

            if !traded && self.clock.now() >= midpoint {
                self.trade()?;
                traded = true;
            }
            self.snapshot()?;
        }

        self.close_flows()?;

        for asset in [Asset::Token0, Asset::Token1] {
            let report = self.service.reconcile(asset)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let mut logging = TelemetryConfig::from_env();
    if std::env::args().any(|arg| arg == "--debug") {
        logging = logging.with_log_level("debug");
    }
    let telemetry = init_telemetry(logging).context("initializing telemetry")?;

    let config = SimConfig::from_env();
    config.validate()?;
    info!(?config, "starting simulation");

    Simulation::new(config)?.run()?;

    if let Some(text) = telemetry.render_metrics()? {
        println!("{text}");
    }
    Ok(())
}
