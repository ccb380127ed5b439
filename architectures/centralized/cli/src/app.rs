use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use subpool_core::{
    format_units, parse_units, AccountId, Clock, OffsetClock, SECONDS_PER_DAY,
};
use subpool_ledger::{
    Asset, AssetSnapshot, InMemoryAsset, LedgerSnapshot, PoolId, PoolSchedule, PoolsConfig,
    SubPools,
};
use tracing::info;

/// The TOML file passed with `--config`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Account that holds every pool's assets on the asset ledger.
    pub custody: AccountId,
    pub asset: String,
    #[serde(default)]
    pub fee_enabled: bool,
}

impl CliConfig {
    pub fn pools_config(&self) -> PoolsConfig {
        PoolsConfig {
            asset: self.asset.clone(),
            fee_enabled: self.fee_enabled,
        }
    }
}

/// Everything persisted between invocations, stored as JSON with `--state`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub ledger: LedgerSnapshot<AccountId>,
    pub asset: AssetSnapshot<AccountId>,
    #[serde(default)]
    pub time_extra: u64,
}

impl LedgerState {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read ledger state file {path:?}"))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse ledger state file {path:?}"))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        // write-then-rename so a crash never leaves half a state file behind
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write ledger state file {tmp:?}"))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace ledger state file {path:?}"))
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Write an empty state file for the configured asset.
    Init,
    /// Check that the config and state files load.
    ValidateConfig,
    /// Create asset units out of thin air (test deployments only).
    Mint {
        #[clap(long)]
        to: AccountId,
        #[clap(long, value_parser = parse_units)]
        amount: u128,
    },
    /// Allow the pools to pull up to `amount` from `--from`.
    Approve {
        #[clap(long, value_parser = parse_units)]
        amount: u128,
    },
    Balance {
        #[clap(long)]
        of: AccountId,
    },
    CreatePool {
        #[clap(long)]
        duration_days: u32,
        #[clap(long)]
        window_days: u32,
        #[clap(long)]
        gap_days: u32,
        #[clap(long)]
        name: String,
    },
    StartPool {
        #[clap(long)]
        pool: PoolId,
    },
    Deposit {
        #[clap(long)]
        pool: PoolId,
        #[clap(long, value_parser = parse_units)]
        amount: u128,
    },
    Withdraw {
        #[clap(long)]
        pool: PoolId,
        #[clap(long, value_parser = parse_units)]
        shares: u128,
    },
    Position {
        #[clap(long)]
        pool: PoolId,
        #[clap(long)]
        of: AccountId,
    },
    Pool {
        #[clap(long)]
        pool: PoolId,
    },
    Pools,
    /// Shift the ledger clock forward from wall-clock time.
    TimeExtra {
        #[clap(long, conflicts_with = "seconds", required_unless_present = "seconds")]
        days: Option<u64>,
        #[clap(long)]
        seconds: Option<u64>,
    },
}

impl Command {
    /// Whether a successful run changes the persisted state.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Mint { .. }
                | Command::Approve { .. }
                | Command::CreatePool { .. }
                | Command::StartPool { .. }
                | Command::Deposit { .. }
                | Command::Withdraw { .. }
                | Command::TimeExtra { .. }
        )
    }
}

pub type CliPools<C> = SubPools<AccountId, InMemoryAsset<AccountId>, Arc<OffsetClock<C>>>;

pub struct App<C: Clock> {
    clock: Arc<OffsetClock<C>>,
    pools: CliPools<C>,
}

impl<C: Clock + 'static> App<C> {
    pub fn load(config: &CliConfig, state: LedgerState, clock: C) -> Result<Self> {
        let clock = Arc::new(OffsetClock::new(clock, state.time_extra));
        let pools = SubPools::restore(
            config.custody,
            InMemoryAsset::from_snapshot(state.asset),
            config.pools_config(),
            clock.clone(),
            state.ledger,
        )
        .context("ledger state is inconsistent")?;
        Ok(Self { clock, pools })
    }

    pub fn pools(&self) -> &CliPools<C> {
        &self.pools
    }

    pub async fn state(&self) -> LedgerState {
        LedgerState {
            ledger: self.pools.snapshot().await,
            asset: self.pools.asset().snapshot().await,
            time_extra: self.clock.extra(),
        }
    }

    /// Runs one command and returns what should be printed for the caller.
    pub async fn execute(&self, command: Command, from: Option<AccountId>) -> Result<String> {
        let signer = || match from {
            Some(from) => Ok(from),
            None => bail!("--from is required for this command"),
        };

        let output = match command {
            Command::Init | Command::ValidateConfig => String::new(),
            Command::Mint { to, amount } => {
                self.pools.asset().mint(&to, amount).await?;
                info!(to = %to, amount = %format_units(amount), "minted");
                format_units(self.pools.asset().balance_of(&to).await)
            }
            Command::Approve { amount } => {
                let owner = signer()?;
                self.pools
                    .asset()
                    .approve(&owner, self.pools.custody(), amount)
                    .await;
                info!(owner = %owner, amount = %format_units(amount), "approved");
                format_units(amount)
            }
            Command::Balance { of } => format_units(self.pools.asset().balance_of(&of).await),
            Command::CreatePool {
                duration_days,
                window_days,
                gap_days,
                name,
            } => {
                let creator = signer()?;
                let pool = self
                    .pools
                    .create_pool(
                        &creator,
                        PoolSchedule::new(duration_days, window_days, gap_days),
                        &name,
                    )
                    .await?;
                pool.to_string()
            }
            Command::StartPool { pool } => {
                self.pools.start_pool(&signer()?, pool).await?;
                String::new()
            }
            Command::Deposit { pool, amount } => {
                let shares = self.pools.deposit(&signer()?, pool, amount).await?;
                format_units(shares)
            }
            Command::Withdraw { pool, shares } => {
                let amount = self.pools.withdraw(&signer()?, pool, shares).await?;
                format_units(amount)
            }
            Command::Position { pool, of } => {
                format_units(self.pools.query_position(pool, &of).await?.shares)
            }
            Command::Pool { pool } => {
                serde_json::to_string_pretty(&self.pools.pool_info(pool).await?)?
            }
            Command::Pools => serde_json::to_string_pretty(&self.pools.pools().await)?,
            Command::TimeExtra { days, seconds } => {
                let extra = match (days, seconds) {
                    (Some(days), _) => days
                        .checked_mul(SECONDS_PER_DAY)
                        .context("time extra overflows")?,
                    (None, Some(seconds)) => seconds,
                    (None, None) => bail!("one of --days or --seconds is required"),
                };
                self.clock.set_extra(extra);
                info!(extra, now = self.clock.unix_timestamp(), "set time extra");
                extra.to_string()
            }
        };
        Ok(output)
    }
}
