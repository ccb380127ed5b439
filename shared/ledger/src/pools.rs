use std::sync::Arc;

use serde::{Deserialize, Serialize};
use subpool_core::{Clock, FixedString, Identity};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::{
    Asset, PoolError, PoolSchedule, PoolState, Position, Scheduler, ShareLedger,
};

pub type PoolId = u64;

pub const MAX_POOL_NAME_BYTES: usize = 64;
pub type PoolName = FixedString<MAX_POOL_NAME_BYTES>;

/// Per-instance settings fixed by [`SubPools::initialize`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolsConfig {
    /// Name or address of the asset held in custody.
    pub asset: String,
    /// Recorded only; no fee is ever charged.
    #[serde(default)]
    pub fee_enabled: bool,
}

#[derive(Clone, Debug)]
struct SubPool<I: Identity> {
    id: PoolId,
    creator: I,
    name: PoolName,
    created_at: u64,
    scheduler: Scheduler,
    ledger: ShareLedger<I>,
}

/// Read-only view of a pool as of the time it was taken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(bound = "I: Identity")]
pub struct PoolInfo<I> {
    pub id: PoolId,
    pub creator: I,
    pub name: String,
    pub schedule: PoolSchedule,
    pub state: PoolState,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub window_end: Option<u64>,
    pub gap_start: Option<u64>,
    pub closes_at: Option<u64>,
    pub total_shares: u128,
    pub total_assets: u128,
    pub participants: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "I: Identity")]
pub struct PositionRecord<I> {
    pub participant: I,
    pub shares: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "I: Identity")]
pub struct SubPoolRecord<I> {
    pub id: PoolId,
    pub creator: I,
    pub name: PoolName,
    pub created_at: u64,
    pub scheduler: Scheduler,
    pub total_shares: u128,
    pub total_assets: u128,
    pub positions: Vec<PositionRecord<I>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "I: Identity")]
pub struct LedgerSnapshot<I> {
    pub pools: Vec<SubPoolRecord<I>>,
}

/// All sub-pools of one instance, holding one asset in custody under the
/// `custody` identity.
///
/// Every mutating call on a pool holds that pool's mutex from the schedule
/// check through the asset transfer to the ledger commit, so two calls on the
/// same pool never interleave. Calls on different pools only share the read
/// side of the registry lock and proceed concurrently.
pub struct SubPools<I: Identity, A, C> {
    custody: I,
    config: PoolsConfig,
    asset: A,
    clock: C,
    pools: RwLock<Vec<Arc<Mutex<SubPool<I>>>>>,
}

impl<I, A, C> SubPools<I, A, C>
where
    I: Identity,
    A: Asset<I>,
    C: Clock,
{
    pub fn initialize(custody: I, asset: A, config: PoolsConfig, clock: C) -> Self {
        info!(
            custody = %custody,
            asset = %config.asset,
            fee_enabled = config.fee_enabled,
            "initialized sub-pools"
        );
        Self {
            custody,
            config,
            asset,
            clock,
            pools: RwLock::new(Vec::new()),
        }
    }

    pub fn restore(
        custody: I,
        asset: A,
        config: PoolsConfig,
        clock: C,
        snapshot: LedgerSnapshot<I>,
    ) -> Result<Self, PoolError> {
        let mut pools = Vec::with_capacity(snapshot.pools.len());
        for (index, record) in snapshot.pools.into_iter().enumerate() {
            if record.id != index as PoolId {
                return Err(PoolError::InvalidParameters(format!(
                    "pool record {} found at position {}",
                    record.id, index
                )));
            }
            record.scheduler.check_restored(record.id)?;
            let ledger = ShareLedger::from_parts(
                record.total_shares,
                record.total_assets,
                record.positions.into_iter().map(|position| {
                    (
                        position.participant,
                        Position {
                            shares: position.shares,
                        },
                    )
                }),
            )
            .ok_or_else(|| {
                PoolError::InvalidParameters(format!(
                    "pool {} positions do not add up to its total shares",
                    record.id
                ))
            })?;
            pools.push(Arc::new(Mutex::new(SubPool {
                id: record.id,
                creator: record.creator,
                name: record.name,
                created_at: record.created_at,
                scheduler: record.scheduler,
                ledger,
            })));
        }
        Ok(Self {
            custody,
            config,
            asset,
            clock,
            pools: RwLock::new(pools),
        })
    }

    pub fn custody(&self) -> &I {
        &self.custody
    }

    pub fn config(&self) -> &PoolsConfig {
        &self.config
    }

    pub fn fee_enabled(&self) -> bool {
        self.config.fee_enabled
    }

    pub fn asset(&self) -> &A {
        &self.asset
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub async fn pool_count(&self) -> u64 {
        self.pools.read().await.len() as u64
    }

    pub async fn create_pool(
        &self,
        creator: &I,
        schedule: PoolSchedule,
        name: &str,
    ) -> Result<PoolId, PoolError> {
        let result = self.create_pool_inner(creator, schedule, name).await;
        if let Err(err) = &result {
            warn!(creator = %creator, kind = %err.kind(), "create_pool rejected: {err}");
        }
        result
    }

    async fn create_pool_inner(
        &self,
        creator: &I,
        schedule: PoolSchedule,
        name: &str,
    ) -> Result<PoolId, PoolError> {
        schedule.check()?;
        let name = PoolName::try_from(name)
            .map_err(|err| PoolError::InvalidParameters(format!("pool name: {err}")))?;

        let mut pools = self.pools.write().await;
        let id = pools.len() as PoolId;
        let mut scheduler = Scheduler::new(schedule);
        scheduler.open_funding();
        pools.push(Arc::new(Mutex::new(SubPool {
            id,
            creator: *creator,
            name,
            created_at: self.clock.unix_timestamp(),
            scheduler,
            ledger: ShareLedger::new(),
        })));

        info!(
            pool = id,
            creator = %creator,
            name = %name,
            duration_days = schedule.duration_days,
            window_days = schedule.window_days,
            gap_days = schedule.gap_days,
            "created pool"
        );
        Ok(id)
    }

    pub async fn start_pool(&self, caller: &I, pool: PoolId) -> Result<(), PoolError> {
        let result = self.start_pool_inner(caller, pool).await;
        if let Err(err) = &result {
            warn!(pool, caller = %caller, kind = %err.kind(), "start_pool rejected: {err}");
        }
        result
    }

    async fn start_pool_inner(&self, caller: &I, pool: PoolId) -> Result<(), PoolError> {
        let handle = self.pool_handle(pool).await?;
        let mut sub_pool = handle.lock().await;
        if sub_pool.creator != *caller {
            return Err(PoolError::NotCreator(pool));
        }
        let now = self.clock.unix_timestamp();
        sub_pool.scheduler.start(pool, now)?;
        info!(pool, started_at = now, "started pool");
        Ok(())
    }

    /// Pulls `amount` base units from `participant` and returns the shares
    /// issued for them.
    pub async fn deposit(
        &self,
        participant: &I,
        pool: PoolId,
        amount: u128,
    ) -> Result<u128, PoolError> {
        let result = self.deposit_inner(participant, pool, amount).await;
        if let Err(err) = &result {
            warn!(pool, participant = %participant, amount, kind = %err.kind(), "deposit rejected: {err}");
        }
        result
    }

    async fn deposit_inner(
        &self,
        participant: &I,
        pool: PoolId,
        amount: u128,
    ) -> Result<u128, PoolError> {
        let handle = self.pool_handle(pool).await?;
        self.check_not_custody(participant)?;
        let mut sub_pool = handle.lock().await;
        sub_pool
            .scheduler
            .check_deposit(pool, self.clock.unix_timestamp())?;
        let mint = sub_pool.ledger.plan_mint(*participant, amount)?;
        self.asset
            .transfer_from(&self.custody, participant, &self.custody, amount)
            .await?;
        sub_pool.ledger.commit_mint(mint);
        info!(
            pool,
            participant = %participant,
            amount,
            shares = mint.shares,
            total_shares = sub_pool.ledger.total_shares(),
            total_assets = sub_pool.ledger.total_assets(),
            "deposit"
        );
        Ok(mint.shares)
    }

    /// Redeems `shares` of `participant` and returns the base units paid out.
    pub async fn withdraw(
        &self,
        participant: &I,
        pool: PoolId,
        shares: u128,
    ) -> Result<u128, PoolError> {
        let result = self.withdraw_inner(participant, pool, shares).await;
        if let Err(err) = &result {
            warn!(pool, participant = %participant, shares, kind = %err.kind(), "withdraw rejected: {err}");
        }
        result
    }

    async fn withdraw_inner(
        &self,
        participant: &I,
        pool: PoolId,
        shares: u128,
    ) -> Result<u128, PoolError> {
        let handle = self.pool_handle(pool).await?;
        self.check_not_custody(participant)?;
        let mut sub_pool = handle.lock().await;
        sub_pool
            .scheduler
            .check_withdraw(pool, self.clock.unix_timestamp())?;
        let burn = sub_pool.ledger.plan_burn(*participant, shares)?;
        self.asset
            .transfer(&self.custody, participant, burn.assets)
            .await?;
        sub_pool.ledger.commit_burn(burn);
        info!(
            pool,
            participant = %participant,
            shares,
            amount = burn.assets,
            total_shares = sub_pool.ledger.total_shares(),
            total_assets = sub_pool.ledger.total_assets(),
            "withdraw"
        );
        Ok(burn.assets)
    }

    /// A participant that never deposited holds zero shares.
    pub async fn query_position(&self, pool: PoolId, participant: &I) -> Result<Position, PoolError> {
        let handle = self.pool_handle(pool).await?;
        let sub_pool = handle.lock().await;
        Ok(sub_pool.ledger.position(participant).unwrap_or_default())
    }

    pub async fn pool_info(&self, pool: PoolId) -> Result<PoolInfo<I>, PoolError> {
        let handle = self.pool_handle(pool).await?;
        let sub_pool = handle.lock().await;
        Ok(Self::info_of(&sub_pool, self.clock.unix_timestamp()))
    }

    pub async fn pools(&self) -> Vec<PoolInfo<I>> {
        let handles = self.pools.read().await.clone();
        let now = self.clock.unix_timestamp();
        let mut infos = Vec::with_capacity(handles.len());
        for handle in handles {
            infos.push(Self::info_of(&*handle.lock().await, now));
        }
        infos
    }

    pub async fn snapshot(&self) -> LedgerSnapshot<I> {
        let handles = self.pools.read().await.clone();
        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            let sub_pool = handle.lock().await;
            records.push(SubPoolRecord {
                id: sub_pool.id,
                creator: sub_pool.creator,
                name: sub_pool.name,
                created_at: sub_pool.created_at,
                scheduler: sub_pool.scheduler,
                total_shares: sub_pool.ledger.total_shares(),
                total_assets: sub_pool.ledger.total_assets(),
                positions: sub_pool
                    .ledger
                    .positions()
                    .map(|(participant, position)| PositionRecord {
                        participant: *participant,
                        shares: position.shares,
                    })
                    .collect(),
            });
        }
        LedgerSnapshot { pools: records }
    }

    /// Custody moving assets to itself is a no-op on the asset side, so it
    /// can't take part in a pool.
    fn check_not_custody(&self, participant: &I) -> Result<(), PoolError> {
        if *participant == self.custody {
            return Err(PoolError::InvalidParameters(format!(
                "custody account {participant} can't hold a position"
            )));
        }
        Ok(())
    }

        async fn pool_handle(&self, pool: PoolId) -> Result<Arc<Mutex<SubPool<I>>>, PoolError> {
        let pools = self.pools.read().await;
        usize::try_from(pool)
            .ok()
            .and_then(|index| pools.get(index))
            .cloned()
            .ok_or(PoolError::UnknownPool(pool))
    }

    fn info_of(sub_pool: &SubPool<I>, now: u64) -> PoolInfo<I> {
        PoolInfo {
            id: sub_pool.id,
            creator: sub_pool.creator,
            name: sub_pool.name.to_string(),
            schedule: sub_pool.scheduler.schedule,
            state: sub_pool.scheduler.observed_state(now),
            created_at: sub_pool.created_at,
            started_at: sub_pool.scheduler.started_at,
            window_end: sub_pool.scheduler.window_end(),
            gap_start: sub_pool.scheduler.gap_start(),
            closes_at: sub_pool.scheduler.closes_at(),
            total_shares: sub_pool.ledger.total_shares(),
            total_assets: sub_pool.ledger.total_assets(),
            participants: sub_pool.ledger.positions().count(),
        }
    }
}
