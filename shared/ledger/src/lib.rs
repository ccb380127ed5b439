mod asset;
mod error;
mod pools;
mod scheduler;
mod share_ledger;

pub use asset::{Allowance, Asset, AssetError, AssetSnapshot, Balance, InMemoryAsset};
pub use error::{PoolError, PoolErrorKind};
pub use pools::{
    LedgerSnapshot, PoolId, PoolInfo, PoolName, PoolsConfig, PositionRecord, SubPoolRecord,
    SubPools, MAX_POOL_NAME_BYTES,
};
pub use scheduler::{PoolSchedule, PoolState, Scheduler};
pub use share_ledger::{mul_div_floor, Burn, Mint, Position, ShareLedger};
