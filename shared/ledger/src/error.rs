use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::AssetError;
use crate::PoolId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("invalid pool parameters: {0}")]
    InvalidParameters(String),
    #[error("only the creator of pool {0} may start it")]
    NotCreator(PoolId),
    #[error("pool {0} was already started")]
    AlreadyStarted(PoolId),
    #[error("pool {0} has not been started yet, withdrawals open at start")]
    BeforeActivation(PoolId),
    #[error("pool {0} deposit window is closed")]
    WindowClosed(PoolId),
    #[error("pool {0} is in its gap period, withdrawals are closed")]
    InGapPeriod(PoolId),
    #[error("insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: u128, held: u128 },
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("no pool with id {0}")]
    UnknownPool(PoolId),
    #[error("arithmetic overflow")]
    MathOverflow,
    #[error("asset transfer rejected: {0}")]
    Asset(#[from] AssetError),
}

/// Stable, machine-readable tag for a [`PoolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolErrorKind {
    InvalidParameters,
    NotCreator,
    AlreadyStarted,
    BeforeActivation,
    WindowClosed,
    InGapPeriod,
    InsufficientShares,
    InvalidAmount,
    UnknownPool,
    MathOverflow,
    Asset,
}

impl PoolError {
    pub fn kind(&self) -> PoolErrorKind {
        match self {
            PoolError::InvalidParameters(_) => PoolErrorKind::InvalidParameters,
            PoolError::NotCreator(_) => PoolErrorKind::NotCreator,
            PoolError::AlreadyStarted(_) => PoolErrorKind::AlreadyStarted,
            PoolError::BeforeActivation(_) => PoolErrorKind::BeforeActivation,
            PoolError::WindowClosed(_) => PoolErrorKind::WindowClosed,
            PoolError::InGapPeriod(_) => PoolErrorKind::InGapPeriod,
            PoolError::InsufficientShares { .. } => PoolErrorKind::InsufficientShares,
            PoolError::InvalidAmount(_) => PoolErrorKind::InvalidAmount,
            PoolError::UnknownPool(_) => PoolErrorKind::UnknownPool,
            PoolError::MathOverflow => PoolErrorKind::MathOverflow,
            PoolError::Asset(_) => PoolErrorKind::Asset,
        }
    }
}

impl std::fmt::Display for PoolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
