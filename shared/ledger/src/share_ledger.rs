use std::collections::HashMap;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use subpool_core::Identity;

use crate::PoolError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub shares: u128,
}

/// `floor(a * b / denominator)` with a 256-bit intermediate product.
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> Result<u128, PoolError> {
    if denominator == 0 {
        return Err(PoolError::MathOverflow);
    }
    let result = U256::from(a) * U256::from(b) / U256::from(denominator);
    u128::try_from(result).map_err(|_| PoolError::MathOverflow)
}

/// A share issuance computed against the current totals but not yet applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mint<I> {
    pub participant: I,
    pub assets: u128,
    pub shares: u128,
    total_shares: u128,
    total_assets: u128,
    position_shares: u128,
}

/// A share redemption computed against the current totals but not yet applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Burn<I> {
    pub participant: I,
    pub shares: u128,
    pub assets: u128,
    total_shares: u128,
    total_assets: u128,
    position_shares: u128,
}

/// Per-pool share bookkeeping.
///
/// Mutation is split in two: `plan_*` validates and does all of the checked
/// arithmetic without touching anything, and `commit_*` writes the result and
/// cannot fail. The asset transfer happens in between, so a rejected transfer
/// leaves the ledger exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareLedger<I: Identity> {
    total_shares: u128,
    total_assets: u128,
    positions: HashMap<I, Position>,
}

impl<I: Identity> Default for ShareLedger<I> {
    fn default() -> Self {
        Self {
            total_shares: 0,
            total_assets: 0,
            positions: HashMap::new(),
        }
    }
}

impl<I: Identity> ShareLedger<I> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn total_assets(&self) -> u128 {
        self.total_assets
    }

    /// `None` until the participant's first deposit.
    pub fn position(&self, participant: &I) -> Option<Position> {
        self.positions.get(participant).copied()
    }

    pub fn shares_of(&self, participant: &I) -> u128 {
        self.position(participant)
            .map(|position| position.shares)
            .unwrap_or_default()
    }

    pub fn positions(&self) -> impl Iterator<Item = (&I, &Position)> {
        self.positions.iter()
    }

    pub fn check_conservation(&self) -> bool {
        self.positions
            .values()
            .try_fold(0u128, |sum, position| sum.checked_add(position.shares))
            == Some(self.total_shares)
    }

    pub fn plan_mint(&self, participant: I, assets: u128) -> Result<Mint<I>, PoolError> {
        if assets == 0 {
            return Err(PoolError::InvalidAmount(
                "deposit amount must be positive".to_string(),
            ));
        }
        let shares = if self.total_shares == 0 {
            // first deposit fixes the rate at one share per base unit
            assets
        } else {
            mul_div_floor(assets, self.total_shares, self.total_assets)?
        };
        if shares == 0 {
            return Err(PoolError::InvalidAmount(
                "deposit is too small to issue a single share".to_string(),
            ));
        }
        Ok(Mint {
            participant,
            assets,
            shares,
            total_shares: self
                .total_shares
                .checked_add(shares)
                .ok_or(PoolError::MathOverflow)?,
            total_assets: self
                .total_assets
                .checked_add(assets)
                .ok_or(PoolError::MathOverflow)?,
            position_shares: self
                .shares_of(&participant)
                .checked_add(shares)
                .ok_or(PoolError::MathOverflow)?,
        })
    }

    pub fn plan_burn(&self, participant: I, shares: u128) -> Result<Burn<I>, PoolError> {
        if shares == 0 {
            return Err(PoolError::InvalidAmount(
                "withdrawal share amount must be positive".to_string(),
            ));
        }
        let held = self.shares_of(&participant);
        if shares > held {
            return Err(PoolError::InsufficientShares {
                requested: shares,
                held,
            });
        }
        let assets = mul_div_floor(shares, self.total_assets, self.total_shares)?;
        Ok(Burn {
            participant,
            shares,
            assets,
            total_shares: self
                .total_shares
                .checked_sub(shares)
                .ok_or(PoolError::MathOverflow)?,
            total_assets: self
                .total_assets
                .checked_sub(assets)
                .ok_or(PoolError::MathOverflow)?,
            position_shares: held - shares,
        })
    }

    pub fn commit_mint(&mut self, mint: Mint<I>) {
        debug_assert_eq!(self.total_shares + mint.shares, mint.total_shares);
        self.total_shares = mint.total_shares;
        self.total_assets = mint.total_assets;
        self.positions.entry(mint.participant).or_default().shares = mint.position_shares;
    }

    pub fn commit_burn(&mut self, burn: Burn<I>) {
        debug_assert_eq!(self.total_shares - burn.shares, burn.total_shares);
        self.total_shares = burn.total_shares;
        self.total_assets = burn.total_assets;
        // zero-share positions stay on the books
        self.positions.entry(burn.participant).or_default().shares = burn.position_shares;
    }

    /// Rebuilds a ledger from persisted rows, refusing rows that break share
    /// conservation.
    pub fn from_parts(
        total_shares: u128,
        total_assets: u128,
        positions: impl IntoIterator<Item = (I, Position)>,
    ) -> Option<Self> {
        let ledger = Self {
            total_shares,
            total_assets,
            positions: positions.into_iter().collect(),
        };
        ledger.check_conservation().then_some(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subpool_core::ONE_UNIT;

    fn mint(ledger: &mut ShareLedger<u32>, who: u32, assets: u128) -> u128 {
        let plan = ledger.plan_mint(who, assets).unwrap();
        ledger.commit_mint(plan);
        plan.shares
    }

    fn burn(ledger: &mut ShareLedger<u32>, who: u32, shares: u128) -> u128 {
        let plan = ledger.plan_burn(who, shares).unwrap();
        ledger.commit_burn(plan);
        plan.assets
    }

    #[test]
    fn test_mul_div_floor_uses_wide_intermediate() {
        // 2000e18 * 3000e18 overflows u128 on its own
        let a = 2000 * ONE_UNIT;
        let b = 3000 * ONE_UNIT;
        assert_eq!(mul_div_floor(a, b, b).unwrap(), a);
        assert_eq!(mul_div_floor(7, 1, 2).unwrap(), 3);
        assert_eq!(mul_div_floor(1, 1, 0), Err(PoolError::MathOverflow));
        assert_eq!(
            mul_div_floor(u128::MAX, u128::MAX, 1),
            Err(PoolError::MathOverflow)
        );
    }

    #[test]
    fn test_first_deposit_is_one_to_one() {
        let mut ledger = ShareLedger::new();
        assert_eq!(mint(&mut ledger, 1, 2000 * ONE_UNIT), 2000 * ONE_UNIT);
        assert_eq!(ledger.total_shares(), 2000 * ONE_UNIT);
        assert_eq!(ledger.total_assets(), 2000 * ONE_UNIT);
    }

    #[test]
    fn test_proportional_issuance_floors() {
        let mut ledger = ShareLedger::from_parts(
            10,
            15,
            [(1u32, Position { shares: 10 })],
        )
        .unwrap();
        // floor(7 * 10 / 15) = 4
        assert_eq!(mint(&mut ledger, 2, 7), 4);
        assert_eq!(ledger.total_assets(), 22);
        assert_eq!(ledger.total_shares(), 14);
        assert!(ledger.check_conservation());
    }

    #[test]
    fn test_tiny_deposit_that_mints_nothing_is_rejected() {
        let ledger = ShareLedger::from_parts(1, 3, [(1u32, Position { shares: 1 })]).unwrap();
        assert!(matches!(
            ledger.plan_mint(2, 2),
            Err(PoolError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let mut ledger = ShareLedger::new();
        assert!(matches!(
            ledger.plan_mint(1, 0),
            Err(PoolError::InvalidAmount(_))
        ));
        mint(&mut ledger, 1, 5);
        assert!(matches!(
            ledger.plan_burn(1, 0),
            Err(PoolError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_over_withdrawal_rejected_without_mutation() {
        let mut ledger = ShareLedger::new();
        mint(&mut ledger, 1, 100);
        let before = ledger.clone();
        assert_eq!(
            ledger.plan_burn(1, 101),
            Err(PoolError::InsufficientShares {
                requested: 101,
                held: 100
            })
        );
        assert_eq!(
            ledger.plan_burn(2, 1),
            Err(PoolError::InsufficientShares {
                requested: 1,
                held: 0
            })
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_round_trip_never_gains() {
        let mut ledger = ShareLedger::from_parts(
            1_000,
            1_501,
            [(1u32, Position { shares: 1_000 })],
        )
        .unwrap();
        let shares = mint(&mut ledger, 2, 333);
        let back = burn(&mut ledger, 2, shares);
        assert!(back <= 333);
        // one floor on the way in, one on the way out
        assert!(333 - back <= 2, "lost {} units", 333 - back);
        assert!(ledger.check_conservation());
    }

    #[test]
    fn test_burning_everything_empties_the_pool() {
        let mut ledger = ShareLedger::new();
        mint(&mut ledger, 1, 2000);
        mint(&mut ledger, 2, 1000);
        burn(&mut ledger, 1, 2000);
        burn(&mut ledger, 2, 1000);
        assert_eq!(ledger.total_shares(), 0);
        assert_eq!(ledger.total_assets(), 0);
        // positions remain as zero rows
        assert_eq!(ledger.position(&1), Some(Position { shares: 0 }));
        assert_eq!(ledger.position(&3), None);
    }

    #[test]
    fn test_from_parts_checks_conservation() {
        assert!(ShareLedger::from_parts(5, 5, [(1u32, Position { shares: 4 })]).is_none());
    }
}
