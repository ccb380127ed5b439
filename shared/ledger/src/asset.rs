use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use subpool_core::Identity;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },
    #[error("insufficient allowance: needed {needed}, approved {approved}")]
    InsufficientAllowance { needed: u128, approved: u128 },
    #[error("balance overflow")]
    Overflow,
}

/// The fungible asset a set of pools holds in custody. Either call moves the
/// full amount or fails without moving anything.
#[async_trait]
pub trait Asset<I: Identity>: Send + Sync {
    /// Moves `amount` from `holder` to `to`, spending the allowance `holder`
    /// granted to `spender`.
    async fn transfer_from(
        &self,
        spender: &I,
        holder: &I,
        to: &I,
        amount: u128,
    ) -> Result<(), AssetError>;

    async fn transfer(&self, from: &I, to: &I, amount: u128) -> Result<(), AssetError>;

    async fn balance_of(&self, holder: &I) -> u128;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "I: Identity")]
pub struct Balance<I> {
    pub holder: I,
    pub amount: u128,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "I: Identity")]
pub struct Allowance<I> {
    pub owner: I,
    pub spender: I,
    pub amount: u128,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "I: Identity")]
pub struct AssetSnapshot<I> {
    pub balances: Vec<Balance<I>>,
    pub allowances: Vec<Allowance<I>>,
}

struct Book<I> {
    balances: HashMap<I, u128>,
    allowances: HashMap<(I, I), u128>,
}

impl<I: Identity> Book<I> {
    fn debit_and_credit(&mut self, from: &I, to: &I, amount: u128) -> Result<(), AssetError> {
        let available = self.balances.get(from).copied().unwrap_or_default();
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balances
            .get(to)
            .copied()
            .unwrap_or_default()
            .checked_add(amount)
            .ok_or(AssetError::Overflow)?;
        self.balances.insert(*from, available - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

/// Ledger-backed token with ERC20 allowance rules, used by the centralized
/// deployment and by tests. An allowance of `u128::MAX` is never decremented.
pub struct InMemoryAsset<I> {
    book: Mutex<Book<I>>,
}

impl<I: Identity> Default for InMemoryAsset<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Identity> InMemoryAsset<I> {
    pub fn new() -> Self {
        Self {
            book: Mutex::new(Book {
                balances: HashMap::new(),
                allowances: HashMap::new(),
            }),
        }
    }

    pub fn from_snapshot(snapshot: AssetSnapshot<I>) -> Self {
        Self {
            book: Mutex::new(Book {
                balances: snapshot
                    .balances
                    .into_iter()
                    .map(|balance| (balance.holder, balance.amount))
                    .collect(),
                allowances: snapshot
                    .allowances
                    .into_iter()
                    .map(|allowance| ((allowance.owner, allowance.spender), allowance.amount))
                    .collect(),
            }),
        }
    }

    pub async fn snapshot(&self) -> AssetSnapshot<I> {
        let book = self.book.lock().await;
        AssetSnapshot {
            balances: book
                .balances
                .iter()
                .map(|(holder, amount)| Balance {
                    holder: *holder,
                    amount: *amount,
                })
                .collect(),
            allowances: book
                .allowances
                .iter()
                .map(|((owner, spender), amount)| Allowance {
                    owner: *owner,
                    spender: *spender,
                    amount: *amount,
                })
                .collect(),
        }
    }

    pub async fn mint(&self, to: &I, amount: u128) -> Result<(), AssetError> {
        let mut book = self.book.lock().await;
        let balance = book.balances.entry(*to).or_default();
        *balance = balance.checked_add(amount).ok_or(AssetError::Overflow)?;
        Ok(())
    }

    pub async fn approve(&self, owner: &I, spender: &I, amount: u128) {
        self.book
            .lock()
            .await
            .allowances
            .insert((*owner, *spender), amount);
    }

    pub async fn allowance(&self, owner: &I, spender: &I) -> u128 {
        self.book
            .lock()
            .await
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl<I: Identity> Asset<I> for InMemoryAsset<I> {
    async fn transfer_from(
        &self,
        spender: &I,
        holder: &I,
        to: &I,
        amount: u128,
    ) -> Result<(), AssetError> {
        let mut book = self.book.lock().await;
        let approved = book
            .allowances
            .get(&(*holder, *spender))
            .copied()
            .unwrap_or_default();
        if approved < amount {
            return Err(AssetError::InsufficientAllowance {
                needed: amount,
                approved,
            });
        }
        book.debit_and_credit(holder, to, amount)?;
        if approved != u128::MAX {
            book.allowances.insert((*holder, *spender), approved - amount);
        }
        Ok(())
    }

    async fn transfer(&self, from: &I, to: &I, amount: u128) -> Result<(), AssetError> {
        self.book.lock().await.debit_and_credit(from, to, amount)
    }

    async fn balance_of(&self, holder: &I) -> u128 {
        self.book
            .lock()
            .await
            .balances
            .get(holder)
            .copied()
            .unwrap_or_default()
    }
}
