use serde::{Deserialize, Serialize};
use subpool_core::SECONDS_PER_DAY;
use tracing::debug;

use crate::{PoolError, PoolId};

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolState {
    #[default]
    Created = 0,
    Funding = 1,
    Active = 2,
    Closed = 3,
}

impl std::fmt::Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolState::Created => write!(f, "Created"),
            PoolState::Funding => write!(f, "Funding"),
            PoolState::Active => write!(f, "Active"),
            PoolState::Closed => write!(f, "Closed"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSchedule {
    pub duration_days: u32,
    pub window_days: u32,
    pub gap_days: u32,
}

impl PoolSchedule {
    pub fn new(duration_days: u32, window_days: u32, gap_days: u32) -> Self {
        Self {
            duration_days,
            window_days,
            gap_days,
        }
    }

    /// A window that runs into the gap leaves no operating period at all.
    pub fn check(&self) -> Result<(), PoolError> {
        if self.duration_days == 0 {
            return Err(PoolError::InvalidParameters(
                "duration_days must be positive".to_string(),
            ));
        }
        if self.window_days == 0 {
            return Err(PoolError::InvalidParameters(
                "window_days must be positive".to_string(),
            ));
        }
        if self.gap_days >= self.duration_days {
            return Err(PoolError::InvalidParameters(format!(
                "gap_days ({}) must be less than duration_days ({})",
                self.gap_days, self.duration_days
            )));
        }
        if self.window_days > self.duration_days - self.gap_days {
            return Err(PoolError::InvalidParameters(format!(
                "window_days ({}) overruns the gap, at most {} allowed",
                self.window_days,
                self.duration_days - self.gap_days
            )));
        }
        Ok(())
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_days as u64 * SECONDS_PER_DAY
    }

    /// Seconds after start at which withdrawals stop.
    pub fn gap_start_seconds(&self) -> u64 {
        (self.duration_days - self.gap_days) as u64 * SECONDS_PER_DAY
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_days as u64 * SECONDS_PER_DAY
    }
}

/// Time-window state machine of one sub-pool. Nothing here runs on a timer:
/// every check is evaluated against the `now` handed in by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    pub schedule: PoolSchedule,
    pub state: PoolState,
    pub started_at: Option<u64>,
}

impl Scheduler {
    pub fn new(schedule: PoolSchedule) -> Self {
        Self {
            schedule,
            state: PoolState::Created,
            started_at: None,
        }
    }

    pub fn open_funding(&mut self) {
        if self.state == PoolState::Created {
            self.state = PoolState::Funding;
        }
    }

    pub fn start(&mut self, pool: PoolId, unix_timestamp: u64) -> Result<(), PoolError> {
        if self.started_at.is_some() || !matches!(self.state, PoolState::Created | PoolState::Funding)
        {
            return Err(PoolError::AlreadyStarted(pool));
        }
        self.started_at = Some(unix_timestamp);
        self.state = PoolState::Active;
        Ok(())
    }

    /// Rejects a persisted scheduler whose state and start time disagree.
    pub fn check_restored(&self, pool: PoolId) -> Result<(), PoolError> {
        self.schedule.check()?;
        match (self.state, self.started_at) {
            (PoolState::Funding, None) | (PoolState::Active, Some(_)) => Ok(()),
            (state, started_at) => Err(PoolError::InvalidParameters(format!(
                "pool {pool} is {state} with started_at {started_at:?}"
            ))),
        }
    }

    pub fn started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Seconds since start, 0 while unstarted.
    pub fn elapsed(&self, unix_timestamp: u64) -> u64 {
        self.started_at
            .map(|started_at| unix_timestamp.saturating_sub(started_at))
            .unwrap_or(0)
    }

    /// Stored state with the lazy `Active -> Closed` transition applied.
    pub fn observed_state(&self, unix_timestamp: u64) -> PoolState {
        match self.state {
            PoolState::Active
                if self.elapsed(unix_timestamp) >= self.schedule.duration_seconds() =>
            {
                PoolState::Closed
            }
            state => state,
        }
    }

    pub fn check_deposit(&self, pool: PoolId, unix_timestamp: u64) -> Result<(), PoolError> {
        let elapsed = self.elapsed(unix_timestamp);
        debug!(pool, elapsed, state = %self.state, "checking deposit window");
        match self.observed_state(unix_timestamp) {
            PoolState::Funding | PoolState::Active
                if elapsed < self.schedule.window_seconds() =>
            {
                Ok(())
            }
            _ => Err(PoolError::WindowClosed(pool)),
        }
    }

    pub fn check_withdraw(&self, pool: PoolId, unix_timestamp: u64) -> Result<(), PoolError> {
        if !self.started() {
            return Err(PoolError::BeforeActivation(pool));
        }
        let elapsed = self.elapsed(unix_timestamp);
        debug!(pool, elapsed, state = %self.state, "checking withdrawal period");
        if elapsed >= self.schedule.gap_start_seconds() {
            // also covers a closed pool, whose elapsed time is past the gap start
            return Err(PoolError::InGapPeriod(pool));
        }
        Ok(())
    }

    pub fn window_end(&self) -> Option<u64> {
        self.started_at
            .map(|started_at| started_at.saturating_add(self.schedule.window_seconds()))
    }

    pub fn gap_start(&self) -> Option<u64> {
        self.started_at
            .map(|started_at| started_at.saturating_add(self.schedule.gap_start_seconds()))
    }

    pub fn closes_at(&self) -> Option<u64> {
        self.started_at
            .map(|started_at| started_at.saturating_add(self.schedule.duration_seconds()))
    }
}
