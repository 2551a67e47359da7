use crate::error::{CoreError, Result};
use chrono::{NaiveDateTime, TimeDelta};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Spacing of the slot grid. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotInterval(TimeDelta);

impl SlotInterval {
    pub fn new(interval: TimeDelta) -> Result<Self> {
        if interval <= TimeDelta::zero() {
            return Err(CoreError::InvalidInterval);
        }
        Ok(Self(interval))
    }

    pub fn from_secs(secs: u64) -> Result<Self> {
        let secs = i64::try_from(secs).map_err(|_| CoreError::InvalidInterval)?;
        TimeDelta::try_seconds(secs)
            .ok_or(CoreError::InvalidInterval)
            .and_then(Self::new)
    }

    pub fn as_delta(&self) -> TimeDelta {
        self.0
    }

    fn as_nanos(&self) -> i128 {
        total_nanos(self.0)
    }
}

impl Default for SlotInterval {
    fn default() -> Self {
        Self(TimeDelta::seconds(5))
    }
}

/// Where `now` falls on the grid `epoch + k * interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Latest grid point not after `now`
    pub current: NaiveDateTime,
    /// `current + interval`
    pub next: NaiveDateTime,
    /// Whole seconds left until `next`, plus one. Reads `interval + 1` exactly
    /// on a boundary and 1 just before the rollover.
    pub seconds_to_next: u64,
}

/// Map `now` onto the slot grid anchored at `epoch`.
///
/// `now` may precede `epoch`; the grid extends backwards and the slot is then
/// earlier than the epoch.
pub fn compute_slot(epoch: NaiveDateTime, now: NaiveDateTime, interval: SlotInterval) -> Slot {
    let step = interval.as_nanos();
    let elapsed = total_nanos(now - epoch);

    // Floor semantics for negative elapsed: into_slot is always in [0, step)
    let into_slot = elapsed.rem_euclid(step);
    let remaining = step - into_slot;

    let current = now
        .checked_sub_signed(from_nanos(into_slot))
        .unwrap_or(NaiveDateTime::MIN);
    let next = current
        .checked_add_signed(interval.as_delta())
        .unwrap_or(NaiveDateTime::MAX);

    let seconds_to_next = u64::try_from(remaining / NANOS_PER_SEC).unwrap_or(u64::MAX).saturating_add(1);

    Slot {
        current,
        next,
        seconds_to_next,
    }
}

/// Epoch and interval of one session's slot grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindowClock {
    epoch: NaiveDateTime,
    interval: SlotInterval,
}

impl TimeWindowClock {
    pub fn new(epoch: NaiveDateTime, interval: SlotInterval) -> Self {
        Self { epoch, interval }
    }

    pub fn epoch(&self) -> NaiveDateTime {
        self.epoch
    }

    pub fn interval(&self) -> SlotInterval {
        self.interval
    }

    pub fn slot_at(&self, now: NaiveDateTime) -> Slot {
        compute_slot(self.epoch, now, self.interval)
    }
}

fn total_nanos(delta: TimeDelta) -> i128 {
    i128::from(delta.num_seconds()) * NANOS_PER_SEC + i128::from(delta.subsec_nanos())
}

fn from_nanos(nanos: i128) -> TimeDelta {
    // Only called with values below one interval, which fit an i64
    let secs = i64::try_from(nanos / NANOS_PER_SEC).unwrap_or(i64::MAX);
    let subsec = i64::try_from(nanos % NANOS_PER_SEC).unwrap_or(0);
    TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX) + TimeDelta::nanoseconds(subsec)
}
