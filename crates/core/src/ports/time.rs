use chrono::{FixedOffset, NaiveDateTime, Offset, TimeDelta, Utc};
use std::sync::Mutex;

/// Clock abstraction for testability
pub trait Clock: Send + Sync {
    /// Current wall-clock time, zone-less
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock pinned to a fixed UTC offset, independent of the host time zone
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetClock {
    offset: FixedOffset,
}

impl FixedOffsetClock {
    /// UTC+8
    pub const DEFAULT_OFFSET_MINUTES: i32 = 8 * 60;

    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// `None` when the offset is a day or more away from UTC
    pub fn from_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for FixedOffsetClock {
    fn default() -> Self {
        Self::from_minutes(Self::DEFAULT_OFFSET_MINUTES).unwrap_or_else(|| Self::new(Utc.fix()))
    }
}

impl Clock for FixedOffsetClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }
}

/// Manually driven clock for tests
#[derive(Debug)]
pub struct MockClock {
    current: Mutex<NaiveDateTime>,
}

impl MockClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, time: NaiveDateTime) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = time;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }
}

impl Clock for MockClock {
    fn now(&self) -> NaiveDateTime {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
