use super::time::FixedOffsetClock;
use crate::domain::payload::{Identifiers, PayloadLayout};
use crate::domain::slot::SlotInterval;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration store interface
pub trait ConfigStore: Send + Sync {
    /// Load configuration, falling back to defaults when nothing is stored
    fn load(&self) -> Result<AppConfig>;
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub payload: PayloadConfig,
    pub timing: TimingConfig,
    pub qr: QrConfig,
    pub log_file: Option<PathBuf>,
}

/// Shape of generated payloads and any preset identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadConfig {
    #[serde(flatten)]
    pub layout: PayloadLayout,
    #[serde(flatten)]
    pub identifiers: Identifiers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub interval_secs: u64,
    pub poll_interval_ms: u64,
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    pub error_correction: ErrorCorrection,
}

/// QR error-correction level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCorrection {
    #[default]
    L,
    M,
    Q,
    H,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            payload: PayloadConfig::default(),
            timing: TimingConfig::default(),
            qr: QrConfig::default(),
            log_file: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            poll_interval_ms: 100,
            utc_offset_minutes: FixedOffsetClock::DEFAULT_OFFSET_MINUTES,
        }
    }
}

impl AppConfig {
    /// Reject values the rotation loop cannot work with
    pub fn validate(&self) -> Result<()> {
        ensure!(self.timing.interval_secs >= 1, "timing.interval_secs must be at least 1");
        ensure!(self.timing.poll_interval_ms >= 1, "timing.poll_interval_ms must be at least 1");
        ensure!(self.payload.layout.id_length >= 1, "payload.id_length must be at least 1");
        ensure!(
            self.payload.layout.class_lesson_id_length >= 1,
            "payload.class_lesson_id_length must be at least 1"
        );
        ensure!(
            self.timing.utc_offset_minutes.abs() < 24 * 60,
            "timing.utc_offset_minutes must be within +/-24h, got {}",
            self.timing.utc_offset_minutes
        );
        Ok(())
    }

    pub fn interval(&self) -> Result<SlotInterval> {
        Ok(SlotInterval::from_secs(self.timing.interval_secs)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.timing.poll_interval_ms.max(1))
    }

    pub fn clock(&self) -> Result<FixedOffsetClock> {
        FixedOffsetClock::from_minutes(self.timing.utc_offset_minutes).ok_or_else(|| {
            anyhow::anyhow!("invalid UTC offset: {} minutes", self.timing.utc_offset_minutes)
        })
    }
}
