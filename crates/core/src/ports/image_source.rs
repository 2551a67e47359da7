use super::codec::RawImage;
use anyhow::Result;

/// Port for anything that can hand over a captured bitmap
pub trait ImageSource: Send + Sync {
    /// Human-readable name used in status messages
    fn name(&self) -> &str;

    /// `Ok(None)` when the source currently holds no image
    /// This is blocking - caller should run in spawn_blocking
    fn capture(&self) -> Result<Option<RawImage>>;
}
