use anyhow::{Context, Result};
use arboard::Clipboard;
use qrsign_core::ports::{ImageSource, RawImage};
use tracing::{debug, info};

/// System clipboard as an image source
#[derive(Debug, Default)]
pub struct ClipboardSource;

impl ClipboardSource {
    pub fn new() -> Self {
        Self
    }
}

impl ImageSource for ClipboardSource {
    fn name(&self) -> &str {
        "clipboard"
    }

    fn capture(&self) -> Result<Option<RawImage>> {
        let mut clipboard = Clipboard::new().context("Failed to access clipboard")?;

        match clipboard.get_image() {
            Ok(image) => {
                info!("Clipboard image: {}x{}, {} bytes", image.width, image.height, image.bytes.len());
                Ok(Some(RawImage::new(image.width, image.height, image.bytes.into_owned())))
            }
            Err(arboard::Error::ContentNotAvailable) => {
                debug!("Clipboard holds no image");
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to read clipboard image"),
        }
    }
}
