use anyhow::{Context, Result};
use qrsign_core::ports::{ImageSource, RawImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Image file on disk as an image source
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
    name: String,
}

impl FileImageSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl ImageSource for FileImageSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn capture(&self) -> Result<Option<RawImage>> {
        if !self.path.is_file() {
            debug!("No image file at {}", self.path.display());
            return Ok(None);
        }

        let image = image::open(&self.path)
            .with_context(|| format!("Failed to load image: {}", self.path.display()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        info!("Loaded image {}x{} from {}", width, height, self.path.display());

        Ok(Some(RawImage::new(width as usize, height as usize, image.into_raw())))
    }
}
