use anyhow::Result;

/// An RGBA bitmap, 4 bytes per pixel, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl RawImage {
    pub fn new(width: usize, height: usize, rgba: Vec<u8>) -> Self {
        Self { width, height, rgba }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.rgba.len() < self.width * self.height * 4
    }

    /// Grey level of a pixel, transparent pixels composited onto white
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        let offset = (y * self.width + x) * 4;
        let Some([r, g, b, a]) = self.rgba.get(offset..offset + 4) else {
            return u8::MAX;
        };
        let grey = (u32::from(*r) * 299 + u32::from(*g) * 587 + u32::from(*b) * 114) / 1000;
        let alpha = u32::from(*a);
        let composited = (grey * alpha + 255 * (255 - alpha)) / 255;
        u8::try_from(composited).unwrap_or(u8::MAX)
    }
}

/// Module grid of an encoded QR code, without quiet zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    width: usize,
    modules: Vec<bool>,
}

impl QrMatrix {
    /// `modules` is row-major, `true` for dark
    pub fn new(width: usize, modules: Vec<bool>) -> Self {
        Self { width, modules }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Out-of-range coordinates read as light, so callers can draw a quiet zone
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && self.modules.get(y * self.width + x).copied().unwrap_or(false)
    }
}

/// Port for QR pixel encoding and decoding
pub trait QrCodec: Send + Sync {
    /// Encode text into a module grid
    fn encode(&self, text: &str) -> Result<QrMatrix>;

    /// Text of the first QR code found in the image, if any
    fn decode(&self, image: &RawImage) -> Option<String>;
}
