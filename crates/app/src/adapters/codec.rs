use anyhow::{Context, Result};
use qrcode::{Color, EcLevel, QrCode};
use qrsign_core::ports::{ErrorCorrection, QrCodec, QrMatrix, RawImage};
use tracing::debug;

/// QR codec backed by `qrcode` for encoding and `rqrr` for decoding
#[derive(Debug, Clone, Copy, Default)]
pub struct QrcodeCodec {
    level: ErrorCorrection,
}

impl QrcodeCodec {
    pub fn new(level: ErrorCorrection) -> Self {
        Self { level }
    }

    fn ec_level(&self) -> EcLevel {
        match self.level {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

impl QrCodec for QrcodeCodec {
    fn encode(&self, text: &str) -> Result<QrMatrix> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), self.ec_level())
            .with_context(|| format!("Failed to encode {} bytes as QR", text.len()))?;

        let modules = code
            .to_colors()
            .into_iter()
            .map(|color| color == Color::Dark)
            .collect();
        Ok(QrMatrix::new(code.width(), modules))
    }

    fn decode(&self, image: &RawImage) -> Option<String> {
        if image.is_empty() {
            return None;
        }

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(image.width, image.height, |x, y| image.luma(x, y));
        let grids = prepared.detect_grids();
        debug!("Found {} QR grid candidates in {}x{} image", grids.len(), image.width, image.height);

        grids.iter().find_map(|grid| match grid.decode() {
            Ok((_, content)) => Some(content),
            Err(e) => {
                debug!("Grid decode failed: {}", e);
                None
            }
        })
    }
}

/// Draw a module grid as black-on-white RGBA, `scale` pixels per module with
/// a `border`-module quiet zone
pub fn rasterize(matrix: &QrMatrix, scale: usize, border: usize) -> RawImage {
    let scale = scale.max(1);
    let modules = matrix.width() + 2 * border;
    let side = modules * scale;

    let mut rgba = Vec::with_capacity(side * side * 4);
    for py in 0..side {
        for px in 0..side {
            let mx = (px / scale).checked_sub(border);
            let my = (py / scale).checked_sub(border);
            let dark = matches!((mx, my), (Some(x), Some(y)) if matrix.is_dark(x, y));
            let level = if dark { 0 } else { u8::MAX };
            rgba.extend_from_slice(&[level, level, level, u8::MAX]);
        }
    }

    RawImage::new(side, side, rgba)
}
