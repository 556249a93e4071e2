//! PNG through the `image` crate

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use mixtype_core::{BitmapData, Exporter, OutputFormat, RasterizationError};

use crate::check_len;

/// Lossless RGBA PNG
#[derive(Debug, Default, Clone, Copy)]
pub struct PngExporter {
    compression: CompressionLevel,
}

/// How hard the encoder works
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    Fast,
    #[default]
    Default,
    Best,
}

impl PngExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(compression: CompressionLevel) -> Self {
        Self { compression }
    }
}

impl Exporter for PngExporter {
    fn name(&self) -> &'static str {
        "png"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn export(&self, bitmap: &BitmapData) -> Result<Vec<u8>, RasterizationError> {
        check_len(bitmap)?;
        let compression = match self.compression {
            CompressionLevel::Fast => CompressionType::Fast,
            CompressionLevel::Default => CompressionType::Default,
            CompressionLevel::Best => CompressionType::Best,
        };
        let mut out = Vec::new();
        PngEncoder::new_with_quality(&mut out, compression, FilterType::Sub)
            .write_image(
                &bitmap.data,
                bitmap.width,
                bitmap.height,
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| RasterizationError::Encoding(format!("PNG encoding failed: {e}")))?;
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "png"
    }

    fn mime_type(&self) -> &'static str {
        "image/png"
    }
}
