//! Uncompressed pixel dumps

use mixtype_core::{BitmapData, Color, Exporter, OutputFormat, RasterizationError};

use crate::check_len;

/// The canvas bytes as they are
#[derive(Debug, Default, Clone, Copy)]
pub struct Rgba8Exporter;

impl Exporter for Rgba8Exporter {
    fn name(&self) -> &'static str {
        "rgba8"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Rgba8
    }

    fn export(&self, bitmap: &BitmapData) -> Result<Vec<u8>, RasterizationError> {
        check_len(bitmap)?;
        Ok(bitmap.data.clone())
    }

    fn extension(&self) -> &'static str {
        "rgba"
    }

    fn mime_type(&self) -> &'static str {
        "application/octet-stream"
    }
}

/// Little-endian RGB565 frames for small displays
///
/// Alpha is flattened by compositing over black.
#[derive(Debug, Default, Clone, Copy)]
pub struct Rgb565Exporter;

impl Rgb565Exporter {
    /// One 5-6-5 pixel from straight RGBA
    pub fn pack(r: u8, g: u8, b: u8, a: u8) -> u16 {
        let over_black = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
        Color::rgb(over_black(r), over_black(g), over_black(b)).to_rgb565()
    }
}

impl Exporter for Rgb565Exporter {
    fn name(&self) -> &'static str {
        "rgb565"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Rgb565
    }

    fn export(&self, bitmap: &BitmapData) -> Result<Vec<u8>, RasterizationError> {
        check_len(bitmap)?;
        Ok(bitmap
            .data
            .chunks_exact(4)
            .flat_map(|px| Self::pack(px[0], px[1], px[2], px[3]).to_le_bytes())
            .collect())
    }

    fn extension(&self) -> &'static str {
        "rgb565"
    }

    fn mime_type(&self) -> &'static str {
        "application/octet-stream"
    }
}
