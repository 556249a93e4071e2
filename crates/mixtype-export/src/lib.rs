//! Encoders for painted canvases
//!
//! Every exporter takes straight-alpha RGBA and either returns the complete
//! encoding or an error; there is no partial output.

use mixtype_core::{BitmapData, Exporter, OutputFormat, RasterizationError};

pub mod png;
pub mod raw;

pub use png::PngExporter;
pub use raw::{Rgb565Exporter, Rgba8Exporter};

/// The exporter for `format`
pub fn exporter_for(format: OutputFormat) -> Box<dyn Exporter> {
    match format {
        OutputFormat::Png => Box::new(PngExporter::new()),
        OutputFormat::Rgba8 => Box::new(Rgba8Exporter),
        OutputFormat::Rgb565 => Box::new(Rgb565Exporter),
    }
}

/// Encode `bitmap` as `format`
pub fn encode(bitmap: &BitmapData, format: OutputFormat) -> Result<Vec<u8>, RasterizationError> {
    let exporter = exporter_for(format);
    let bytes = exporter.export(bitmap)?;
    log::debug!(
        "Encoded {}x{} canvas as {} ({} bytes)",
        bitmap.width,
        bitmap.height,
        exporter.name(),
        bytes.len()
    );
    Ok(bytes)
}

/// Reject buffers that do not hold exactly `width * height` RGBA pixels
pub(crate) fn check_len(bitmap: &BitmapData) -> Result<(), RasterizationError> {
    let expected = u64::from(bitmap.width) * u64::from(bitmap.height) * 4;
    if bitmap.width == 0 || bitmap.height == 0 {
        return Err(RasterizationError::InvalidDimensions {
            width: bitmap.width,
            height: bitmap.height,
        });
    }
    if bitmap.data.len() as u64 != expected {
        return Err(RasterizationError::Encoding(format!(
            "expected {expected} bytes for {}x{} RGBA, got {}",
            bitmap.width,
            bitmap.height,
            bitmap.data.len()
        )));
    }
    Ok(())
}
