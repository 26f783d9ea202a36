//! Writers for acquired frames.
//!
//! Three formats are supported, matching what the acquisition menu saves after
//! each snapshot:
//!
//! - **Text**: one pixel value per line, row-major.
//! - **BMP**: 8-bit greyscale, the 16-bit range mapped linearly onto 0..=255.
//! - **Normalised BMP**: contrast stretched between the frame's own minimum and
//!   maximum, which makes faint images visible.

use crate::camera::Frame;
use crate::error::ExportError;
use image::{GrayImage, ImageFormat};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const FULL_SCALE: f64 = 65535.0;

/// File stem for the `index`-th snapshot: `image` and 7 give `image007`.
pub fn snapshot_name(stem: &str, index: u32) -> String {
    format!("{stem}{index:03}")
}

/// `dir/name.extension`
pub fn snapshot_path(dir: &Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{name}.{extension}"))
}

/// Write one pixel value per line, row-major.
pub fn save_as_txt(frame: &Frame, path: &Path) -> Result<(), ExportError> {
    check_dimensions(frame)?;
    let mut writer = BufWriter::new(File::create(path)?);
    for value in &frame.pixels {
        writeln!(writer, "{value}")?;
    }
    writer.flush()?;
    debug!(path = %path.display(), "Saved frame as text");
    Ok(())
}

/// Write an 8-bit greyscale BMP, mapping 0..=65535 onto 0..=255.
pub fn save_as_bmp(frame: &Frame, path: &Path) -> Result<(), ExportError> {
    check_dimensions(frame)?;
    let levels = frame
        .pixels
        .iter()
        .map(|&v| to_level(f64::from(v) * 255.0 / FULL_SCALE))
        .collect();
    write_bmp(frame, levels, path)
}

/// Write an 8-bit greyscale BMP stretched between the frame's min and max.
pub fn save_as_bmp_normalised(frame: &Frame, path: &Path) -> Result<(), ExportError> {
    check_dimensions(frame)?;
    let (min, max) = match (frame.min(), frame.max()) {
        (Some(min), Some(max)) => (f64::from(min), f64::from(max)),
        _ => return Err(ExportError::EmptyFrame),
    };
    let span = max - min;
    debug!(min, max, "Normalising frame contrast");

    let levels = frame
        .pixels
        .iter()
        .map(|&v| {
            if span > 0.0 {
                to_level((f64::from(v) - min) * 255.0 / span)
            } else {
                0
            }
        })
        .collect();
    write_bmp(frame, levels, path)
}

fn to_level(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn check_dimensions(frame: &Frame) -> Result<(), ExportError> {
    if frame.pixels.is_empty() {
        return Err(ExportError::EmptyFrame);
    }
    let expected = frame.width as usize * frame.height as usize;
    if expected != frame.pixels.len() {
        return Err(ExportError::Dimensions {
            width: frame.width,
            height: frame.height,
            pixels: frame.pixels.len(),
        });
    }
    Ok(())
}

fn write_bmp(frame: &Frame, levels: Vec<u8>, path: &Path) -> Result<(), ExportError> {
    let image = GrayImage::from_raw(frame.width, frame.height, levels).ok_or(
        ExportError::Dimensions {
            width: frame.width,
            height: frame.height,
            pixels: frame.pixels.len(),
        },
    )?;
    image.save_with_format(path, ImageFormat::Bmp)?;
    debug!(path = %path.display(), "Saved frame as BMP");
    Ok(())
}
