//! Final export: crop the buffer to its painted content and encode it.

use crate::codec::{CodecError, CodecResult, ExportFormat, SnapshotCodec, from_data_url};
use serde::{Deserialize, Serialize};
use tiny_skia::{IntRect, Pixmap};

/// Tight box around all pixels with non-zero alpha, in buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A cropped, encoded export of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedImage {
    /// Encoded payload of the cropped image.
    pub file: String,
    /// Left edge of the crop within the buffer.
    pub x: u32,
    /// Top edge of the crop within the buffer.
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ExportedImage {
    /// The export in the requested representation.
    pub fn to_bytes(&self, format: ExportFormat) -> CodecResult<Vec<u8>> {
        match format {
            ExportFormat::Base64 => Ok(self.file.as_bytes().to_vec()),
            ExportFormat::Png => from_data_url(&self.file),
        }
    }
}

/// Find the bounding box of all non-transparent pixels.
///
/// Returns `None` when the buffer is blank. The box is inclusive of the outermost
/// painted pixels, so a single painted pixel yields a 1x1 box.
pub fn content_bounds(pixmap: &Pixmap) -> Option<ContentBounds> {
    let width = pixmap.width() as usize;
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (i, px) in pixmap.pixels().iter().enumerate() {
        if px.alpha() == 0 {
            continue;
        }
        let x = (i % width) as u32;
        let y = (i / width) as u32;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
        found = true;
    }

    if !found {
        return None;
    }

    Some(ContentBounds {
        x: min_x,
        y: min_y,
        width: (max_x - min_x + 1).max(1),
        height: (max_y - min_y + 1).max(1),
    })
}

/// Copy the region `bounds` out of `pixmap` into a new buffer.
pub fn crop(pixmap: &Pixmap, bounds: ContentBounds) -> CodecResult<Pixmap> {
    let invalid = || CodecError::InvalidDimensions {
        width: bounds.width,
        height: bounds.height,
    };
    let rect = IntRect::from_xywh(bounds.x as i32, bounds.y as i32, bounds.width, bounds.height)
        .ok_or_else(invalid)?;
    pixmap.clone_rect(rect).ok_or_else(invalid)
}

/// Crop the buffer to its content and encode the crop.
///
/// A blank buffer is not an error: it logs a warning and yields `None`. The live
/// buffer is only read.
pub fn export_final<C: SnapshotCodec + ?Sized>(
    codec: &C,
    pixmap: &Pixmap,
) -> CodecResult<Option<ExportedImage>> {
    let Some(bounds) = content_bounds(pixmap) else {
        log::warn!("Empty canvas, nothing to export");
        return Ok(None);
    };

    let cropped = crop(pixmap, bounds)?;
    let snapshot = codec.encode(&cropped)?;
    log::info!(
        "Exported {}x{} crop at ({}, {})",
        bounds.width,
        bounds.height,
        bounds.x,
        bounds.y
    );

    Ok(Some(ExportedImage {
        file: snapshot.as_str().to_string(),
        x: bounds.x,
        y: bounds.y,
        width: bounds.width,
        height: bounds.height,
    }))
}
