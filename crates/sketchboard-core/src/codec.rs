//! Snapshot encoding: raster buffer <-> portable PNG payload.
//!
//! Snapshots are PNG images wrapped in a base64 data URL. The raster buffer stores
//! premultiplied RGBA while PNG stores straight alpha; the conversions in this module
//! round to nearest in both directions, which makes `decode(encode(buffer))`
//! reproduce the buffer exactly.

use base64::{Engine, engine::general_purpose::STANDARD};
use std::fmt;
use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tiny_skia::{IntSize, Pixmap};

/// Prefix of every payload produced by [`PngCodec`].
pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("PNG decoding failed: {0}")]
    Decode(String),
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Boxed future for async decoding (single-threaded, so no `Send` bound).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Target representation for an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// `data:image/png;base64,...` text.
    #[default]
    Base64,
    /// Raw PNG file bytes.
    Png,
}

impl ExportFormat {
    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Base64 => "base64",
            ExportFormat::Png => "png",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> CodecResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(ExportFormat::Base64),
            "png" => Ok(ExportFormat::Png),
            other => Err(CodecError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// An immutable encoded copy of the raster buffer.
///
/// Cloning is cheap; the payload is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    payload: Arc<str>,
}

impl Snapshot {
    /// Wrap an already encoded payload.
    pub fn from_payload(payload: impl Into<Arc<str>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The encoded payload (a data URL for [`PngCodec`]).
    pub fn as_str(&self) -> &str {
        &self.payload
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Encoder/decoder the board uses for history snapshots and export.
pub trait SnapshotCodec {
    /// Serialize the buffer into a snapshot.
    fn encode(&self, pixmap: &Pixmap) -> CodecResult<Snapshot>;

    /// Reconstruct a buffer from a snapshot. Completion is signalled by the future.
    fn decode(&self, snapshot: &Snapshot) -> BoxFuture<'static, CodecResult<Pixmap>>;
}

/// PNG + base64 data URL codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl SnapshotCodec for PngCodec {
    fn encode(&self, pixmap: &Pixmap) -> CodecResult<Snapshot> {
        let png = encode_png(pixmap)?;
        Ok(Snapshot::from_payload(to_data_url(&png)))
    }

    fn decode(&self, snapshot: &Snapshot) -> BoxFuture<'static, CodecResult<Pixmap>> {
        let snapshot = snapshot.clone();
        Box::pin(async move {
            let png = from_data_url(snapshot.as_str())?;
            decode_png(&png)
        })
    }
}

/// Wrap PNG bytes in a base64 data URL.
pub fn to_data_url(png: &[u8]) -> String {
    let mut url = String::with_capacity(DATA_URL_PREFIX.len() + png.len() * 4 / 3 + 4);
    url.push_str(DATA_URL_PREFIX);
    url.push_str(&STANDARD.encode(png));
    url
}

/// Extract PNG bytes from a base64 data URL.
pub fn from_data_url(url: &str) -> CodecResult<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| CodecError::InvalidPayload("missing data: scheme".to_string()))?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| CodecError::InvalidPayload("missing ',' separator".to_string()))?;
    let (media_type, encoding) = header.split_once(';').unwrap_or((header, ""));

    if media_type != "image/png" {
        return Err(CodecError::UnsupportedFormat(media_type.to_string()));
    }
    if encoding != "base64" {
        return Err(CodecError::UnsupportedFormat(format!("{media_type};{encoding}")));
    }

    STANDARD
        .decode(data)
        .map_err(|e| CodecError::InvalidPayload(e.to_string()))
}

/// Encode a premultiplied buffer as an RGBA8 PNG.
pub fn encode_png(pixmap: &Pixmap) -> CodecResult<Vec<u8>> {
    let rgba = demultiply(pixmap.data());
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, pixmap.width(), pixmap.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        writer
            .write_image_data(&rgba)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
    }
    Ok(png_data)
}

/// Decode PNG bytes of any 8/16-bit colour type into a premultiplied buffer.
pub fn decode_png(bytes: &[u8]) -> CodecResult<Pixmap> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

    let mut reader = decoder
        .read_info()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    let data = &buf[..info.buffer_size()];

    if info.bit_depth != png::BitDepth::Eight {
        return Err(CodecError::UnsupportedFormat(format!(
            "PNG bit depth {:?}",
            info.bit_depth
        )));
    }

    let mut rgba: Vec<u8> = match info.color_type {
        png::ColorType::Rgba => data.to_vec(),
        png::ColorType::Rgb => data
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        png::ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Grayscale => data.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        png::ColorType::Indexed => {
            return Err(CodecError::UnsupportedFormat("indexed PNG".to_string()));
        }
    };

    premultiply(&mut rgba);

    let size = IntSize::from_wh(info.width, info.height).ok_or(CodecError::InvalidDimensions {
        width: info.width,
        height: info.height,
    })?;
    Pixmap::from_vec(rgba, size).ok_or(CodecError::InvalidDimensions {
        width: info.width,
        height: info.height,
    })
}

/// Premultiplied RGBA8 -> straight RGBA8, rounding to nearest.
fn demultiply(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for px in data.chunks_exact(4) {
        let a = px[3];
        match a {
            0 => out.extend_from_slice(&[0, 0, 0, 0]),
            255 => out.extend_from_slice(px),
            _ => {
                let a32 = a as u32;
                for &c in &px[..3] {
                    let v = (c as u32 * 255 + a32 / 2) / a32;
                    out.push(v.min(255) as u8);
                }
                out.push(a);
            }
        }
    }
    out
}

/// Straight RGBA8 -> premultiplied RGBA8 in place, rounding to nearest.
fn premultiply(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u32;
        match a {
            255 => {}
            0 => px[..3].fill(0),
            _ => {
                for c in &mut px[..3] {
                    *c = ((*c as u32 * a + 127) / 255) as u8;
                }
            }
        }
    }
}
