//! Image ingestion: decode an upload, bound its dimensions, flatten it onto
//! white and re-encode it as a compact JPEG suitable for a vision model.

use crate::config::MediaConfig;
use crate::error::ExchangeError;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use tracing::debug;

/// Default maximum length of the longer image side, in pixels.
pub const DEFAULT_IMAGE_MAX_DIMENSION_PX: u32 = 400;

/// Default maximum raw upload size in bytes (20 MB).
pub const DEFAULT_IMAGE_MAX_BYTES: usize = 20 * 1024 * 1024;

/// Default JPEG quality (0-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

/// Limits applied when normalizing images before they join a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_dimension_px: u32,
    pub max_bytes: usize,
    pub jpeg_quality: u8,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_dimension_px: DEFAULT_IMAGE_MAX_DIMENSION_PX,
            max_bytes: DEFAULT_IMAGE_MAX_BYTES,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Resolve image limits from config, falling back to defaults.
pub fn resolve_limits(config: &MediaConfig) -> ImageLimits {
    ImageLimits {
        max_dimension_px: config
            .max_dimension_px
            .unwrap_or(DEFAULT_IMAGE_MAX_DIMENSION_PX)
            .max(1),
        max_bytes: config.max_upload_bytes.unwrap_or(DEFAULT_IMAGE_MAX_BYTES),
        jpeg_quality: config.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY).clamp(1, 100),
    }
}

/// A re-encoded image, base64 without any data URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    pub data: String,
}

impl NormalizedImage {
    pub fn mime_type(&self) -> mime::Mime {
        mime::IMAGE_JPEG
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.data)
    }

    /// Length of the bare base64 payload.
    pub fn encoded_len(&self) -> usize {
        self.data.len()
    }
}

/// Compute the output size for an image so its longer side is at most
/// `max` pixels, preserving aspect ratio.
pub fn target_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    let scale = |side: u32, long: u32| -> u32 {
        let scaled = (f64::from(side) * f64::from(max) / f64::from(long)).round();
        (scaled as u32).max(1)
    };

    if width > height && width > max {
        (max, scale(height, width))
    } else if height > max {
        (scale(width, height), max)
    } else {
        (width, height)
    }
}

/// Decode, downsample and re-encode an uploaded image.
pub fn normalize(raw: &[u8], limits: &ImageLimits) -> Result<NormalizedImage, ExchangeError> {
    if raw.len() > limits.max_bytes {
        return Err(ExchangeError::ImageTooLarge {
            size: raw.len(),
            limit: limits.max_bytes,
        });
    }

    let decoded =
        image::load_from_memory(raw).map_err(|e| ExchangeError::DecodeFailure(e.to_string()))?;

    let (width, height) =
        target_dimensions(decoded.width(), decoded.height(), limits.max_dimension_px);

    let rgba = if (width, height) == (decoded.width(), decoded.height()) {
        decoded.to_rgba8()
    } else {
        decoded
            .resize_exact(width, height, FilterType::CatmullRom)
            .to_rgba8()
    };

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
        };
        canvas.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, limits.jpeg_quality);
    encoder
        .encode_image(&canvas)
        .map_err(|e| ExchangeError::DecodeFailure(format!("jpeg encode failed: {e}")))?;

    let data = BASE64.encode(&bytes);
    debug!(
        "Normalized image {}x{} -> {}x{} ({} raw bytes, {} encoded chars)",
        decoded.width(),
        decoded.height(),
        width,
        height,
        raw.len(),
        data.len()
    );

    Ok(NormalizedImage {
        width,
        height,
        data,
    })
}

/// Decode an image given either as a data URL or as bare base64.
pub fn decode_upload(encoded: &str) -> Result<Vec<u8>, ExchangeError> {
    let bare = crate::conversation::strip_data_url_prefix(encoded.trim());
    BASE64
        .decode(bare)
        .map_err(|e| ExchangeError::DecodeFailure(format!("invalid base64: {e}")))
}
