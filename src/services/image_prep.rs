use base64::{engine::general_purpose, Engine};
use image::{imageops::FilterType, DynamicImage, ImageError, ImageFormat};
use std::io::Cursor;

use crate::error::ScanError;

/// Longest side sent upstream. Larger photos are downsampled.
pub const MAX_SIDE: u32 = 1024;
/// Shortest side sent upstream. Smaller photos are upsampled.
pub const MIN_SIDE: u32 = 300;

/// Meal photo as received from a caller.
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// Raw file bytes (PNG, JPEG, WebP, ...)
    Bytes(Vec<u8>),
    /// `data:image/<fmt>;base64,<payload>` URI or a bare base64 payload
    Encoded(String),
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageInput {
    fn from(bytes: &[u8]) -> Self {
        ImageInput::Bytes(bytes.to_vec())
    }
}

impl From<String> for ImageInput {
    fn from(s: String) -> Self {
        ImageInput::Encoded(s)
    }
}

impl From<&str> for ImageInput {
    fn from(s: &str) -> Self {
        ImageInput::Encoded(s.to_string())
    }
}

/// Normalized RGB JPEG ready to attach to an inference request.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub data_url: String,
}

/// Decode, normalize and re-encode a meal photo.
pub fn prepare(input: &ImageInput) -> Result<PreparedImage, ScanError> {
    let image = normalize(decode_input(input)?);

    let mut jpeg = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .map_err(|e| ScanError::InvalidInput(format!("could not re-encode image: {}", e)))?;

    log::debug!(
        "🖼️ Prepared {}x{} image ({} bytes JPEG)",
        image.width(),
        image.height(),
        jpeg.len()
    );

    Ok(PreparedImage {
        width: image.width(),
        height: image.height(),
        data_url: format!("data:image/jpeg;base64,{}", general_purpose::STANDARD.encode(&jpeg)),
    })
}

pub fn decode_input(input: &ImageInput) -> Result<DynamicImage, ScanError> {
    let bytes = match input {
        ImageInput::Bytes(bytes) => bytes.clone(),
        ImageInput::Encoded(text) => decode_base64(strip_data_uri(text.trim())?)?,
    };

    if bytes.is_empty() {
        return Err(ScanError::InvalidInput("empty image payload".to_string()));
    }

    image::load_from_memory(&bytes).map_err(describe_image_error)
}

fn strip_data_uri(text: &str) -> Result<&str, ScanError> {
    let Some(rest) = text.strip_prefix("data:") else {
        return Ok(text);
    };

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ScanError::InvalidInput("malformed data URI: missing ',' separator".to_string()))?;

    let mime = header.split(';').next().unwrap_or_default();
    if !mime.starts_with("image/") {
        return Err(ScanError::InvalidInput(format!(
            "unsupported data URI media type '{}'",
            mime
        )));
    }
    if !header.ends_with(";base64") {
        return Err(ScanError::InvalidInput("data URI is not base64-encoded".to_string()));
    }

    Ok(payload)
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, ScanError> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| ScanError::InvalidInput(format!("invalid base64 payload: {}", e)))
}

fn describe_image_error(err: ImageError) -> ScanError {
    let message = match err {
        ImageError::Unsupported(e) => format!("unsupported image format: {}", e),
        ImageError::Decoding(e) => format!("corrupt image data: {}", e),
        ImageError::Limits(e) => format!("image too large: {}", e),
        other => format!("could not read image: {}", other),
    };
    ScanError::InvalidInput(message)
}

/// Converts to RGB8 and rescales into the MIN_SIDE..=MAX_SIDE band.
pub fn normalize(image: DynamicImage) -> DynamicImage {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    match target_dimensions(rgb.width(), rgb.height()) {
        Some((width, height)) => {
            log::debug!(
                "📐 Resizing image {}x{} -> {}x{}",
                rgb.width(),
                rgb.height(),
                width,
                height
            );
            rgb.resize_exact(width, height, FilterType::Lanczos3)
        }
        None => rgb,
    }
}

/// Aspect-preserving target size, or `None` when the image is already in range.
/// Upsampling never pushes the long side past MAX_SIDE.
pub fn target_dimensions(width: u32, height: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }

    let long = width.max(height) as f64;
    let short = width.min(height) as f64;

    let scale = if long > MAX_SIDE as f64 {
        MAX_SIDE as f64 / long
    } else if short < MIN_SIDE as f64 {
        (MIN_SIDE as f64 / short).min(MAX_SIDE as f64 / long)
    } else {
        return None;
    };

    let scaled = |side: u32| ((side as f64 * scale).round() as u32).max(1);
    let target = (scaled(width), scaled(height));
    if target == (width, height) {
        None
    } else {
        Some(target)
    }
}

#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40])));
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    png
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_dimensions() {
        assert_eq!(target_dimensions(2048, 1024), Some((1024, 512)));
        assert_eq!(target_dimensions(100, 150), Some((300, 450)));
        assert_eq!(target_dimensions(1, 1), Some((300, 300)));
        // Upsampling stops once the long side reaches the cap
        assert_eq!(target_dimensions(100, 1000), Some((102, 1024)));
        assert_eq!(target_dimensions(500, 500), None);
        assert_eq!(target_dimensions(300, 1024), None);
    }

    #[test]
    fn test_prepare_from_data_uri() {
        let uri = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(test_png(1, 1))
        );

        let prepared = prepare(&ImageInput::from(uri)).unwrap();
        assert_eq!((prepared.width, prepared.height), (300, 300));
        assert!(prepared.data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_prepare_from_bare_base64_and_bytes() {
        let png = test_png(400, 320);
        let bare = general_purpose::STANDARD.encode(&png);

        let from_text = prepare(&ImageInput::from(bare)).unwrap();
        let from_bytes = prepare(&ImageInput::from(png)).unwrap();
        assert_eq!((from_text.width, from_text.height), (400, 320));
        assert_eq!((from_bytes.width, from_bytes.height), (400, 320));
    }

    fn encode_png(image: DynamicImage) -> Vec<u8> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
        png
    }

    fn decode_data_url(data_url: &str) -> DynamicImage {
        let payload = data_url.strip_prefix("data:image/jpeg;base64,").unwrap();
        image::load_from_memory(&general_purpose::STANDARD.decode(payload).unwrap()).unwrap()
    }

    #[test]
    fn test_prepare_converts_rgba_and_downsamples() {
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(2000, 50, image::Rgba([10, 200, 90, 128])));

        let prepared = prepare(&ImageInput::from(encode_png(rgba))).unwrap();
        assert_eq!((prepared.width, prepared.height), (1024, 26));

        let jpeg = decode_data_url(&prepared.data_url);
        assert_eq!(jpeg.color(), image::ColorType::Rgb8);
        assert_eq!((jpeg.width(), jpeg.height()), (1024, 26));
    }

    #[test]
    fn test_prepare_converts_grayscale_and_upsamples() {
        let luma = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(100, 100, image::Luma([140])));

        let prepared = prepare(&ImageInput::from(encode_png(luma))).unwrap();
        assert_eq!((prepared.width, prepared.height), (300, 300));
        assert_eq!(decode_data_url(&prepared.data_url).color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_normalize_always_yields_rgb8() {
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::new(500, 400));
        let normalized = normalize(rgba);
        assert_eq!(normalized.color(), image::ColorType::Rgb8);
        assert_eq!((normalized.width(), normalized.height()), (500, 400));
    }

    #[test]
    fn test_invalid_inputs_name_the_cause() {
        let cases = [
            ("data:image/png;base64", "missing ','"),
            ("data:text/plain;base64,aGVsbG8=", "media type"),
            ("data:image/png,rawdata", "not base64"),
            ("data:image/png;base64,!!!not-base64!!!", "invalid base64"),
            ("data:image/png;base64,", "empty image payload"),
        ];

        for (input, expected) in cases {
            match decode_input(&ImageInput::from(input)) {
                Err(ScanError::InvalidInput(msg)) => {
                    assert!(msg.contains(expected), "{:?} -> {}", input, msg)
                }
                other => panic!("{:?} -> unexpected {:?}", input, other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = decode_input(&ImageInput::from(b"definitely not an image".as_slice())).unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }
}
