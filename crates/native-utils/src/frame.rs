use base64::Engine;
use image::ColorType;
use image::codecs::jpeg::JpegEncoder;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// JPEG quality on the 0.0..=1.0 scale used by the capture interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageQuality(f32);

impl ImageQuality {
    /// Recurring hazard cycles: smaller payload, lower latency.
    pub const HAZARD: ImageQuality = ImageQuality(0.6);
    /// One-shot scene and find requests.
    pub const DETAIL: ImageQuality = ImageQuality(0.8);

    pub fn new(quality: f32) -> Self {
        Self(quality.clamp(0.01, 1.0))
    }

    /// Quality as the 1..=100 percentage the JPEG encoder expects.
    pub fn percent(&self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Not a JPEG data URL")]
    NotDataUrl,
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Re-encodes an image (any format the decoder understands) as JPEG at the
/// given quality.
pub fn encode_jpeg(image_bytes: &[u8], quality: ImageQuality) -> Result<Vec<u8>, FrameError> {
    let decoded = image::load_from_memory(image_bytes)?;
    // JPEG has no alpha channel.
    let rgb = decoded.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.percent()).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;
    tracing::debug!(
        "encoded {}x{} frame at q{} -> {} bytes",
        rgb.width(),
        rgb.height(),
        quality.percent(),
        out.len()
    );
    Ok(out)
}

/// Wraps JPEG bytes into a `data:image/jpeg;base64,...` URL.
pub fn to_data_url(jpeg: &[u8]) -> String {
    let mut url = String::with_capacity(DATA_URL_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
    url.push_str(DATA_URL_PREFIX);
    base64::engine::general_purpose::STANDARD.encode_string(jpeg, &mut url);
    url
}

/// Reverses [`to_data_url`].
pub fn from_data_url(url: &str) -> Result<Vec<u8>, FrameError> {
    let payload = url
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or(FrameError::NotDataUrl)?;
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

/// Encodes a raw frame straight into a JPEG data URL.
pub fn encode_data_url(image_bytes: &[u8], quality: ImageQuality) -> Result<String, FrameError> {
    let jpeg = encode_jpeg(image_bytes, quality)?;
    Ok(to_data_url(&jpeg))
}
