//! Image Ingestion
//!
//! Cheap checks (type, size) run before any decoding. Decoding runs on the
//! blocking pool and either yields a complete `LogoAsset` or an error; there is
//! no partially ingested state for callers to clean up.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use image::{ImageFormat, RgbaImage};
use resvg::{tiny_skia, usvg};

use crate::config::IngestSettings;
use crate::error::IngestError;

pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/svg+xml"];
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "svg"];

/// A file as handed over by the file picker.
#[derive(Debug, Clone)]
pub struct LogoUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl LogoUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Reads a local file, sniffing the MIME type from its content and falling
    /// back to the extension (SVG has no magic number).
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = infer::get(&bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type().to_string())
            .or_else(|| mime_from_extension(&file_name).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(Self::new(file_name, mime_type, bytes))
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    match extension_of(file_name)?.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoFormat {
    Png,
    Jpeg,
    Svg,
}

impl LogoFormat {
    fn from_mime(mime_type: &str) -> Option<Self> {
        match mime_type {
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "image/svg+xml" => Some(Self::Svg),
            _ => None,
        }
    }
}

/// Decoded pixels plus the original upload as a `data:` URI.
#[derive(Debug, Clone)]
pub struct RenderableHandle {
    bitmap: Arc<RgbaImage>,
    data_uri: Arc<str>,
}

impl RenderableHandle {
    pub fn new(bitmap: RgbaImage, data_uri: impl Into<Arc<str>>) -> Self {
        Self {
            bitmap: Arc::new(bitmap),
            data_uri: data_uri.into(),
        }
    }

    pub fn bitmap(&self) -> &RgbaImage {
        &self.bitmap
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }
}

#[derive(Debug, Clone)]
pub struct LogoAsset {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub mime_type: String,
    pub byte_size: u64,
    pub handle: RenderableHandle,
}

pub struct ImageIngestor {
    max_upload_bytes: u64,
    max_decoded_pixels: u64,
}

impl ImageIngestor {
    pub fn new(settings: &IngestSettings) -> Self {
        Self {
            max_upload_bytes: settings.max_upload_bytes,
            max_decoded_pixels: settings.max_decoded_pixels,
        }
    }

    /// Type and size gate. Runs before any decoding or network interaction.
    pub fn check(&self, upload: &LogoUpload) -> Result<LogoFormat, IngestError> {
        let mime_type = upload.mime_type.trim().to_ascii_lowercase();
        let format = LogoFormat::from_mime(&mime_type).ok_or_else(|| {
            IngestError::UnsupportedType {
                mime_type: upload.mime_type.clone(),
            }
        })?;

        if let Some(ext) = extension_of(&upload.file_name) {
            if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
                return Err(IngestError::UnsupportedType {
                    mime_type: format!("{} (.{})", upload.mime_type, ext),
                });
            }
        }

        let size = upload.bytes.len() as u64;
        if size > self.max_upload_bytes {
            return Err(IngestError::TooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        Ok(format)
    }

    pub async fn ingest(&self, upload: LogoUpload) -> Result<LogoAsset, IngestError> {
        let format = match self.check(&upload) {
            Ok(format) => format,
            Err(err) => {
                tracing::warn!(file = %upload.file_name, error = %err, "Logo upload rejected");
                return Err(err);
            }
        };

        let max_pixels = self.max_decoded_pixels;
        let LogoUpload {
            file_name,
            mime_type,
            bytes,
        } = upload;

        let (decoded, bytes) = tokio::task::spawn_blocking(move || {
            let decoded = decode(format, &bytes, max_pixels);
            (decoded, bytes)
        })
        .await
        .map_err(|e| IngestError::DecodeFailed(format!("decoder task failed: {e}")))?;

        let decoded = decoded.map_err(|err| {
            tracing::warn!(file = %file_name, error = %err, "Logo decode failed");
            err
        })?;

        let mime_type = mime_type.trim().to_ascii_lowercase();
        let data_uri = format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );

        tracing::info!(
            file = %file_name,
            width = decoded.width,
            height = decoded.height,
            bytes = bytes.len(),
            "Logo ingested"
        );

        Ok(LogoAsset {
            pixel_width: decoded.width,
            pixel_height: decoded.height,
            mime_type,
            byte_size: bytes.len() as u64,
            handle: RenderableHandle::new(decoded.bitmap, data_uri),
        })
    }
}

struct Decoded {
    /// Intrinsic size; for SVG this is the document size, not the raster size.
    width: u32,
    height: u32,
    bitmap: RgbaImage,
}

fn decode(format: LogoFormat, bytes: &[u8], max_pixels: u64) -> Result<Decoded, IngestError> {
    match format {
        LogoFormat::Png => decode_raster(ImageFormat::Png, bytes, max_pixels),
        LogoFormat::Jpeg => decode_raster(ImageFormat::Jpeg, bytes, max_pixels),
        LogoFormat::Svg => decode_svg(bytes, max_pixels),
    }
}

fn decode_raster(format: ImageFormat, bytes: &[u8], max_pixels: u64) -> Result<Decoded, IngestError> {
    let (width, height) = image::ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| IngestError::DecodeFailed(e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(IngestError::DecodeFailed("image has no pixels".to_string()));
    }
    if u64::from(width) * u64::from(height) > max_pixels {
        return Err(IngestError::DecodeFailed(format!(
            "{width}x{height} exceeds the decode budget of {max_pixels} pixels"
        )));
    }

    let bitmap = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| IngestError::DecodeFailed(e.to_string()))?
        .to_rgba8();

    Ok(Decoded {
        width,
        height,
        bitmap,
    })
}

fn decode_svg(bytes: &[u8], max_pixels: u64) -> Result<Decoded, IngestError> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| IngestError::DecodeFailed(e.to_string()))?;

    let size = tree.size();
    let width = size.width().round().max(1.0) as u32;
    let height = size.height().round().max(1.0) as u32;

    // Rasterize at intrinsic size unless that blows the pixel budget.
    let pixels = f64::from(width) * f64::from(height);
    let factor = (max_pixels as f64 / pixels).sqrt().min(1.0);
    let raster_w = ((f64::from(width) * factor).floor() as u32).max(1);
    let raster_h = ((f64::from(height) * factor).floor() as u32).max(1);

    let mut pixmap = tiny_skia::Pixmap::new(raster_w, raster_h)
        .ok_or_else(|| IngestError::DecodeFailed("raster allocation failed".to_string()))?;
    let transform = tiny_skia::Transform::from_scale(
        raster_w as f32 / size.width(),
        raster_h as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let bitmap = RgbaImage::from_raw(raster_w, raster_h, rgba)
        .ok_or_else(|| IngestError::DecodeFailed("raster size mismatch".to_string()))?;

    Ok(Decoded {
        width,
        height,
        bitmap,
    })
}
