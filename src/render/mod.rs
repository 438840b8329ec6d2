//! Placement preview rendering.
//!
//! Two interchangeable backends: `overlay` describes positioned layers (and can
//! emit them as SVG), `canvas` rasterizes the frame with tiny-skia. Both report
//! the same frame geometry for the same scene: logo center within 1px, positive
//! rotation is clockwise.

pub mod canvas;
pub mod overlay;

use image::RgbaImage;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::PrintArea;
use crate::ingest::LogoAsset;
use crate::placement::{ContainerSize, PixelRect, PlacementTransform};

pub use canvas::{CanvasFrame, CanvasRenderer};
pub use overlay::{OverlayDocument, OverlayLayer, OverlayRenderer};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("Invalid container size {width}x{height}")]
    InvalidContainer { width: f64, height: f64 },

    #[error("Surface allocation failed")]
    Allocation,

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// The selected variant's primary image.
#[derive(Debug, Clone, Copy)]
pub struct ProductImage<'a> {
    pub source: &'a str,
    /// Decoded pixels, when the caller has them. Raster backends need these.
    pub bitmap: Option<&'a RgbaImage>,
}

/// Everything one frame depends on.
#[derive(Debug, Clone, Copy)]
pub struct RenderScene<'a> {
    pub container: ContainerSize,
    pub area: &'a PrintArea,
    pub transform: PlacementTransform,
    pub logo: Option<&'a LogoAsset>,
    pub product_image: Option<ProductImage<'a>>,
    pub base_display_size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogoPlacement {
    pub center_x: f64,
    pub center_y: f64,
    /// Drawn size after fitting into the base box and scaling.
    pub width: f64,
    pub height: f64,
    pub rotation_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameGeometry {
    pub area_rect: PixelRect,
    pub area_label: String,
    pub logo: Option<LogoPlacement>,
}

#[derive(Debug, Clone)]
pub struct RenderedFrame<T> {
    pub geometry: FrameGeometry,
    pub output: T,
}

pub trait PlacementRenderer {
    type Output;

    fn name(&self) -> &'static str;

    fn render(&self, scene: &RenderScene<'_>) -> Result<RenderedFrame<Self::Output>, RenderError>;
}

/// Fits `width x height` into a `base` square, preserving aspect ratio.
pub fn fit_into_square(width: u32, height: u32, base: f64) -> (f64, f64) {
    if width == 0 || height == 0 {
        return (base, base);
    }
    let (w, h) = (f64::from(width), f64::from(height));
    let factor = base / w.max(h);
    (w * factor, h * factor)
}

fn check_container(container: ContainerSize) -> Result<(), RenderError> {
    let ok = |v: f64| v.is_finite() && v >= 1.0;
    if ok(container.width) && ok(container.height) {
        Ok(())
    } else {
        Err(RenderError::InvalidContainer {
            width: container.width,
            height: container.height,
        })
    }
}
