//! Layered-overlay backend.
//!
//! Produces absolutely positioned layers in percent of the container, the way
//! a DOM overlay positions them, and can serialize the stack as one SVG.

use serde::Serialize;
use std::fmt::Write as _;

use super::{
    check_container, fit_into_square, FrameGeometry, LogoPlacement, PlacementRenderer, RenderError,
    RenderScene, RenderedFrame,
};
use crate::placement::PixelRect;

const GUIDE_STROKE: &str = "#3b82f6";
const GUIDE_FILL: &str = "rgba(59,130,246,0.05)";
const PLACEHOLDER_FILL: &str = "#f1f5f9";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum OverlayLayer {
    Product {
        src: String,
    },
    AreaGuide {
        left_pct: f64,
        top_pct: f64,
        width_pct: f64,
        height_pct: f64,
        label: String,
    },
    Logo {
        /// Logo center, percent of the container.
        left_pct: f64,
        top_pct: f64,
        /// Base box size before scaling, pixels.
        width_px: f64,
        height_px: f64,
        scale: f64,
        rotation_deg: f64,
        css_transform: String,
        src: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayDocument {
    pub width: f64,
    pub height: f64,
    pub layers: Vec<OverlayLayer>,
}

impl OverlayDocument {
    /// Flattens the layer stack into a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        for layer in &self.layers {
            match layer {
                OverlayLayer::Product { src } => {
                    let _ = write!(
                        svg,
                        r#"<rect width="{w}" height="{h}" fill="{PLACEHOLDER_FILL}"/><image href="{src}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="xMidYMid meet"/>"#,
                        w = self.width,
                        h = self.height,
                        src = escape_xml(src)
                    );
                }
                OverlayLayer::AreaGuide {
                    left_pct,
                    top_pct,
                    width_pct,
                    height_pct,
                    label,
                } => {
                    let x = left_pct / 100.0 * self.width;
                    let y = top_pct / 100.0 * self.height;
                    let _ = write!(
                        svg,
                        r#"<rect x="{x}" y="{y}" width="{aw}" height="{ah}" fill="{GUIDE_FILL}" stroke="{GUIDE_STROKE}" stroke-width="2" stroke-dasharray="6 4"/><text x="{x}" y="{ty}" font-family="sans-serif" font-size="12" fill="{GUIDE_STROKE}">{label}</text>"#,
                        aw = width_pct / 100.0 * self.width,
                        ah = height_pct / 100.0 * self.height,
                        ty = y - 6.0,
                        label = escape_xml(label)
                    );
                }
                OverlayLayer::Logo {
                    left_pct,
                    top_pct,
                    width_px,
                    height_px,
                    scale,
                    rotation_deg,
                    src,
                    ..
                } => {
                    let _ = write!(
                        svg,
                        r#"<g transform="translate({cx} {cy}) rotate({rotation_deg}) scale({scale})"><image href="{src}" x="{x}" y="{y}" width="{width_px}" height="{height_px}"/></g>"#,
                        cx = left_pct / 100.0 * self.width,
                        cy = top_pct / 100.0 * self.height,
                        x = -width_px / 2.0,
                        y = -height_px / 2.0,
                        src = escape_xml(src)
                    );
                }
            }
        }
        svg.push_str("</svg>");
        svg
    }
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayRenderer;

impl PlacementRenderer for OverlayRenderer {
    type Output = OverlayDocument;

    fn name(&self) -> &'static str { "overlay" }

    fn render(&self, scene: &RenderScene<'_>) -> Result<RenderedFrame<OverlayDocument>, RenderError> {
        check_container(scene.container)?;
        let (wc, hc) = (scene.container.width, scene.container.height);
        let area = scene.area;
        let t = scene.transform;

        let mut layers = Vec::with_capacity(3);
        if let Some(image) = scene.product_image {
            layers.push(OverlayLayer::Product {
                src: image.source.to_string(),
            });
        }
        layers.push(OverlayLayer::AreaGuide {
            left_pct: area.x,
            top_pct: area.y,
            width_pct: area.width,
            height_pct: area.height,
            label: area.label.clone(),
        });

        let mut logo_placement = None;
        if let Some(logo) = scene.logo {
            // Percent composition, as a positioned element would be laid out.
            let left_pct = area.x + t.pos_x / 100.0 * area.width;
            let top_pct = area.y + t.pos_y / 100.0 * area.height;
            let (width_px, height_px) =
                fit_into_square(logo.pixel_width, logo.pixel_height, scene.base_display_size);

            layers.push(OverlayLayer::Logo {
                left_pct,
                top_pct,
                width_px,
                height_px,
                scale: t.scale,
                rotation_deg: t.rotation_deg,
                css_transform: format!(
                    "translate(-50%, -50%) scale({}) rotate({}deg)",
                    t.scale, t.rotation_deg
                ),
                src: logo.handle.data_uri().to_string(),
            });
            logo_placement = Some(LogoPlacement {
                center_x: left_pct / 100.0 * wc,
                center_y: top_pct / 100.0 * hc,
                width: width_px * t.scale,
                height: height_px * t.scale,
                rotation_deg: t.rotation_deg,
            });
        }

        Ok(RenderedFrame {
            geometry: FrameGeometry {
                area_rect: PixelRect {
                    x: area.x / 100.0 * wc,
                    y: area.y / 100.0 * hc,
                    width: area.width / 100.0 * wc,
                    height: area.height / 100.0 * hc,
                },
                area_label: area.label.clone(),
                logo: logo_placement,
            },
            output: OverlayDocument {
                width: wc,
                height: hc,
                layers,
            },
        })
    }
}
