//! Immediate-mode canvas backend using tiny-skia.
//!
//! Redraws the whole frame: backdrop, product image, dashed area guide with a
//! label tab, then the logo translated to its center, rotated, and scaled.

use image::RgbaImage;
use tiny_skia::{
    Color, ColorU8, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect,
    Stroke, StrokeDash, Transform,
};

use super::{
    check_container, fit_into_square, FrameGeometry, LogoPlacement, PlacementRenderer, RenderError,
    RenderScene, RenderedFrame,
};
use crate::placement::{area_pixel_rect, area_to_pixel};

const LABEL_TAB_HEIGHT: f32 = 18.0;
const LABEL_CHAR_WIDTH: f32 = 7.0;

fn backdrop_color() -> Color {
    Color::from_rgba8(241, 245, 249, 255)
}
fn guide_color() -> Color {
    Color::from_rgba8(59, 130, 246, 255)
}
fn guide_fill_color() -> Color {
    Color::from_rgba8(59, 130, 246, 13)
}
fn label_tab_color() -> Color {
    Color::from_rgba8(255, 255, 255, 255)
}

pub struct CanvasFrame {
    pub pixmap: Pixmap,
}

impl CanvasFrame {
    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        self.pixmap
            .encode_png()
            .map_err(|e| RenderError::Encoding(e.to_string()))
    }

    /// Straight (non-premultiplied) RGBA at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }
}

/// Converts straight RGBA into a premultiplied pixmap.
pub fn pixmap_from_rgba(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CanvasRenderer;

impl CanvasRenderer {
    fn draw_product(pixmap: &mut Pixmap, bitmap: &RgbaImage) {
        let Some(source) = pixmap_from_rgba(bitmap) else {
            return;
        };
        // object-fit: contain
        let (cw, ch) = (pixmap.width() as f32, pixmap.height() as f32);
        let (iw, ih) = (source.width() as f32, source.height() as f32);
        let factor = (cw / iw).min(ch / ih);
        let transform = Transform::from_translate((cw - iw * factor) / 2.0, (ch - ih * factor) / 2.0)
            .pre_scale(factor, factor);
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    }

    fn draw_area_guide(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, label: &str) {
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);

        let mut fill = Paint::default();
        fill.set_color(guide_fill_color());
        pixmap.fill_path(&path, &fill, FillRule::Winding, Transform::identity(), None);

        let mut paint = Paint::default();
        paint.set_color(guide_color());
        paint.anti_alias = false;
        let stroke = Stroke {
            width: 2.0,
            dash: StrokeDash::new(vec![6.0, 4.0], 0.0),
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);

        // Label tab above the area; glyphs are left to the overlay backend.
        let tab_w = label.chars().count() as f32 * LABEL_CHAR_WIDTH + 16.0;
        let tab_y = (y - LABEL_TAB_HEIGHT - 4.0).max(0.0);
        if let Some(tab) = Rect::from_xywh(x, tab_y, tab_w, LABEL_TAB_HEIGHT) {
            let mut tab_paint = Paint::default();
            tab_paint.set_color(label_tab_color());
            pixmap.fill_rect(tab, &tab_paint, Transform::identity(), None);
        }
    }
}

impl PlacementRenderer for CanvasRenderer {
    type Output = CanvasFrame;

    fn name(&self) -> &'static str { "canvas" }

    fn render(&self, scene: &RenderScene<'_>) -> Result<RenderedFrame<CanvasFrame>, RenderError> {
        check_container(scene.container)?;
        let width = scene.container.width.round() as u32;
        let height = scene.container.height.round() as u32;
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Allocation)?;
        pixmap.fill(backdrop_color());

        if let Some(bitmap) = scene.product_image.and_then(|img| img.bitmap) {
            Self::draw_product(&mut pixmap, bitmap);
        }

        let area_rect = area_pixel_rect(scene.area, scene.container);
        Self::draw_area_guide(
            &mut pixmap,
            area_rect.x as f32,
            area_rect.y as f32,
            area_rect.width as f32,
            area_rect.height as f32,
            &scene.area.label,
        );

        let t = scene.transform;
        let mut logo_placement = None;
        if let Some(logo) = scene.logo {
            let (center_x, center_y) = area_to_pixel(scene.area, scene.container, t.pos_x, t.pos_y);
            let (fit_w, fit_h) =
                fit_into_square(logo.pixel_width, logo.pixel_height, scene.base_display_size);

            let bitmap = logo.handle.bitmap();
            if let Some(source) = pixmap_from_rgba(bitmap) {
                let (bw, bh) = (source.width() as f32, source.height() as f32);
                let scale = t.scale as f32;
                let transform = Transform::from_translate(center_x as f32, center_y as f32)
                    .pre_concat(Transform::from_rotate(t.rotation_deg as f32))
                    .pre_scale(scale * fit_w as f32 / bw, scale * fit_h as f32 / bh)
                    .pre_translate(-bw / 2.0, -bh / 2.0);
                let paint = PixmapPaint {
                    quality: FilterQuality::Bilinear,
                    ..PixmapPaint::default()
                };
                pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
            }

            logo_placement = Some(LogoPlacement {
                center_x,
                center_y,
                width: fit_w * t.scale,
                height: fit_h * t.scale,
                rotation_deg: t.rotation_deg,
            });
        }

        Ok(RenderedFrame {
            geometry: FrameGeometry {
                area_rect,
                area_label: scene.area.label.clone(),
                logo: logo_placement,
            },
            output: CanvasFrame { pixmap },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixmap_from_rgba_premultiplies() {
        let image = RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 128]));
        let pixmap = pixmap_from_rgba(&image).unwrap();
        let px = pixmap.pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert!(px.red() <= 128);
    }

    #[test]
    fn test_empty_image_has_no_pixmap() {
        assert!(pixmap_from_rgba(&RgbaImage::new(0, 0)).is_none());
    }
}
