//! Placement model and coordinate mapping.
//!
//! Positions are stored normalized to the selected print area (0-100 on each
//! axis, 50/50 is the area center). Pixel coordinates are container space:
//! (0,0) at the top-left of the rendered product image, +Y down.
//!
//! ```text
//! AX = ax/100 * Wc            AW = aw/100 * Wc
//! LX = AX + posX/100 * AW     posX = clamp((px - AX) / AW * 100, 0, 100)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::areas::AreaRegistry;
use crate::catalog::PrintArea;
use crate::config::PlacementSettings;
use crate::error::ConfigurationError;

/// Size of the rendered product image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

impl ContainerSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Area rectangle in container pixels.
pub fn area_pixel_rect(area: &PrintArea, container: ContainerSize) -> PixelRect {
    PixelRect {
        x: area.x / 100.0 * container.width,
        y: area.y / 100.0 * container.height,
        width: area.width / 100.0 * container.width,
        height: area.height / 100.0 * container.height,
    }
}

/// Normalized area position to container pixels.
pub fn area_to_pixel(area: &PrintArea, container: ContainerSize, pos_x: f64, pos_y: f64) -> (f64, f64) {
    let rect = area_pixel_rect(area, container);
    (
        rect.x + pos_x / 100.0 * rect.width,
        rect.y + pos_y / 100.0 * rect.height,
    )
}

/// Container pixels to normalized area position, clamped to the area.
/// `None` when the area has no pixel extent (container not laid out yet).
pub fn pixel_to_area(area: &PrintArea, container: ContainerSize, px: f64, py: f64) -> Option<(f64, f64)> {
    let rect = area_pixel_rect(area, container);
    if !(rect.width > 0.0 && rect.height > 0.0) {
        return None;
    }
    let x = (px - rect.x) / rect.width * 100.0;
    let y = (py - rect.y) / rect.height * 100.0;
    if x.is_nan() || y.is_nan() {
        return None;
    }
    Some((x.clamp(0.0, 100.0), y.clamp(0.0, 100.0)))
}

/// Folds any angle into (-180, 180].
pub fn normalize_degrees(degrees: f64) -> f64 {
    let folded = degrees.rem_euclid(360.0);
    if folded > 180.0 {
        folded - 360.0
    } else {
        folded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl ScaleBounds {
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min, self.max)
    }
}

impl From<&PlacementSettings> for ScaleBounds {
    /// Unusable bounds (NaN, non-positive or inverted) fall back to the defaults.
    fn from(settings: &PlacementSettings) -> Self {
        let (min, max) = (settings.scale_min, settings.scale_max);
        if min > 0.0 && max >= min && max.is_finite() {
            return Self { min, max };
        }
        let defaults = PlacementSettings::default();
        tracing::warn!(min, max, "Invalid scale bounds, using defaults");
        Self {
            min: defaults.scale_min,
            max: defaults.scale_max,
        }
    }
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self::from(&PlacementSettings::default())
    }
}

/// Position, scale and rotation of the logo relative to its print area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementTransform {
    pub pos_x: f64,
    pub pos_y: f64,
    pub scale: f64,
    /// Degrees, positive is clockwise on screen.
    pub rotation_deg: f64,
}

impl Default for PlacementTransform {
    fn default() -> Self {
        Self {
            pos_x: 50.0,
            pos_y: 50.0,
            scale: 1.0,
            rotation_deg: 0.0,
        }
    }
}

impl fmt::Display for PlacementTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pos: ({:.1}%, {:.1}%) | Scale: {:.0}% | Rotation: {:.0}°",
            self.pos_x,
            self.pos_y,
            self.scale * 100.0,
            self.rotation_deg
        )
    }
}

/// Current transform plus the print area it is relative to.
#[derive(Debug, Clone)]
pub struct PlacementModel {
    area: PrintArea,
    transform: PlacementTransform,
    bounds: ScaleBounds,
}

impl PlacementModel {
    pub fn new(area: PrintArea, bounds: ScaleBounds) -> Self {
        Self {
            area,
            transform: PlacementTransform::default(),
            bounds,
        }
    }

    pub fn area(&self) -> &PrintArea {
        &self.area
    }

    pub fn transform(&self) -> PlacementTransform {
        self.transform
    }

    pub fn bounds(&self) -> ScaleBounds {
        self.bounds
    }

    /// Switches area and resets the transform. Unknown names leave the model untouched.
    pub fn set_area(&mut self, registry: &AreaRegistry, name: &str) -> Result<&PrintArea, ConfigurationError> {
        let area = registry.area(name)?.clone();
        self.area = area;
        self.transform = PlacementTransform::default();
        Ok(&self.area)
    }

    /// Adds `delta` to the scale, saturating at the bounds. Returns whether it changed.
    pub fn set_scale(&mut self, delta: f64) -> bool {
        if delta.is_nan() {
            return false;
        }
        self.apply_scale(self.transform.scale + delta)
    }

    /// Absolute scale (slider), clamped the same way.
    pub fn set_scale_absolute(&mut self, scale: f64) -> bool {
        if scale.is_nan() {
            return false;
        }
        self.apply_scale(scale)
    }

    fn apply_scale(&mut self, scale: f64) -> bool {
        let next = self.bounds.clamp(scale);
        let changed = next != self.transform.scale;
        self.transform.scale = next;
        changed
    }

    /// Adds `delta` degrees, normalized into (-180, 180].
    pub fn set_rotation(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        self.transform.rotation_deg = normalize_degrees(self.transform.rotation_deg + delta);
    }

    /// Clamped set; out-of-range coordinates saturate at the area edge.
    pub fn set_position(&mut self, x: f64, y: f64) {
        if !x.is_nan() {
            self.transform.pos_x = x.clamp(0.0, 100.0);
        }
        if !y.is_nan() {
            self.transform.pos_y = y.clamp(0.0, 100.0);
        }
    }

    pub fn reset(&mut self) {
        self.transform = PlacementTransform::default();
    }

    /// Logo center in container pixels.
    pub fn logo_center(&self, container: ContainerSize) -> (f64, f64) {
        area_to_pixel(&self.area, container, self.transform.pos_x, self.transform.pos_y)
    }

    pub fn position_from_pixel(&self, container: ContainerSize, px: f64, py: f64) -> Option<(f64, f64)> {
        pixel_to_area(&self.area, container, px, py)
    }

    /// Physical print size in centimeters, always derived from the scale.
    pub fn physical_size_cm(&self) -> (f64, f64) {
        (
            self.area.max_width_cm * self.transform.scale,
            self.area.max_height_cm * self.transform.scale,
        )
    }

    /// Side of the on-screen square the logo occupies.
    pub fn display_side(&self, base_display_size: f64) -> f64 {
        base_display_size * self.transform.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chest() -> PrintArea {
        PrintArea {
            name: "center_chest".into(),
            label: "Midt bryst".into(),
            x: 30.0,
            y: 20.0,
            width: 40.0,
            height: 40.0,
            max_width_cm: 25.0,
            max_height_cm: 20.0,
        }
    }

    fn model() -> PlacementModel {
        PlacementModel::new(chest(), ScaleBounds::default())
    }

    #[test]
    fn test_scale_bounds_reject_unusable_settings() {
        let mut settings = PlacementSettings::default();
        settings.scale_min = 0.5;
        settings.scale_max = 1.5;
        assert_eq!(ScaleBounds::from(&settings), ScaleBounds { min: 0.5, max: 1.5 });

        for (min, max) in [(2.0, 1.0), (f64::NAN, 2.0), (0.3, f64::NAN), (0.0, 2.0), (0.3, f64::INFINITY)] {
            settings.scale_min = min;
            settings.scale_max = max;
            assert_eq!(ScaleBounds::from(&settings), ScaleBounds::default());
        }
    }

    #[test]
    fn test_center_maps_to_expected_pixel() {
        let center = model().logo_center(ContainerSize::new(500.0, 500.0));
        assert_eq!(center, (250.0, 200.0));
    }

    #[test]
    fn test_inverse_mapping_round_trip() {
        let container = ContainerSize::new(640.0, 480.0);
        let mut m = model();
        m.set_position(12.5, 87.5);
        let (px, py) = m.logo_center(container);
        let (x, y) = m.position_from_pixel(container, px, py).unwrap();
        assert!((x - 12.5).abs() < 1e-9);
        assert!((y - 87.5).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_mapping_clamps_and_handles_empty_container() {
        let m = model();
        assert_eq!(
            m.position_from_pixel(ContainerSize::new(500.0, 500.0), -400.0, 9000.0),
            Some((0.0, 100.0))
        );
        assert_eq!(m.position_from_pixel(ContainerSize::new(0.0, 0.0), 10.0, 10.0), None);
    }

    #[test]
    fn test_position_saturates() {
        let mut m = model();
        m.set_position(-50.0, 150.0);
        assert_eq!((m.transform().pos_x, m.transform().pos_y), (0.0, 100.0));
        m.set_position(f64::NAN, 42.0);
        assert_eq!((m.transform().pos_x, m.transform().pos_y), (0.0, 42.0));
    }

    #[test]
    fn test_scale_saturates() {
        let mut m = model();
        assert!(m.set_scale(5.0));
        assert_eq!(m.transform().scale, 2.0);
        assert!(!m.set_scale(0.1));
        assert!(m.set_scale(-10.0));
        assert_eq!(m.transform().scale, 0.3);
    }

    #[test]
    fn test_rotation_normalization() {
        assert_eq!(normalize_degrees(180.0), 180.0);
        assert_eq!(normalize_degrees(-180.0), 180.0);
        assert_eq!(normalize_degrees(195.0), -165.0);
        assert_eq!(normalize_degrees(-15.0), -15.0);
        assert_eq!(normalize_degrees(720.0), 0.0);

        let mut m = model();
        for _ in 0..13 {
            m.set_rotation(15.0);
        }
        assert_eq!(m.transform().rotation_deg, -165.0);
    }

    #[test]
    fn test_physical_size_follows_scale() {
        let mut m = model();
        m.set_scale(0.5);
        assert_eq!(m.physical_size_cm(), (25.0 * 1.5, 20.0 * 1.5));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut m = model();
        m.set_position(10.0, 10.0);
        m.set_scale(0.4);
        m.set_rotation(30.0);
        m.reset();
        let once = m.transform();
        m.reset();
        assert_eq!(once, m.transform());
        assert_eq!(once, PlacementTransform::default());
    }
}
