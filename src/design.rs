//! Design Serializer - Single Freeze Point
//!
//! `freeze` is the only way to obtain a `DesignDescriptor`. It is pure: the
//! same inputs always yield the same descriptor, fingerprint included.

use serde::{Deserialize, Serialize};

use crate::catalog::{PrintArea, PrintMethod};
use crate::error::StateError;
use crate::hashing::compute_fingerprint;
use crate::ingest::LogoAsset;
use crate::placement::PlacementTransform;
use crate::ENGINE_VERSION;

pub const DEFAULT_COMPLEXITY: &str = "normal";
pub const DEFAULT_VIEW: &str = "front";

/// Frozen snapshot of a customization, owned by the cart line item.
/// Fields are private; there is no way to mutate a descriptor after `freeze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDescriptor {
    logo_preview: String,
    placement: PlacementTransform,
    area_name: String,
    method: PrintMethod,
    width_cm: f64,
    height_cm: f64,
    warnings: Vec<String>,
    price_per_unit: f64,
    complexity: String,
    view: String,
    engine_version: String,
    fingerprint: String,
}

impl DesignDescriptor {
    pub fn logo_preview(&self) -> &str { &self.logo_preview }
    pub fn placement(&self) -> PlacementTransform { self.placement }
    pub fn area_name(&self) -> &str { &self.area_name }
    pub fn method(&self) -> PrintMethod { self.method }
    pub fn width_cm(&self) -> f64 { self.width_cm }
    pub fn height_cm(&self) -> f64 { self.height_cm }
    pub fn warnings(&self) -> &[String] { &self.warnings }
    pub fn price_per_unit(&self) -> f64 { self.price_per_unit }
    pub fn complexity(&self) -> &str { &self.complexity }
    pub fn view(&self) -> &str { &self.view }
    pub fn engine_version(&self) -> &str { &self.engine_version }
    pub fn fingerprint(&self) -> &str { &self.fingerprint }

    /// Recomputes the fingerprint over the content and compares.
    pub fn verify_fingerprint(&self) -> Result<bool, serde_json::Error> {
        let mut content = self.clone();
        content.fingerprint = String::new();
        Ok(compute_fingerprint(&content, &self.engine_version)? == self.fingerprint)
    }
}

pub struct DesignSerializer;

impl DesignSerializer {
    pub fn freeze(
        asset: Option<&LogoAsset>,
        placement: PlacementTransform,
        area: &PrintArea,
        method: PrintMethod,
        warnings: &[String],
        price_per_unit: f64,
    ) -> Result<DesignDescriptor, StateError> {
        let asset = asset.ok_or(StateError::NoLogoActive)?;

        let mut descriptor = DesignDescriptor {
            logo_preview: asset.handle.data_uri().to_string(),
            placement,
            area_name: area.name.clone(),
            method,
            width_cm: area.max_width_cm * placement.scale,
            height_cm: area.max_height_cm * placement.scale,
            warnings: warnings.to_vec(),
            price_per_unit,
            complexity: DEFAULT_COMPLEXITY.to_string(),
            view: DEFAULT_VIEW.to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            fingerprint: String::new(), // Computed after
        };

        descriptor.fingerprint = compute_fingerprint(&descriptor, ENGINE_VERSION)
            .map_err(|e| StateError::Fingerprint(e.to_string()))?;

        tracing::info!(
            area = %descriptor.area_name,
            method = %descriptor.method,
            width_cm = descriptor.width_cm,
            height_cm = descriptor.height_cm,
            price = descriptor.price_per_unit,
            "Design frozen"
        );
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RenderableHandle;
    use image::RgbaImage;

    fn logo() -> LogoAsset {
        LogoAsset {
            pixel_width: 400,
            pixel_height: 400,
            mime_type: "image/png".into(),
            byte_size: 1234,
            handle: RenderableHandle::new(RgbaImage::new(4, 4), "data:image/png;base64,AAAA"),
        }
    }

    fn back() -> PrintArea {
        PrintArea {
            name: "back".into(),
            label: "Rygg".into(),
            x: 25.0,
            y: 15.0,
            width: 50.0,
            height: 50.0,
            max_width_cm: 30.0,
            max_height_cm: 40.0,
        }
    }

    #[test]
    fn test_freeze_requires_logo() {
        let result = DesignSerializer::freeze(
            None,
            PlacementTransform::default(),
            &back(),
            PrintMethod::Print,
            &[],
            79.0,
        );
        assert_eq!(result, Err(StateError::NoLogoActive));
    }

    #[test]
    fn test_freeze_derives_physical_size() {
        let placement = PlacementTransform {
            scale: 0.5,
            ..PlacementTransform::default()
        };
        let d = DesignSerializer::freeze(Some(&logo()), placement, &back(), PrintMethod::Print, &[], 79.0)
            .unwrap();
        assert_eq!(d.width_cm(), 15.0);
        assert_eq!(d.height_cm(), 20.0);
        assert_eq!(d.area_name(), "back");
        assert_eq!(d.logo_preview(), "data:image/png;base64,AAAA");
        assert_eq!(d.complexity(), "normal");
        assert_eq!(d.view(), "front");
        assert_eq!(d.engine_version(), ENGINE_VERSION);
    }

    #[test]
    fn test_freeze_is_deterministic() {
        let warnings = vec!["low".to_string()];
        let freeze = || {
            DesignSerializer::freeze(
                Some(&logo()),
                PlacementTransform::default(),
                &back(),
                PrintMethod::Embroidery,
                &warnings,
                89.0,
            )
            .unwrap()
        };
        let (a, b) = (freeze(), freeze());
        assert_eq!(a, b);
        assert_eq!(a.fingerprint().len(), 64);
        assert!(a.fingerprint().chars().all(|ch| ch.is_ascii_hexdigit()));
        assert!(a.verify_fingerprint().unwrap());
    }

    #[test]
    fn test_fingerprint_tracks_placement() {
        let a = DesignSerializer::freeze(
            Some(&logo()),
            PlacementTransform::default(),
            &back(),
            PrintMethod::Print,
            &[],
            79.0,
        )
        .unwrap();
        let moved = PlacementTransform {
            pos_x: 10.0,
            ..PlacementTransform::default()
        };
        let b = DesignSerializer::freeze(Some(&logo()), moved, &back(), PrintMethod::Print, &[], 79.0).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_descriptor_survives_json() {
        let placement = PlacementTransform {
            pos_x: 10.957860598549463,
            pos_y: 73.1,
            scale: 0.7000000000000001,
            rotation_deg: -33.3,
        };
        let d = DesignSerializer::freeze(
            Some(&logo()),
            placement,
            &back(),
            PrintMethod::Print,
            &[],
            79.0,
        )
        .unwrap();
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains(r#""area_name":"back""#));
        assert!(json.contains(r#""method":"print""#));
        let back: DesignDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.placement().pos_x.to_bits(), placement.pos_x.to_bits());
        assert_eq!(back, d);
        assert!(back.verify_fingerprint().unwrap());
    }
}
