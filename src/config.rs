//! Engine configuration.
//!
//! Every field has a production default; files only need to name overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

pub const SCALE_MIN: f64 = 0.3;
pub const SCALE_MAX: f64 = 2.0;
pub const SCALE_STEP: f64 = 0.1;
pub const ROTATION_STEP_DEG: f64 = 15.0;
pub const BASE_DISPLAY_SIZE_PX: f64 = 80.0;
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const MIN_RESOLUTION_PX: u32 = 300;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub placement: PlacementSettings,
    pub ingest: IngestSettings,
    pub validation: ValidationSettings,
    pub pricing: PricingSettings,
    pub cart: CartSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    pub scale_min: f64,
    pub scale_max: f64,
    pub scale_step: f64,
    pub rotation_step_deg: f64,
    pub base_display_size_px: f64,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            scale_min: SCALE_MIN,
            scale_max: SCALE_MAX,
            scale_step: SCALE_STEP,
            rotation_step_deg: ROTATION_STEP_DEG,
            base_display_size_px: BASE_DISPLAY_SIZE_PX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub max_upload_bytes: u64,
    /// Decoded `width * height` ceiling, guards the rasterizer.
    pub max_decoded_pixels: u64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            max_decoded_pixels: 40_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub min_width_px: u32,
    pub min_height_px: u32,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_width_px: MIN_RESOLUTION_PX,
            min_height_px: MIN_RESOLUTION_PX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    /// Full URL of the price calculation endpoint. `None` prices offline.
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub complexity: String,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 5_000,
            complexity: "normal".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSettings {
    /// API base URL; line items go to `{endpoint}/cart/{session}/add`.
    pub endpoint: Option<String>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.placement;
        if !(p.scale_min > 0.0) {
            return Err(out_of_range("placement.scale_min", p.scale_min));
        }
        if !(p.scale_max >= p.scale_min) {
            return Err(out_of_range("placement.scale_max", p.scale_max));
        }
        if !(p.scale_step > 0.0) {
            return Err(out_of_range("placement.scale_step", p.scale_step));
        }
        if !(p.base_display_size_px > 0.0) {
            return Err(out_of_range(
                "placement.base_display_size_px",
                p.base_display_size_px,
            ));
        }
        if self.ingest.max_upload_bytes == 0 {
            return Err(out_of_range("ingest.max_upload_bytes", 0));
        }
        if self.pricing.timeout_ms == 0 {
            return Err(out_of_range("pricing.timeout_ms", 0));
        }
        Ok(())
    }
}

fn out_of_range(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
}
