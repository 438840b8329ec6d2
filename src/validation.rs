//! Validation System - Advisory Quality Rules
//!
//! Rules produce structured warnings. Nothing here blocks placement or
//! add-to-cart; the report is carried into the design descriptor as-is.

use serde::{Deserialize, Serialize};

use crate::config::ValidationSettings;
use crate::ingest::LogoAsset;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    LowResolution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityWarning {
    pub rule: String,
    pub kind: WarningKind,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

/// Intrinsic properties the rules look at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssetInput {
    pub width: u32,
    pub height: u32,
}

impl From<&LogoAsset> for AssetInput {
    fn from(asset: &LogoAsset) -> Self {
        Self {
            width: asset.pixel_width,
            height: asset.pixel_height,
        }
    }
}

/// Validation rule trait - produces warnings
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, input: &AssetInput) -> Vec<QualityWarning>;
}

pub struct ResolutionRule {
    pub min_width: u32,
    pub min_height: u32,
}

impl ValidationRule for ResolutionRule {
    fn name(&self) -> &'static str { "resolution" }

    fn validate(&self, input: &AssetInput) -> Vec<QualityWarning> {
        if input.width >= self.min_width && input.height >= self.min_height {
            return vec![];
        }

        vec![QualityWarning {
            rule: self.name().to_string(),
            kind: WarningKind::LowResolution,
            message: format!(
                "Logo has low resolution. For best results, use at least {}x{} pixels.",
                self.min_width, self.min_height
            ),
            expected: Some(format!("{}x{} minimum", self.min_width, self.min_height)),
            actual: Some(format!("{}x{}", input.width, input.height)),
            remediation: vec!["Upload a higher resolution or vector (SVG) logo".to_string()],
        }]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub warnings: Vec<QualityWarning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Human-readable warnings in rule order.
    pub fn messages(&self) -> Vec<String> {
        self.warnings.iter().map(|w| w.message.clone()).collect()
    }

    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// Validator runs every rule in order and concatenates the results
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new(settings: &ValidationSettings) -> Self {
        Self {
            rules: vec![Box::new(ResolutionRule {
                min_width: settings.min_width_px,
                min_height: settings.min_height_px,
            })],
        }
    }

    pub fn validate(&self, asset: &LogoAsset) -> ValidationReport {
        self.validate_input(&AssetInput::from(asset))
    }

    pub fn validate_input(&self, input: &AssetInput) -> ValidationReport {
        let warnings = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(input))
            .collect();
        ValidationReport { warnings }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&ValidationSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(width: u32, height: u32) -> ValidationReport {
        Validator::default().validate_input(&AssetInput { width, height })
    }

    #[test]
    fn test_resolution_boundary() {
        assert!(check(300, 300).is_clean());
        assert_eq!(check(299, 300).warnings.len(), 1);
        assert_eq!(check(300, 299).warnings.len(), 1);
        assert!(check(299, 299).has(WarningKind::LowResolution));
    }

    #[test]
    fn test_warning_carries_actual_size() {
        let report = check(120, 640);
        let warning = &report.warnings[0];
        assert_eq!(warning.rule, "resolution");
        assert_eq!(warning.actual.as_deref(), Some("120x640"));
        assert!(report.messages()[0].contains("300x300"));
    }

    #[test]
    fn test_configured_threshold() {
        let validator = Validator::new(&ValidationSettings {
            min_width_px: 600,
            min_height_px: 600,
        });
        assert!(!validator
            .validate_input(&AssetInput { width: 500, height: 900 })
            .is_clean());
    }
}
