//! Error taxonomy for the placement engine.
//!
//! Each component owns a narrow error enum; `EngineError` folds them together
//! for callers (the CLI) that surface everything through one channel.
//! None of these should ever cost the user their cart: the worst outcome of any
//! single failure is "no design on this line item" or "fallback pricing".

use thiserror::Error;

/// Upload and decode failures (user input and decode errors).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IngestError {
    #[error("Unsupported file type: {mime_type} (accepted: PNG, JPEG, SVG)")]
    UnsupportedType { mime_type: String },

    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("Image could not be decoded: {0}")]
    DecodeFailed(String),
}

/// Product configuration problems. These disable the customizer, never the product.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Product {product_id} defines no print areas")]
    NoAreasDefined { product_id: String },

    #[error("Unknown print area: {0}")]
    UnknownArea(String),

    #[error("Invalid print area '{name}': {reason}")]
    InvalidArea { name: String, reason: String },

    #[error("Print method '{0}' is not offered for this product")]
    UnsupportedMethod(String),

    #[error("Product {product_id} offers no print methods")]
    NoMethodsDefined { product_id: String },

    #[error("Unknown variant index: {0}")]
    UnknownVariant(usize),

    #[error("Size '{0}' is not offered for the selected variant")]
    UnknownSize(String),
}

/// Remote pricing failures. Always recovered through the fallback table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PricingError {
    #[error("Pricing service unavailable: {0}")]
    Unavailable(String),

    #[error("Pricing service timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Pricing service returned HTTP {0}")]
    Status(u16),

    #[error("Invalid pricing response: {0}")]
    InvalidResponse(String),
}

/// Call-sequencing violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("No logo is active")]
    NoLogoActive,

    #[error("No size selected")]
    NoSizeSelected,

    #[error("Price is not settled for the current design")]
    PricePending,

    #[error("Fingerprint failed: {0}")]
    Fingerprint(String),
}

/// Cart hand-off failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CartError {
    #[error("Cart service unavailable: {0}")]
    Unavailable(String),

    #[error("Cart service returned HTTP {0}")]
    Status(u16),

    #[error("Invalid cart response: {0}")]
    InvalidResponse(String),
}

/// Engine configuration file problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Value out of range for '{key}': {value}")]
    ValueOutOfRange { key: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] crate::render::RenderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
