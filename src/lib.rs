//! PrintPlace Core - Logo Placement Engine
//!
//! Takes an uploaded logo, places it inside a product's print area, checks it
//! against quality rules, prices the decoration and freezes the result into a
//! design descriptor for the cart.
//!
//! # Ground Rules
//! 1. Areas Are Contracts: placement is always relative to a named print area
//! 2. Warnings Advise, Never Block
//! 3. Price Follows Footprint: method, area, scale and quantity only
//! 4. Latest Request Wins
//! 5. Freezing Is Deterministic

pub mod areas;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod design;
pub mod drag;
pub mod error;
pub mod hashing;
pub mod ingest;
pub mod placement;
pub mod pricing;
pub mod render;
pub mod session;
pub mod validation;

pub use areas::AreaRegistry;
pub use cart::{CartLineItem, CartService, CartSummary, HttpCartService};
pub use catalog::{CatalogRegistry, PrintArea, PrintMethod, Product, ProductVariant};
pub use config::EngineConfig;
pub use design::{DesignDescriptor, DesignSerializer};
pub use drag::{DragController, DragState};
pub use error::{
    CartError, ConfigError, ConfigurationError, EngineError, EngineResult, IngestError, PricingError,
    StateError,
};
pub use hashing::{canonical_json, compute_fingerprint};
pub use ingest::{ImageIngestor, LogoAsset, LogoUpload};
pub use placement::{ContainerSize, PlacementModel, PlacementTransform};
pub use pricing::{fallback_price, PriceQuote, PriceRequest, PricingOracle, PricingService};
pub use render::{CanvasRenderer, OverlayRenderer, PlacementRenderer, RenderScene};
pub use session::{CustomizationSession, PlacementSnapshot};
pub use validation::{ValidationReport, ValidationRule, Validator};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
