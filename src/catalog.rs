//! Catalog Model - Products as Placement Contracts
//!
//! Mirrors the product-service document shape. The engine never stores
//! products itself; `CatalogRegistry` is a local view over product documents.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub type ProductId = String;

/// Decoration technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintMethod {
    Print,
    Embroidery,
}

impl PrintMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Embroidery => "embroidery",
        }
    }
}

impl fmt::Display for PrintMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrintMethod {
    type Err = crate::error::ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "print" => Ok(Self::Print),
            "embroidery" => Ok(Self::Embroidery),
            other => Err(crate::error::ConfigurationError::UnsupportedMethod(
                other.to_string(),
            )),
        }
    }
}

/// A designer-defined rectangle on the product image, in percent of the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintArea {
    pub name: String,
    #[serde(alias = "name_no")]
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Physical bounds at scale 1.0.
    pub max_width_cm: f64,
    pub max_height_cm: f64,
}

impl PrintArea {
    /// Checks the percent-rectangle invariants. Returns the first broken one.
    pub fn check_geometry(&self) -> Result<(), String> {
        let fields = [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ];
        for (field, value) in fields {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(format!("{field} must be within 0-100, got {value}"));
            }
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err("width and height must be positive".to_string());
        }
        if self.x + self.width > 100.0 {
            return Err(format!("x + width exceeds 100 ({})", self.x + self.width));
        }
        if self.y + self.height > 100.0 {
            return Err(format!("y + height exceeds 100 ({})", self.y + self.height));
        }
        if !(self.max_width_cm > 0.0 && self.max_height_cm > 0.0) {
            return Err("physical size must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub color: String,
    pub color_hex: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
}

impl ProductVariant {
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub base_price: f64,
    #[serde(default = "default_min_quantity")]
    pub min_quantity: u32,
    #[serde(default = "default_delivery_days")]
    pub delivery_days: u32,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub print_areas: Vec<PrintArea>,
    #[serde(default)]
    pub print_methods: Vec<PrintMethod>,
}

fn default_min_quantity() -> u32 { 1 }
fn default_delivery_days() -> u32 { 5 }

impl Product {
    pub fn variant(&self, index: usize) -> Option<&ProductVariant> {
        self.variants.get(index)
    }
}

/// Product registry - loads and indexes product documents
pub struct CatalogRegistry {
    products: HashMap<ProductId, Product>,
    slugs: HashMap<String, ProductId>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self {
            products: HashMap::new(),
            slugs: HashMap::new(),
        }
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().map_or(false, |e| e == "json") {
                    match Self::load_file(&path) {
                        Ok(product) => registry.register(product),
                        Err(reason) => {
                            tracing::warn!(path = %path.display(), %reason, "Skipping product document");
                        }
                    }
                }
            }
        }
        Ok(registry)
    }

    pub fn load_file(path: &Path) -> Result<Product, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str::<Product>(&content).map_err(|e| e.to_string())
    }

    /// Looks a product up by id, then by slug.
    pub fn get(&self, key: &str) -> Option<&Product> {
        self.products
            .get(key)
            .or_else(|| self.slugs.get(key).and_then(|id| self.products.get(id)))
    }

    pub fn list(&self) -> Vec<&Product> {
        let mut products: Vec<_> = self.products.values().collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        products
    }

    pub fn register(&mut self, product: Product) {
        if !product.slug.is_empty() {
            self.slugs.insert(product.slug.clone(), product.id.clone());
        }
        self.products.insert(product.id.clone(), product);
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::new()
    }
}
