//! Area Registry
//!
//! Read-only view over a product's print areas and decoration methods.

use crate::catalog::{PrintArea, PrintMethod, Product};
use crate::error::ConfigurationError;

#[derive(Debug, Clone)]
pub struct AreaRegistry {
    areas: Vec<PrintArea>,
    methods: Vec<PrintMethod>,
}

impl AreaRegistry {
    /// Builds the registry, rejecting products that cannot be customized.
    pub fn for_product(product: &Product) -> Result<Self, ConfigurationError> {
        if product.print_areas.is_empty() {
            return Err(ConfigurationError::NoAreasDefined {
                product_id: product.id.clone(),
            });
        }
        if product.print_methods.is_empty() {
            return Err(ConfigurationError::NoMethodsDefined {
                product_id: product.id.clone(),
            });
        }
        for area in &product.print_areas {
            area.check_geometry()
                .map_err(|reason| ConfigurationError::InvalidArea {
                    name: area.name.clone(),
                    reason,
                })?;
        }

        let mut methods: Vec<PrintMethod> = Vec::with_capacity(product.print_methods.len());
        for method in &product.print_methods {
            if !methods.contains(method) {
                methods.push(*method);
            }
        }

        Ok(Self {
            areas: product.print_areas.clone(),
            methods,
        })
    }

    pub fn areas(&self) -> &[PrintArea] {
        &self.areas
    }

    pub fn methods(&self) -> &[PrintMethod] {
        &self.methods
    }

    pub fn area(&self, name: &str) -> Result<&PrintArea, ConfigurationError> {
        self.areas
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ConfigurationError::UnknownArea(name.to_string()))
    }

    pub fn supports(&self, method: PrintMethod) -> bool {
        self.methods.contains(&method)
    }

    /// First listed area.
    pub fn select_default_area(&self) -> &PrintArea {
        &self.areas[0]
    }

    /// Embroidery when offered, otherwise the first listed method.
    pub fn select_default_method(&self) -> PrintMethod {
        if self.supports(PrintMethod::Embroidery) {
            PrintMethod::Embroidery
        } else {
            self.methods[0]
        }
    }
}
