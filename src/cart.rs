//! Cart hand-off.
//!
//! The engine produces line items and posts them; it never persists a cart.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::design::DesignDescriptor;
use crate::error::CartError;

/// One product line, optionally decorated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product_id: String,
    pub variant_color: String,
    pub size: String,
    pub quantity: u32,
    pub design: Option<DesignDescriptor>,
    pub base_price: f64,
    pub design_price: f64,
    pub total_price: f64,
}

impl CartLineItem {
    pub fn new(
        product_id: impl Into<String>,
        variant_color: impl Into<String>,
        size: impl Into<String>,
        quantity: u32,
        base_price: f64,
        design: Option<DesignDescriptor>,
    ) -> Self {
        let design_price = design.as_ref().map_or(0.0, DesignDescriptor::price_per_unit);
        Self {
            product_id: product_id.into(),
            variant_color: variant_color.into(),
            size: size.into(),
            quantity,
            design,
            base_price,
            design_price,
            total_price: line_total(base_price, design_price, quantity),
        }
    }

    pub fn to_request(&self) -> AddToCartRequest {
        AddToCartRequest {
            product_id: self.product_id.clone(),
            variant_color: self.variant_color.clone(),
            size: self.size.clone(),
            quantity: self.quantity,
            design: self.design.as_ref().map(DesignPayload::from),
        }
    }
}

pub fn line_total(base_price: f64, design_price: f64, quantity: u32) -> f64 {
    (base_price + design_price) * f64::from(quantity)
}

/// Flat design shape the cart service accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignPayload {
    pub logo_url: String,
    pub logo_preview: String,
    pub position_x: f64,
    pub position_y: f64,
    pub scale: f64,
    pub rotation: f64,
    pub view: String,
    pub print_area: String,
    pub print_method: String,
    pub width_cm: f64,
    pub height_cm: f64,
    pub colors: Vec<String>,
    pub complexity: String,
    pub warnings: Vec<String>,
}

impl From<&DesignDescriptor> for DesignPayload {
    fn from(design: &DesignDescriptor) -> Self {
        let placement = design.placement();
        Self {
            logo_url: design.logo_preview().to_string(),
            logo_preview: design.logo_preview().to_string(),
            position_x: placement.pos_x,
            position_y: placement.pos_y,
            scale: placement.scale,
            rotation: placement.rotation_deg,
            view: design.view().to_string(),
            print_area: design.area_name().to_string(),
            print_method: design.method().as_str().to_string(),
            width_cm: design.width_cm(),
            height_cm: design.height_cm(),
            colors: Vec::new(),
            complexity: design.complexity().to_string(),
            warnings: design.warnings().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: String,
    pub variant_color: String,
    pub size: String,
    pub quantity: u32,
    pub design: Option<DesignPayload>,
}

/// Cart totals as returned after an add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub session_id: String,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub design_total: f64,
    #[serde(default)]
    pub shipping: f64,
    pub total: f64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait CartService: Send + Sync {
    async fn add(&self, item: &CartLineItem) -> Result<CartSummary, CartError>;
}

/// Client for `POST {endpoint}/cart/{session}/add`.
pub struct HttpCartService {
    client: reqwest::Client,
    endpoint: String,
    session_id: Uuid,
}

impl HttpCartService {
    pub fn new(endpoint: impl Into<String>, session_id: Uuid, timeout: Duration) -> Result<Self, CartError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CartError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            session_id,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    fn add_url(&self) -> String {
        format!("{}/cart/{}/add", self.endpoint, self.session_id)
    }
}

#[async_trait]
impl CartService for HttpCartService {
    async fn add(&self, item: &CartLineItem) -> Result<CartSummary, CartError> {
        let response = self
            .client
            .post(self.add_url())
            .json(&item.to_request())
            .send()
            .await
            .map_err(|e| CartError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CartError::Status(status.as_u16()));
        }

        let summary: CartSummary = response
            .json()
            .await
            .map_err(|e| CartError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            session = %self.session_id,
            product = %item.product_id,
            quantity = item.quantity,
            total = summary.total,
            "Line item added to cart"
        );
        Ok(summary)
    }
}
