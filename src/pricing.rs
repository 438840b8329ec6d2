//! Decoration pricing.
//!
//! The remote service is authoritative; the fallback table is what the shop
//! commits to when the service cannot answer. Every request carries a sequence
//! number and only the response to the most recently issued request is applied.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::PrintMethod;
use crate::config::PricingSettings;
use crate::error::PricingError;

pub const EMBROIDERY_PRICE: f64 = 89.0;
pub const PRINT_PRICE_LARGE: f64 = 79.0;
pub const PRINT_PRICE_SMALL: f64 = 59.0;
pub const LARGE_PRINT_AREAS: [&str; 3] = ["full_back", "back", "center_chest"];

/// Deterministic per-unit price used when the service is unavailable.
pub fn fallback_price(method: PrintMethod, area_name: &str) -> f64 {
    match method {
        PrintMethod::Embroidery => EMBROIDERY_PRICE,
        PrintMethod::Print if LARGE_PRINT_AREAS.contains(&area_name) => PRINT_PRICE_LARGE,
        PrintMethod::Print => PRINT_PRICE_SMALL,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRequest {
    pub method: PrintMethod,
    pub area_name: String,
    pub width_cm: f64,
    pub height_cm: f64,
    pub quantity: u32,
    pub complexity: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PriceResponse {
    price_per_item: f64,
}

#[async_trait]
pub trait PricingService: Send + Sync {
    async fn price(&self, request: &PriceRequest) -> Result<f64, PricingError>;
}

/// Client for `POST /pricing/calculate`.
pub struct HttpPricingService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPricingService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PricingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PricingError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl PricingService for HttpPricingService {
    async fn price(&self, request: &PriceRequest) -> Result<f64, PricingError> {
        let query = [
            ("print_method", request.method.as_str().to_string()),
            ("print_area", request.area_name.clone()),
            ("width_cm", format!("{:.2}", request.width_cm)),
            ("height_cm", format!("{:.2}", request.height_cm)),
            ("quantity", request.quantity.to_string()),
            ("complexity", request.complexity.clone()),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| PricingError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PricingError::Status(status.as_u16()));
        }

        let body: PriceResponse = response
            .json()
            .await
            .map_err(|e| PricingError::InvalidResponse(e.to_string()))?;

        if !body.price_per_item.is_finite() || body.price_per_item < 0.0 {
            return Err(PricingError::InvalidResponse(format!(
                "price_per_item = {}",
                body.price_per_item
            )));
        }
        Ok(body.price_per_item)
    }
}

/// Service stand-in when no endpoint is configured; every quote falls back.
pub struct OfflinePricing;

#[async_trait]
impl PricingService for OfflinePricing {
    async fn price(&self, _request: &PriceRequest) -> Result<f64, PricingError> {
        Err(PricingError::Unavailable("no pricing endpoint configured".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Service,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub seq: u64,
    pub price_per_unit: f64,
    pub source: PriceSource,
    pub request: PriceRequest,
}

/// An issued, not yet resolved pricing request.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTicket {
    pub seq: u64,
    pub request: PriceRequest,
}

pub struct PricingOracle {
    service: Arc<dyn PricingService>,
    timeout: Duration,
    issued: u64,
    current: Option<PriceQuote>,
}

impl PricingOracle {
    pub fn new(service: Arc<dyn PricingService>, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            issued: 0,
            current: None,
        }
    }

    /// HTTP-backed oracle when an endpoint is configured, offline otherwise.
    pub fn from_settings(settings: &PricingSettings) -> Result<Self, PricingError> {
        let timeout = Duration::from_millis(settings.timeout_ms);
        let service: Arc<dyn PricingService> = match &settings.endpoint {
            Some(endpoint) => Arc::new(HttpPricingService::new(endpoint.clone(), timeout)?),
            None => Arc::new(OfflinePricing),
        };
        Ok(Self::new(service, timeout))
    }

    pub fn offline() -> Self {
        Self::new(Arc::new(OfflinePricing), Duration::from_millis(PricingSettings::default().timeout_ms))
    }

    /// Issues a new request; anything issued earlier becomes stale.
    pub fn issue(&mut self, request: PriceRequest) -> PriceTicket {
        self.issued += 1;
        PriceTicket {
            seq: self.issued,
            request,
        }
    }

    pub fn latest_seq(&self) -> u64 {
        self.issued
    }

    /// Marks every in-flight request stale and forgets the current price.
    pub fn invalidate(&mut self) {
        self.issued += 1;
        self.current = None;
    }

    /// Resolves a ticket. Never fails: service errors resolve to the fallback table.
    /// The future owns everything it needs, so the oracle stays free for new requests.
    pub fn fetch(&self, ticket: PriceTicket) -> impl Future<Output = PriceQuote> + Send + 'static {
        let service = Arc::clone(&self.service);
        let timeout = self.timeout;
        async move {
            let outcome = match tokio::time::timeout(timeout, service.price(&ticket.request)).await {
                Ok(result) => result,
                Err(_) => Err(PricingError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };
            match outcome {
                Ok(price) => PriceQuote {
                    seq: ticket.seq,
                    price_per_unit: price,
                    source: PriceSource::Service,
                    request: ticket.request,
                },
                Err(err) => {
                    let price = fallback_price(ticket.request.method, &ticket.request.area_name);
                    tracing::warn!(seq = ticket.seq, error = %err, price, "Pricing service failed, using fallback table");
                    PriceQuote {
                        seq: ticket.seq,
                        price_per_unit: price,
                        source: PriceSource::Fallback,
                        request: ticket.request,
                    }
                }
            }
        }
    }

    /// Applies a resolved quote if it answers the latest request. Returns whether it was applied.
    pub fn apply(&mut self, quote: PriceQuote) -> bool {
        if quote.seq != self.issued {
            tracing::debug!(seq = quote.seq, latest = self.issued, "Discarding stale price response");
            return false;
        }
        self.current = Some(quote);
        true
    }

    /// Issue, resolve and apply in one step.
    pub async fn compute_price(&mut self, request: PriceRequest) -> f64 {
        let ticket = self.issue(request);
        let quote = self.fetch(ticket).await;
        let price = quote.price_per_unit;
        self.apply(quote);
        price
    }

    /// True when the applied quote answers the latest issued request.
    pub fn is_settled(&self) -> bool {
        self.current.as_ref().map_or(false, |q| q.seq == self.issued)
    }

    pub fn current(&self) -> Option<&PriceQuote> {
        self.current.as_ref()
    }

    pub fn price_per_unit(&self) -> f64 {
        self.current.as_ref().map_or(0.0, |q| q.price_per_unit)
    }
}
