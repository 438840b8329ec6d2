//! Customization Session - One Product, One Logo, One Area
//!
//! Created when the shopper enters a product's customization flow and dropped
//! when they leave it or finish adding to cart. The session is the single
//! writer of the logo, the placement and the pricing state; observers follow
//! along through `subscribe`.
//!
//! Pricing is requested on changes to method, area, scale or quantity, never
//! on position or rotation. Requests are issued synchronously and resolved
//! through `refresh_price` (or `take_price_fetch` + `apply_quote` when the
//! caller drives the future itself); only the latest issued request is applied.

use std::future::Future;

use image::RgbaImage;
use serde::Serialize;
use tokio::sync::watch;

use crate::areas::AreaRegistry;
use crate::cart::{CartLineItem, CartService, CartSummary};
use crate::catalog::{PrintArea, PrintMethod, Product, ProductVariant};
use crate::config::{EngineConfig, PlacementSettings};
use crate::design::{DesignDescriptor, DesignSerializer};
use crate::drag::DragController;
use crate::error::{ConfigurationError, EngineError, StateError};
use crate::ingest::{ImageIngestor, LogoAsset, LogoUpload};
use crate::placement::{ContainerSize, PlacementModel, PlacementTransform, ScaleBounds};
use crate::pricing::{PriceQuote, PriceRequest, PriceTicket, PricingOracle};
use crate::render::{PlacementRenderer, ProductImage, RenderScene, RenderedFrame};
use crate::validation::{ValidationReport, Validator};

/// Observable session state, published after every committed mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacementSnapshot {
    pub revision: u64,
    pub customizable: bool,
    pub area_name: Option<String>,
    pub method: Option<PrintMethod>,
    pub transform: Option<PlacementTransform>,
    pub logo_active: bool,
    pub dragging: bool,
    pub warnings: Vec<String>,
    pub price_per_unit: f64,
    pub variant_index: usize,
    pub size: Option<String>,
    pub quantity: u32,
}

struct Customizer {
    registry: AreaRegistry,
    model: PlacementModel,
    drag: DragController,
    method: PrintMethod,
    logo: Option<LogoAsset>,
    report: ValidationReport,
}

pub struct CustomizationSession {
    product: Product,
    /// `Err` when the product cannot be customized; it stays purchasable.
    customizer: Result<Customizer, ConfigurationError>,
    settings: PlacementSettings,
    complexity: String,
    variant_index: usize,
    size: Option<String>,
    quantity: u32,
    container: ContainerSize,
    ingestor: ImageIngestor,
    validator: Validator,
    pricing: PricingOracle,
    pending: Option<PriceTicket>,
    revision: u64,
    notifier: watch::Sender<PlacementSnapshot>,
}

impl CustomizationSession {
    /// Opens a session on `product`. The container starts empty (0x0) until
    /// the caller reports the laid-out size through `set_container`.
    pub fn open(product: Product, config: &EngineConfig, pricing: PricingOracle) -> Self {
        let settings = config.placement.clone();

        let customizer = AreaRegistry::for_product(&product).map(|registry| {
            let area = registry.select_default_area().clone();
            let method = registry.select_default_method();
            Customizer {
                model: PlacementModel::new(area, ScaleBounds::from(&settings)),
                drag: DragController::new(settings.base_display_size_px),
                method,
                logo: None,
                report: ValidationReport::default(),
                registry,
            }
        });
        if let Err(reason) = &customizer {
            tracing::warn!(product = %product.id, %reason, "Customizer disabled for product");
        }

        let size = product
            .variants
            .first()
            .and_then(|v| v.sizes.first().cloned());
        let quantity = product.min_quantity.max(1);
        let (notifier, _) = watch::channel(PlacementSnapshot::default());

        let session = Self {
            product,
            customizer,
            settings,
            complexity: config.pricing.complexity.clone(),
            variant_index: 0,
            size,
            quantity,
            container: ContainerSize::new(0.0, 0.0),
            ingestor: ImageIngestor::new(&config.ingest),
            validator: Validator::new(&config.validation),
            pricing,
            pending: None,
            revision: 0,
            notifier,
        };
        session.notifier.send_replace(session.snapshot());
        session
    }

    // ---- observation ----

    pub fn subscribe(&self) -> watch::Receiver<PlacementSnapshot> {
        self.notifier.subscribe()
    }

    pub fn snapshot(&self) -> PlacementSnapshot {
        let c = self.customizer.as_ref().ok();
        PlacementSnapshot {
            revision: self.revision,
            customizable: c.is_some(),
            area_name: c.map(|c| c.model.area().name.clone()),
            method: c.map(|c| c.method),
            transform: c.map(|c| c.model.transform()),
            logo_active: c.map_or(false, |c| c.logo.is_some()),
            dragging: c.map_or(false, |c| c.drag.is_dragging()),
            warnings: c.map(|c| c.report.messages()).unwrap_or_default(),
            price_per_unit: self.price_per_unit(),
            variant_index: self.variant_index,
            size: self.size.clone(),
            quantity: self.quantity,
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = self.snapshot();
        self.notifier.send_replace(snapshot);
    }

    // ---- read access ----

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn is_customizable(&self) -> bool {
        self.customizer.is_ok()
    }

    pub fn disabled_reason(&self) -> Option<&ConfigurationError> {
        self.customizer.as_ref().err()
    }

    pub fn areas(&self) -> Option<&AreaRegistry> {
        self.customizer.as_ref().ok().map(|c| &c.registry)
    }

    pub fn area(&self) -> Option<&PrintArea> {
        self.customizer.as_ref().ok().map(|c| c.model.area())
    }

    pub fn method(&self) -> Option<PrintMethod> {
        self.customizer.as_ref().ok().map(|c| c.method)
    }

    pub fn transform(&self) -> Option<PlacementTransform> {
        self.customizer.as_ref().ok().map(|c| c.model.transform())
    }

    pub fn logo(&self) -> Option<&LogoAsset> {
        self.customizer.as_ref().ok().and_then(|c| c.logo.as_ref())
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        self.customizer.as_ref().ok().map(|c| &c.report)
    }

    pub fn is_dragging(&self) -> bool {
        self.customizer
            .as_ref()
            .map_or(false, |c| c.drag.is_dragging())
    }

    pub fn variant(&self) -> Option<&ProductVariant> {
        self.product.variant(self.variant_index)
    }

    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn container(&self) -> ContainerSize {
        self.container
    }

    pub fn pricing(&self) -> &PricingOracle {
        &self.pricing
    }

    /// Applied per-unit decoration price; 0 while no logo is active.
    pub fn price_per_unit(&self) -> f64 {
        if self.logo().is_none() {
            return 0.0;
        }
        self.pricing.price_per_unit()
    }

    /// `(base + decoration) * quantity` for the current selection.
    pub fn line_total(&self) -> f64 {
        crate::cart::line_total(self.product.base_price, self.price_per_unit(), self.quantity)
    }

    fn customizer_mut(&mut self) -> Result<&mut Customizer, ConfigurationError> {
        self.customizer.as_mut().map_err(|reason| reason.clone())
    }

    // ---- logo ----

    /// Ingests and validates a new logo. On any error the previous logo,
    /// placement and warnings are left exactly as they were.
    pub async fn upload_logo(&mut self, upload: LogoUpload) -> Result<ValidationReport, EngineError> {
        if let Err(reason) = &self.customizer {
            return Err(reason.clone().into());
        }
        let asset = self.ingestor.ingest(upload).await?;
        let report = self.validator.validate(&asset);
        for warning in &report.warnings {
            tracing::info!(rule = %warning.rule, actual = ?warning.actual, "Logo quality warning");
        }

        let c = self.customizer_mut()?;
        c.logo = Some(asset);
        c.model.reset();
        c.drag.pointer_up();
        c.report = report.clone();

        self.reprice();
        self.publish();
        Ok(report)
    }

    /// Drops the logo, its warnings and the placement. Returns whether a logo was active.
    pub fn remove_logo(&mut self) -> bool {
        let Ok(c) = self.customizer.as_mut() else {
            return false;
        };
        let had_logo = c.logo.take().is_some();
        c.model.reset();
        c.drag.pointer_up();
        c.report = ValidationReport::default();

        self.reprice();
        self.publish();
        had_logo
    }

    // ---- area and method ----

    pub fn set_area(&mut self, name: &str) -> Result<(), ConfigurationError> {
        let c = self.customizer_mut()?;
        c.model.set_area(&c.registry, name)?;
        c.drag.pointer_up();
        tracing::debug!(area = name, "Print area selected");

        self.reprice();
        self.publish();
        Ok(())
    }

    pub fn set_method(&mut self, method: PrintMethod) -> Result<(), ConfigurationError> {
        let c = self.customizer_mut()?;
        if !c.registry.supports(method) {
            return Err(ConfigurationError::UnsupportedMethod(method.to_string()));
        }
        if c.method == method {
            return Ok(());
        }
        c.method = method;
        tracing::debug!(%method, "Print method selected");

        self.reprice();
        self.publish();
        Ok(())
    }

    // ---- transform ----

    pub fn set_scale(&mut self, delta: f64) -> bool {
        self.change_scale(|model| model.set_scale(delta))
    }

    pub fn set_scale_absolute(&mut self, scale: f64) -> bool {
        self.change_scale(|model| model.set_scale_absolute(scale))
    }

    pub fn scale_up(&mut self) -> bool {
        let step = self.settings.scale_step;
        self.set_scale(step)
    }

    pub fn scale_down(&mut self) -> bool {
        let step = self.settings.scale_step;
        self.set_scale(-step)
    }

    fn change_scale(&mut self, change: impl FnOnce(&mut PlacementModel) -> bool) -> bool {
        let Ok(c) = self.customizer.as_mut() else {
            return false;
        };
        if !change(&mut c.model) {
            return false;
        }
        self.reprice();
        self.publish();
        true
    }

    pub fn set_rotation(&mut self, delta: f64) -> bool {
        self.change_placement(|model| model.set_rotation(delta))
    }

    pub fn rotate_clockwise(&mut self) -> bool {
        let step = self.settings.rotation_step_deg;
        self.set_rotation(step)
    }

    pub fn rotate_counter_clockwise(&mut self) -> bool {
        let step = self.settings.rotation_step_deg;
        self.set_rotation(-step)
    }

    pub fn set_position(&mut self, x: f64, y: f64) -> bool {
        self.change_placement(|model| model.set_position(x, y))
    }

    /// Back to `{50, 50, 1, 0}`. Reprices only if the scale moved.
    pub fn reset(&mut self) -> bool {
        let Ok(c) = self.customizer.as_mut() else {
            return false;
        };
        let before = c.model.transform();
        let was_dragging = c.drag.is_dragging();
        c.drag.pointer_up();
        c.model.reset();
        let after = c.model.transform();
        if before == after {
            if was_dragging {
                self.publish();
            }
            return false;
        }
        if before.scale != after.scale {
            self.reprice();
        }
        self.publish();
        true
    }

    /// Position and rotation changes. These never reprice.
    fn change_placement(&mut self, change: impl FnOnce(&mut PlacementModel)) -> bool {
        let Ok(c) = self.customizer.as_mut() else {
            return false;
        };
        let before = c.model.transform();
        change(&mut c.model);
        if before == c.model.transform() {
            return false;
        }
        self.publish();
        true
    }

    // ---- pointer ----

    pub fn set_container(&mut self, container: ContainerSize) {
        if self.container != container {
            self.container = container;
            self.publish();
        }
    }

    pub fn pointer_down(&mut self, px: f64, py: f64) -> bool {
        let container = self.container;
        let Ok(c) = self.customizer.as_mut() else {
            return false;
        };
        let started = c.drag.pointer_down(&c.model, c.logo.is_some(), container, px, py);
        if started {
            self.publish();
        }
        started
    }

    pub fn pointer_move(&mut self, px: f64, py: f64) -> bool {
        let container = self.container;
        let Ok(c) = self.customizer.as_mut() else {
            return false;
        };
        let moved = c.drag.pointer_move(&mut c.model, container, px, py);
        if moved {
            self.publish();
        }
        moved
    }

    pub fn pointer_up(&mut self) {
        self.end_drag(DragController::pointer_up);
    }

    pub fn pointer_leave(&mut self) {
        self.end_drag(DragController::pointer_leave);
    }

    fn end_drag(&mut self, end: fn(&mut DragController)) {
        let Ok(c) = self.customizer.as_mut() else {
            return;
        };
        let was_dragging = c.drag.is_dragging();
        end(&mut c.drag);
        if was_dragging {
            self.publish();
        }
    }

    // ---- product options ----

    /// Keeps the selected size if the new variant offers it, otherwise picks its first size.
    pub fn select_variant(&mut self, index: usize) -> Result<(), ConfigurationError> {
        let variant = self
            .product
            .variant(index)
            .ok_or(ConfigurationError::UnknownVariant(index))?;
        let keep_size = self
            .size
            .as_ref()
            .map_or(false, |size| variant.sizes.contains(size));
        if !keep_size {
            self.size = variant.sizes.first().cloned();
        }
        self.variant_index = index;
        self.publish();
        Ok(())
    }

    pub fn select_size(&mut self, size: &str) -> Result<(), ConfigurationError> {
        let offered = self
            .variant()
            .map_or(false, |v| v.sizes.iter().any(|s| s == size));
        if !offered {
            return Err(ConfigurationError::UnknownSize(size.to_string()));
        }
        self.size = Some(size.to_string());
        self.publish();
        Ok(())
    }

    /// Clamps to the product minimum (and at least 1). Returns the stored quantity.
    pub fn set_quantity(&mut self, quantity: u32) -> u32 {
        let clamped = quantity.max(self.product.min_quantity).max(1);
        if clamped != self.quantity {
            self.quantity = clamped;
            self.reprice();
            self.publish();
        }
        clamped
    }

    // ---- pricing ----

    /// What the pricing service would be asked right now; `None` without a logo.
    pub fn price_request(&self) -> Option<PriceRequest> {
        let c = self.customizer.as_ref().ok()?;
        c.logo.as_ref()?;
        let (width_cm, height_cm) = c.model.physical_size_cm();
        Some(PriceRequest {
            method: c.method,
            area_name: c.model.area().name.clone(),
            width_cm,
            height_cm,
            quantity: self.quantity,
            complexity: self.complexity.clone(),
        })
    }

    fn reprice(&mut self) {
        match self.price_request() {
            Some(request) => {
                let ticket = self.pricing.issue(request);
                tracing::debug!(seq = ticket.seq, "Price requested");
                self.pending = Some(ticket);
            }
            None => {
                self.pricing.invalidate();
                self.pending = None;
            }
        }
    }

    pub fn has_pending_price(&self) -> bool {
        self.pending.is_some()
    }

    /// Detaches the pending request as a future that does not borrow the
    /// session. Feed its output to `apply_quote`.
    pub fn take_price_fetch(&mut self) -> Option<impl Future<Output = PriceQuote> + Send + 'static> {
        let ticket = self.pending.take()?;
        Some(self.pricing.fetch(ticket))
    }

    /// Applies a quote if it answers the latest request. Stale quotes are dropped.
    pub fn apply_quote(&mut self, quote: PriceQuote) -> bool {
        let applied = self.pricing.apply(quote);
        if applied {
            self.publish();
        }
        applied
    }

    /// Resolves the pending request, if any, and returns the applied price.
    pub async fn refresh_price(&mut self) -> f64 {
        if let Some(fetch) = self.take_price_fetch() {
            let quote = fetch.await;
            self.apply_quote(quote);
        }
        self.price_per_unit()
    }

    // ---- rendering ----

    pub fn scene<'a>(&'a self, product_bitmap: Option<&'a RgbaImage>) -> Result<RenderScene<'a>, ConfigurationError> {
        let c = self.customizer.as_ref().map_err(|reason| reason.clone())?;
        let source = self.variant().and_then(ProductVariant::primary_image);
        let product_image = match (source, product_bitmap) {
            (None, None) => None,
            (source, bitmap) => Some(ProductImage {
                source: source.unwrap_or_default(),
                bitmap,
            }),
        };
        Ok(RenderScene {
            container: self.container,
            area: c.model.area(),
            transform: c.model.transform(),
            logo: c.logo.as_ref(),
            product_image,
            base_display_size: self.settings.base_display_size_px,
        })
    }

    pub fn render<R: PlacementRenderer>(
        &self,
        renderer: &R,
        product_bitmap: Option<&RgbaImage>,
    ) -> Result<RenderedFrame<R::Output>, EngineError> {
        let scene = self.scene(product_bitmap)?;
        Ok(renderer.render(&scene)?)
    }

    // ---- hand-off ----

    /// Fails with `PricePending` until the latest price request is applied.
    pub fn freeze(&self) -> Result<DesignDescriptor, StateError> {
        let c = self
            .customizer
            .as_ref()
            .map_err(|_| StateError::NoLogoActive)?;
        if c.logo.is_some() && !self.pricing.is_settled() {
            return Err(StateError::PricePending);
        }
        DesignSerializer::freeze(
            c.logo.as_ref(),
            c.model.transform(),
            c.model.area(),
            c.method,
            &c.report.messages(),
            self.price_per_unit(),
        )
    }

    /// Builds the line item with the applied price, which must answer the
    /// latest request. A session without a logo yields a plain line.
    pub fn line_item(&self) -> Result<CartLineItem, StateError> {
        let size = self.size.clone().ok_or(StateError::NoSizeSelected)?;
        let design = match self.logo() {
            Some(_) => Some(self.freeze()?),
            None => None,
        };
        let color = self.variant().map(|v| v.color.clone()).unwrap_or_default();
        Ok(CartLineItem::new(
            self.product.id.clone(),
            color,
            size,
            self.quantity,
            self.product.base_price,
            design,
        ))
    }

    /// Settles pricing, freezes the design and posts the line item.
    pub async fn add_to_cart(&mut self, cart: &dyn CartService) -> Result<CartSummary, EngineError> {
        self.refresh_price().await;
        let item = self.line_item()?;
        Ok(cart.add(&item).await?)
    }
}
