//! Session Flow Tests
//!
//! End-to-end customization flows: upload, place, price, freeze, hand off.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};

use printplace_core::{
    cart::{CartLineItem, CartService, CartSummary},
    config::EngineConfig,
    error::{CartError, ConfigurationError, EngineError, IngestError, PricingError, StateError},
    ingest::LogoUpload,
    placement::ContainerSize,
    pricing::{PriceRequest, PriceSource, PricingOracle, PricingService},
    render::{CanvasRenderer, OverlayRenderer},
    CatalogRegistry, CustomizationSession, PrintMethod, Product,
};

const PRODUCT_JSON: &str = r##"{
    "id": "tee-classic",
    "name": "Classic Tee",
    "slug": "classic-tee",
    "base_price": 149.0,
    "min_quantity": 10,
    "variants": [
        {"color": "Black", "color_hex": "#000000", "images": ["https://cdn.example.com/tee-black.png"], "sizes": ["S", "M", "L"]},
        {"color": "Sand", "color_hex": "#d8c8a8", "images": [], "sizes": ["M", "XL"]}
    ],
    "print_areas": [
        {"name": "left_chest", "name_no": "Venstre bryst", "x": 55, "y": 25, "width": 15, "height": 15, "max_width_cm": 10, "max_height_cm": 10},
        {"name": "back", "name_no": "Rygg", "x": 25, "y": 15, "width": 50, "height": 50, "max_width_cm": 30, "max_height_cm": 40}
    ],
    "print_methods": ["print", "embroidery"]
}"##;

fn product() -> Product {
    serde_json::from_str(PRODUCT_JSON).unwrap()
}

fn png_upload(width: u32, height: u32) -> LogoUpload {
    let img = RgbaImage::from_pixel(width, height, Rgba([20, 120, 220, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    LogoUpload::new("logo.png", "image/png", out.into_inner())
}

fn offline_session() -> CustomizationSession {
    CustomizationSession::open(product(), &EngineConfig::default(), PricingOracle::offline())
}

struct FixedPrice(f64);

#[async_trait]
impl PricingService for FixedPrice {
    async fn price(&self, _request: &PriceRequest) -> Result<f64, PricingError> {
        Ok(self.0)
    }
}

#[derive(Default)]
struct RecordingCart {
    items: Mutex<Vec<CartLineItem>>,
}

#[async_trait]
impl CartService for RecordingCart {
    async fn add(&self, item: &CartLineItem) -> Result<CartSummary, CartError> {
        let mut items = self.items.lock().unwrap();
        items.push(item.clone());
        Ok(CartSummary {
            session_id: "test".to_string(),
            subtotal: items.iter().map(|i| i.base_price * f64::from(i.quantity)).sum(),
            design_total: items.iter().map(|i| i.design_price * f64::from(i.quantity)).sum(),
            shipping: 0.0,
            total: items.iter().map(|i| i.total_price).sum(),
            updated_at: None,
        })
    }
}

#[tokio::test]
async fn flow_upload_place_price_freeze() {
    let mut session = offline_session();
    session.set_container(ContainerSize::new(600.0, 600.0));

    let report = session.upload_logo(png_upload(600, 600)).await.unwrap();
    assert!(report.is_clean());

    // Default area is the first listed, default method embroidery.
    assert_eq!(session.area().unwrap().name, "left_chest");
    assert_eq!(session.method(), Some(PrintMethod::Embroidery));
    assert_eq!(session.refresh_price().await, 89.0);

    session.set_area("back").unwrap();
    session.set_method(PrintMethod::Print).unwrap();
    assert_eq!(session.refresh_price().await, 79.0);

    // Drag the logo from the area center 30px right.
    let (cx, cy) = (25.0 / 100.0 * 600.0 + 150.0, 15.0 / 100.0 * 600.0 + 150.0);
    assert!(session.pointer_down(cx, cy));
    assert!(session.pointer_move(cx + 30.0, cy));
    session.pointer_up();
    assert!((session.transform().unwrap().pos_x - 60.0).abs() < 1e-9);

    assert!(session.scale_down());
    assert!(session.rotate_clockwise());
    session.refresh_price().await;

    let item = session.line_item().unwrap();
    assert_eq!(item.size, "S");
    assert_eq!(item.variant_color, "Black");
    assert_eq!(item.quantity, 10);
    assert_eq!(item.design_price, 79.0);
    assert_eq!(item.total_price, (149.0 + 79.0) * 10.0);

    let design = item.design.unwrap();
    assert_eq!(design.area_name(), "back");
    assert_eq!(design.method(), PrintMethod::Print);
    assert_eq!(design.placement().rotation_deg, 15.0);
    assert_eq!(design.width_cm(), 30.0 * design.placement().scale);
    assert!(design.logo_preview().starts_with("data:image/png;base64,"));
    assert!(design.verify_fingerprint().unwrap());
}

#[tokio::test]
async fn flow_low_resolution_warns_but_still_adds_to_cart() {
    let mut session = offline_session();
    let report = session.upload_logo(png_upload(299, 300)).await.unwrap();
    assert_eq!(report.warnings.len(), 1);

    session.refresh_price().await;
    let design = session.line_item().unwrap().design.unwrap();
    assert_eq!(
        design.warnings(),
        ["Logo has low resolution. For best results, use at least 300x300 pixels.".to_string()]
    );
}

#[tokio::test]
async fn flow_rejected_upload_keeps_previous_state() {
    let mut config = EngineConfig::default();
    config.ingest.max_upload_bytes = 64 * 1024;
    let mut session = CustomizationSession::open(product(), &config, PricingOracle::offline());

    session.upload_logo(png_upload(400, 400)).await.unwrap();
    session.set_position(20.0, 80.0);
    let before = session.snapshot();

    let gif = LogoUpload::new("logo.gif", "image/gif", vec![0x47, 0x49, 0x46]);
    assert!(matches!(
        session.upload_logo(gif).await,
        Err(EngineError::Ingest(IngestError::UnsupportedType { .. }))
    ));

    let oversized = LogoUpload::new("huge.png", "image/png", vec![0; 64 * 1024 + 1]);
    assert!(matches!(
        session.upload_logo(oversized).await,
        Err(EngineError::Ingest(IngestError::TooLarge { .. }))
    ));

    let corrupt = LogoUpload::new("broken.png", "image/png", b"\x89PNG\r\n\x1a\nnope".to_vec());
    assert!(matches!(
        session.upload_logo(corrupt).await,
        Err(EngineError::Ingest(IngestError::DecodeFailed(_)))
    ));

    assert_eq!(session.snapshot(), before);
    assert_eq!(session.logo().unwrap().pixel_width, 400);
}

#[tokio::test]
async fn flow_only_footprint_changes_reprice() {
    let mut session = offline_session();
    session.upload_logo(png_upload(400, 400)).await.unwrap();
    session.refresh_price().await;
    assert!(!session.has_pending_price());

    session.set_position(10.0, 90.0);
    session.rotate_counter_clockwise();
    session.set_rotation(-30.0);
    session.reset();
    assert!(!session.has_pending_price());

    session.scale_up();
    assert!(session.has_pending_price());
    session.refresh_price().await;

    session.set_quantity(50);
    assert!(session.has_pending_price());
    session.refresh_price().await;

    session.set_method(PrintMethod::Print).unwrap();
    assert!(session.has_pending_price());
    session.refresh_price().await;

    session.set_area("back").unwrap();
    assert!(session.has_pending_price());
    assert_eq!(session.price_request().unwrap().quantity, 50);
}

#[tokio::test]
async fn flow_line_item_waits_for_settled_price() {
    let mut session = offline_session();
    session.upload_logo(png_upload(400, 400)).await.unwrap();
    assert_eq!(session.line_item(), Err(StateError::PricePending));
    assert_eq!(session.freeze(), Err(StateError::PricePending));

    session.refresh_price().await;
    let item = session.line_item().unwrap();
    assert_eq!(item.design_price, 89.0);
    assert_eq!(item.design.unwrap().method(), PrintMethod::Embroidery);

    // A method change invalidates the embroidery price until the new quote lands.
    session.set_method(PrintMethod::Print).unwrap();
    assert_eq!(session.line_item(), Err(StateError::PricePending));

    // In flight but not applied is still unsettled.
    let fetch = session.take_price_fetch().unwrap();
    assert_eq!(session.line_item(), Err(StateError::PricePending));
    session.apply_quote(fetch.await);

    let item = session.line_item().unwrap();
    assert_eq!(item.design_price, 59.0);
    let design = item.design.unwrap();
    assert_eq!(design.method(), PrintMethod::Print);
    assert_eq!(design.price_per_unit(), 59.0);
}

#[tokio::test]
async fn flow_reset_ends_drag() {
    let mut session = offline_session();
    session.set_container(ContainerSize::new(600.0, 600.0));
    session.upload_logo(png_upload(400, 400)).await.unwrap();

    // Left chest center in a 600px container.
    let (cx, cy) = (375.0, 195.0);
    assert!(session.pointer_down(cx, cy));
    assert!(session.pointer_move(cx + 30.0, cy));
    assert!(session.reset());
    assert!(!session.is_dragging());
    assert!(!session.snapshot().dragging);

    assert!(!session.pointer_move(cx + 60.0, cy + 60.0));
    assert_eq!(session.transform().unwrap().pos_x, 50.0);
    assert_eq!(session.transform().unwrap().pos_y, 50.0);
}

#[tokio::test]
async fn flow_reset_reprices_only_when_scale_moves() {
    let mut session = offline_session();
    session.upload_logo(png_upload(400, 400)).await.unwrap();
    session.refresh_price().await;

    session.set_scale_absolute(1.5);
    session.refresh_price().await;
    assert_eq!(session.price_request().unwrap().width_cm, 15.0);

    assert!(session.reset());
    assert!(session.has_pending_price());
    assert!(!session.reset());
}

#[tokio::test]
async fn flow_remove_logo_returns_to_plain_product() {
    let mut session = offline_session();
    session.upload_logo(png_upload(100, 100)).await.unwrap();
    session.refresh_price().await;
    assert_eq!(session.price_per_unit(), 89.0);

    assert!(session.remove_logo());
    assert_eq!(session.price_per_unit(), 0.0);
    assert!(session.report().unwrap().is_clean());
    assert!(session.freeze().is_err());

    let item = session.line_item().unwrap();
    assert!(item.design.is_none());
    assert_eq!(item.total_price, 149.0 * 10.0);
}

#[tokio::test]
async fn flow_service_price_is_adopted() {
    let oracle = PricingOracle::new(Arc::new(FixedPrice(112.5)), Duration::from_secs(1));
    let mut session = CustomizationSession::open(product(), &EngineConfig::default(), oracle);
    session.upload_logo(png_upload(400, 400)).await.unwrap();

    assert_eq!(session.refresh_price().await, 112.5);
    assert_eq!(session.pricing().current().unwrap().source, PriceSource::Service);
    assert_eq!(session.line_total(), (149.0 + 112.5) * 10.0);
}

#[tokio::test]
async fn flow_add_to_cart_hands_off_line_item() {
    let cart = RecordingCart::default();
    let mut session = offline_session();
    session.select_variant(1).unwrap();
    session.select_size("XL").unwrap();
    session.set_quantity(3);
    assert_eq!(session.quantity(), 10);

    session.upload_logo(png_upload(400, 400)).await.unwrap();
    let summary = session.add_to_cart(&cart).await.unwrap();
    assert_eq!(summary.total, (149.0 + 89.0) * 10.0);

    let items = cart.items.lock().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].variant_color, "Sand");
    assert_eq!(items[0].size, "XL");

    let request = serde_json::to_value(items[0].to_request()).unwrap();
    assert_eq!(request["design"]["print_method"], "embroidery");
    assert_eq!(request["design"]["print_area"], "left_chest");
    assert_eq!(request["design"]["complexity"], "normal");
    assert_eq!(request["design"]["view"], "front");
}

#[tokio::test]
async fn flow_observer_sees_latest_committed_state() {
    let mut session = offline_session();
    let mut rx = session.subscribe();
    let _ = rx.borrow_and_update();

    session.upload_logo(png_upload(400, 400)).await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().logo_active);

    session.set_scale(0.25);
    session.set_rotation(30.0);
    let latest = rx.borrow_and_update().clone();
    assert_eq!(latest.transform.unwrap().rotation_deg, 30.0);
    assert_eq!(latest.transform.unwrap().scale, 1.25);
    assert_eq!(latest.revision, session.snapshot().revision);
}

#[tokio::test]
async fn flow_preview_through_both_backends() {
    let mut session = offline_session();
    session.set_container(ContainerSize::new(400.0, 500.0));
    session.upload_logo(png_upload(320, 160)).await.unwrap();
    session.set_area("back").unwrap();

    let backdrop = RgbaImage::from_pixel(200, 250, Rgba([240, 240, 240, 255]));
    let canvas = session.render(&CanvasRenderer, Some(&backdrop)).unwrap();
    let png = canvas.output.encode_png().unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

    let overlay = session.render(&OverlayRenderer, None).unwrap();
    let svg = overlay.output.to_svg();
    assert!(svg.contains(">Rygg</text>"));
    assert!(svg.contains("https://cdn.example.com/tee-black.png"));
    assert!(svg.contains("data:image/png;base64,"));

    let (c, o) = (canvas.geometry.logo.unwrap(), overlay.geometry.logo.unwrap());
    assert!((c.center_x - o.center_x).abs() <= 1.0);
    assert!((c.center_y - o.center_y).abs() <= 1.0);
    assert_eq!((c.width, c.height), (80.0, 40.0));
}

#[tokio::test]
async fn flow_catalog_product_without_areas_stays_purchasable() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tee.json"), PRODUCT_JSON).unwrap();
    std::fs::write(
        dir.path().join("cap.json"),
        r##"{"id": "cap-1", "slug": "cap", "base_price": 99.0,
            "variants": [{"color": "Red", "color_hex": "#ff0000", "sizes": ["One size"]}]}"##,
    )
    .unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let catalog = CatalogRegistry::load_from_dir(dir.path()).unwrap();
    assert_eq!(catalog.list().len(), 2);
    assert_eq!(catalog.get("classic-tee").unwrap().id, "tee-classic");
    assert_eq!(catalog.get("tee-classic").unwrap().print_areas[1].label, "Rygg");

    let cap = catalog.get("cap").unwrap().clone();
    let mut session = CustomizationSession::open(cap, &EngineConfig::default(), PricingOracle::offline());
    assert!(!session.is_customizable());
    assert!(matches!(
        session.upload_logo(png_upload(400, 400)).await,
        Err(EngineError::Configuration(ConfigurationError::NoAreasDefined { .. }))
    ));

    let item = session.line_item().unwrap();
    assert!(item.design.is_none());
    assert_eq!(item.total_price, 99.0);
}
