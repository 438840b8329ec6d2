//! PrintPlace CLI - Bridge interface for the storefront
//!
//! Commands: areas, inspect, quote, preview, freeze
//! Outputs JSON to stdout, logs to stderr
//! Exit codes: 0 success, 1 usage or I/O failure, 2 rejected by the engine

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use uuid::Uuid;

use printplace_core::{
    catalog::CatalogRegistry,
    config::EngineConfig,
    error::{ConfigurationError, EngineError, IngestError, StateError},
    ingest::{ImageIngestor, LogoUpload},
    placement::{ContainerSize, ScaleBounds},
    pricing::{fallback_price, PriceRequest, PricingOracle},
    render::{CanvasRenderer, OverlayRenderer},
    validation::Validator,
    AreaRegistry, CartService, CustomizationSession, HttpCartService, PrintMethod, Product,
};

#[derive(Parser)]
#[command(name = "printplace-cli")]
#[command(about = "PrintPlace CLI - Logo placement, pricing and design hand-off")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory of product JSON documents
    #[arg(short, long, default_value = "products")]
    products_dir: PathBuf,

    /// Engine config file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List a product's print areas and methods
    Areas {
        /// Product id or slug
        #[arg(short, long)]
        product: String,
    },

    /// Ingest a logo file and report its quality warnings
    Inspect {
        /// Logo file (PNG, JPEG or SVG)
        #[arg(short, long)]
        logo: PathBuf,
    },

    /// Price a decoration
    Quote {
        /// Product id or slug
        #[arg(short, long)]
        product: String,

        /// Print area name (default: first area)
        #[arg(short, long)]
        area: Option<String>,

        /// print or embroidery (default: embroidery when offered)
        #[arg(short, long)]
        method: Option<String>,

        #[arg(short, long, default_value_t = 1.0)]
        scale: f64,

        /// Defaults to the product minimum
        #[arg(short, long)]
        quantity: Option<u32>,
    },

    /// Render a placement preview
    Preview {
        #[command(flatten)]
        placement: PlacementArgs,

        #[arg(long, default_value_t = 500.0)]
        width: f64,

        #[arg(long, default_value_t = 500.0)]
        height: f64,

        #[arg(short, long, value_enum, default_value_t = PreviewFormat::Png)]
        format: PreviewFormat,

        /// Local copy of the product image to draw underneath
        #[arg(long)]
        product_image: Option<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Freeze a placement into a cart line item
    Freeze {
        #[command(flatten)]
        placement: PlacementArgs,

        #[arg(long, default_value_t = 0)]
        variant: usize,

        #[arg(long)]
        size: Option<String>,

        #[arg(short, long)]
        quantity: Option<u32>,

        /// Post the line item to the configured cart service
        #[arg(long)]
        submit: bool,

        /// Cart session id (default: a new one)
        #[arg(long)]
        cart_session: Option<Uuid>,
    },
}

#[derive(Args)]
struct PlacementArgs {
    /// Product id or slug
    #[arg(short, long)]
    product: String,

    /// Logo file (PNG, JPEG or SVG)
    #[arg(short, long)]
    logo: PathBuf,

    #[arg(short, long)]
    area: Option<String>,

    #[arg(short, long)]
    method: Option<String>,

    #[arg(short, long, default_value_t = 1.0)]
    scale: f64,

    /// Degrees, positive is clockwise
    #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
    rotation: f64,

    /// Horizontal position in percent of the area
    #[arg(short = 'x', long, default_value_t = 50.0)]
    pos_x: f64,

    /// Vertical position in percent of the area
    #[arg(short = 'y', long, default_value_t = 50.0)]
    pos_y: f64,
}

#[derive(Clone, Copy, ValueEnum)]
enum PreviewFormat {
    /// Raster through the canvas backend
    Png,
    /// Layer stack through the overlay backend
    Svg,
}

enum Failure {
    /// Bad arguments, missing files, unreadable config
    Usage(String),
    /// The engine rejected the request
    Domain(String),
}

impl From<EngineError> for Failure {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Io(_) | EngineError::Config(_) => Failure::Usage(err.to_string()),
            other => Failure::Domain(other.to_string()),
        }
    }
}

impl From<ConfigurationError> for Failure {
    fn from(err: ConfigurationError) -> Self {
        Failure::Domain(err.to_string())
    }
}

impl From<IngestError> for Failure {
    fn from(err: IngestError) -> Self {
        Failure::Domain(err.to_string())
    }
}

impl From<StateError> for Failure {
    fn from(err: StateError) -> Self {
        Failure::Domain(err.to_string())
    }
}

fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn emit(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            emit(&output);
            ExitCode::SUCCESS
        }
        Err(Failure::Usage(error)) => {
            emit(&serde_json::json!({ "success": false, "error": error }));
            ExitCode::FAILURE
        }
        Err(Failure::Domain(error)) => {
            emit(&serde_json::json!({ "success": false, "error": error }));
            ExitCode::from(2)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, Failure> {
    match path {
        Some(path) => EngineConfig::load_from_file(path)
            .map_err(|e| Failure::Usage(format!("Failed to load config: {e}"))),
        None => Ok(EngineConfig::default()),
    }
}

fn find_product(dir: &Path, key: &str) -> Result<Product, Failure> {
    let catalog = CatalogRegistry::load_from_dir(dir)
        .map_err(|e| Failure::Usage(format!("Failed to load products: {e}")))?;
    catalog
        .get(key)
        .cloned()
        .ok_or_else(|| Failure::Usage(format!("Unknown product: {key}")))
}

fn read_logo(path: &Path) -> Result<LogoUpload, Failure> {
    LogoUpload::from_path(path).map_err(|e| Failure::Usage(format!("Cannot read {}: {e}", path.display())))
}

fn to_json(value: &impl serde::Serialize) -> Result<serde_json::Value, Failure> {
    serde_json::to_value(value).map_err(|e| Failure::Usage(e.to_string()))
}

async fn run(cli: Cli) -> Result<serde_json::Value, Failure> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Areas { product } => {
            let product = find_product(&cli.products_dir, &product)?;
            let registry = AreaRegistry::for_product(&product)?;
            Ok(serde_json::json!({
                "success": true,
                "product_id": product.id,
                "areas": to_json(&registry.areas())?,
                "methods": to_json(&registry.methods())?,
                "default_area": registry.select_default_area().name,
                "default_method": registry.select_default_method(),
            }))
        }

        Commands::Inspect { logo } => {
            let upload = read_logo(&logo)?;
            let asset = ImageIngestor::new(&config.ingest).ingest(upload).await?;
            let report = Validator::new(&config.validation).validate(&asset);
            Ok(serde_json::json!({
                "success": true,
                "width": asset.pixel_width,
                "height": asset.pixel_height,
                "mime_type": asset.mime_type,
                "byte_size": asset.byte_size,
                "clean": report.is_clean(),
                "warnings": to_json(&report.warnings)?,
            }))
        }

        Commands::Quote {
            product,
            area,
            method,
            scale,
            quantity,
        } => {
            let product = find_product(&cli.products_dir, &product)?;
            let registry = AreaRegistry::for_product(&product)?;
            let area = match &area {
                Some(name) => registry.area(name)?,
                None => registry.select_default_area(),
            };
            let method = match &method {
                Some(raw) => {
                    let method: PrintMethod = raw.parse()?;
                    if !registry.supports(method) {
                        return Err(ConfigurationError::UnsupportedMethod(method.to_string()).into());
                    }
                    method
                }
                None => registry.select_default_method(),
            };
            let scale = ScaleBounds::from(&config.placement).clamp(scale);
            let quantity = quantity
                .unwrap_or(product.min_quantity)
                .max(product.min_quantity)
                .max(1);

            let request = PriceRequest {
                method,
                area_name: area.name.clone(),
                width_cm: area.max_width_cm * scale,
                height_cm: area.max_height_cm * scale,
                quantity,
                complexity: config.pricing.complexity.clone(),
            };
            let mut oracle = PricingOracle::from_settings(&config.pricing).map_err(EngineError::from)?;
            oracle.compute_price(request).await;
            let quote = oracle
                .current()
                .ok_or_else(|| Failure::Domain("No price available".to_string()))?;

            Ok(serde_json::json!({
                "success": true,
                "quote": to_json(quote)?,
                "fallback_price": fallback_price(method, &area.name),
                "line_total": (product.base_price + quote.price_per_unit) * f64::from(quantity),
            }))
        }

        Commands::Preview {
            placement,
            width,
            height,
            format,
            product_image,
            output,
        } => {
            let mut session = open_session(&cli.products_dir, &config, &placement).await?;
            session.set_container(ContainerSize::new(width, height));

            let backdrop = match &product_image {
                Some(path) => Some(
                    image::open(path)
                        .map_err(|e| Failure::Usage(format!("Cannot read {}: {e}", path.display())))?
                        .to_rgba8(),
                ),
                None => None,
            };

            let (renderer, geometry, bytes) = match format {
                PreviewFormat::Png => {
                    let frame = session.render(&CanvasRenderer, backdrop.as_ref())?;
                    let png = frame.output.encode_png().map_err(EngineError::from)?;
                    ("canvas", frame.geometry, png)
                }
                PreviewFormat::Svg => {
                    let frame = session.render(&OverlayRenderer, backdrop.as_ref())?;
                    ("overlay", frame.geometry, frame.output.to_svg().into_bytes())
                }
            };
            std::fs::write(&output, &bytes)
                .map_err(|e| Failure::Usage(format!("Cannot write {}: {e}", output.display())))?;

            Ok(serde_json::json!({
                "success": true,
                "renderer": renderer,
                "output": output.display().to_string(),
                "bytes": bytes.len(),
                "geometry": to_json(&geometry)?,
            }))
        }

        Commands::Freeze {
            placement,
            variant,
            size,
            quantity,
            submit,
            cart_session,
        } => {
            let mut session = open_session(&cli.products_dir, &config, &placement).await?;
            session.select_variant(variant)?;
            if let Some(size) = &size {
                session.select_size(size)?;
            }
            if let Some(quantity) = quantity {
                session.set_quantity(quantity);
            }
            session.refresh_price().await;
            let item = session.line_item()?;

            let summary = if submit {
                let endpoint = config
                    .cart
                    .endpoint
                    .clone()
                    .ok_or_else(|| Failure::Usage("cart.endpoint is not configured".to_string()))?;
                let cart = HttpCartService::new(
                    endpoint,
                    cart_session.unwrap_or_else(Uuid::new_v4),
                    Duration::from_millis(config.pricing.timeout_ms),
                )
                .map_err(EngineError::from)?;
                Some(cart.add(&item).await.map_err(EngineError::from)?)
            } else {
                None
            };

            Ok(serde_json::json!({
                "success": true,
                "price_source": session.pricing().current().map(|q| q.source),
                "line_item": to_json(&item)?,
                "cart": to_json(&summary)?,
            }))
        }
    }
}

async fn open_session(
    products_dir: &Path,
    config: &EngineConfig,
    args: &PlacementArgs,
) -> Result<CustomizationSession, Failure> {
    let product = find_product(products_dir, &args.product)?;
    let pricing = PricingOracle::from_settings(&config.pricing).map_err(EngineError::from)?;
    let mut session = CustomizationSession::open(product, config, pricing);
    if let Some(reason) = session.disabled_reason() {
        return Err(Failure::Domain(reason.to_string()));
    }

    session.upload_logo(read_logo(&args.logo)?).await?;
    if let Some(area) = &args.area {
        session.set_area(area)?;
    }
    if let Some(method) = &args.method {
        session.set_method(method.parse()?)?;
    }
    session.set_scale_absolute(args.scale);
    session.set_rotation(args.rotation);
    session.set_position(args.pos_x, args.pos_y);
    Ok(session)
}
