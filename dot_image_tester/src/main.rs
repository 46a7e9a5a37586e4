use anyhow::{Context, bail};
use clap::Parser;
use dot_image::pipeline::{DEFAULT_PNG_FILENAME, DEFAULT_SVG_FILENAME, DotImageConfig, DotImagePipeline, LoadOutcome};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Renders an image as a dot grid and writes SVG and PNG exports.
#[derive(Debug, Parser)]
#[command(name = "dot_image_tester", version)]
struct Args {
    /// Source image (PNG, JPEG, WebP, ...).
    input: PathBuf,

    /// JSON configuration document; missing keys take their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the exports are written to.
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// PNG width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// PNG height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- 1. Argument Parsing & Configuration ---
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading configuration {}", path.display()))?;
            DotImageConfig::from_json(&json).with_context(|| format!("parsing configuration {}", path.display()))?
        }
        None => DotImageConfig::default(),
    };
    if args.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    // --- 2. Image Load ---
    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("reading image {}", args.input.display()))?;
    let mut pipeline = DotImagePipeline::new(config);
    match pipeline.load_image(bytes).await? {
        LoadOutcome::Loaded { width, height } => info!(width, height, input = %args.input.display(), "source image loaded"),
        LoadOutcome::Superseded { request_id } => bail!("image request {request_id} was superseded"),
    }

    let Some(surface) = pipeline.surface() else {
        bail!("no surface was rendered");
    };
    let (surface_width, surface_height) = surface.dimensions();
    if surface.is_empty() {
        warn!(surface_width, surface_height, "no cell fits inside the boundary");
    }
    info!(surface_width, surface_height, dots = surface.shapes().len(), "dot grid rendered");

    // --- 3. Export ---
    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let svg_path = args.out_dir.join(DEFAULT_SVG_FILENAME);
    tokio::fs::write(&svg_path, pipeline.export_svg()?).await?;
    info!(path = %svg_path.display(), "svg written");

    let png = pipeline.export_png(args.width, args.height).await?;
    let png_path = args.out_dir.join(DEFAULT_PNG_FILENAME);
    tokio::fs::write(&png_path, &png).await?;
    info!(path = %png_path.display(), bytes = png.len(), "png written");

    Ok(())
}
