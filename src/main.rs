use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use sukashi::{
    Config,
    assets::{self, ImageAsset},
    export::{ExportCoordinator, ExportJob, ExportProgress, NamingConvention, OutputFormat},
    templates::TemplateStore,
    watermark::{
        Color, DEFAULT_ANCHOR_MARGIN, FontCatalog, WatermarkMode, WatermarkSpec, anchor_position,
        anchor_preset, clamp_position, measure_footprint,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "sukashi.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watermark a batch of images and write the results
    Export {
        /// Source image files
        inputs: Vec<PathBuf>,

        /// Scan a directory for source images instead of listing files
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Recurse into subdirectories when scanning
        #[arg(long)]
        recursive: bool,

        #[arg(short, long)]
        output_dir: PathBuf,

        /// Output format: png or jpeg
        #[arg(long, default_value = "png")]
        format: OutputFormat,

        /// JPEG quality, 1-100
        #[arg(long)]
        quality: Option<u8>,

        /// Output naming: original, prefix or suffix
        #[arg(long, default_value = "original")]
        naming: NamingConvention,

        /// Token inserted by the prefix/suffix naming conventions
        #[arg(long, default_value = "")]
        token: String,

        #[command(flatten)]
        watermark: WatermarkArgs,
    },

    /// Manage watermark templates
    #[command(subcommand)]
    Template(TemplateCommands),
}

#[derive(Subcommand, Debug)]
enum TemplateCommands {
    /// List saved templates
    List,
    /// Print a template as JSON
    Show { name: String },
    /// Save the given watermark flags as a named template
    Save {
        name: String,
        #[command(flatten)]
        watermark: WatermarkArgs,
    },
}

/// Watermark configuration flags, applied on top of a template (when given)
/// or the built-in defaults.
#[derive(Args, Debug)]
struct WatermarkArgs {
    /// Start from a saved template
    #[arg(long)]
    template: Option<String>,

    /// Watermark text (selects text mode)
    #[arg(long)]
    text: Option<String>,

    /// Watermark image file (selects image mode)
    #[arg(long)]
    image: Option<PathBuf>,

    /// Text fill color as RRGGBB hex
    #[arg(long)]
    color: Option<String>,

    /// Text opacity, 0.0-1.0
    #[arg(long)]
    opacity: Option<f32>,

    /// Font family (file name under the configured font directory)
    #[arg(long)]
    font: Option<String>,

    #[arg(long)]
    font_size: Option<f32>,

    #[arg(long)]
    bold: bool,

    #[arg(long)]
    italic: bool,

    /// Watermark image opacity, 0.0-1.0
    #[arg(long)]
    image_opacity: Option<f32>,

    /// Watermark image scale factor
    #[arg(long)]
    scale: Option<f32>,

    #[arg(long, allow_negative_numbers = true)]
    x: Option<i32>,

    #[arg(long, allow_negative_numbers = true)]
    y: Option<i32>,

    /// Rotation in degrees
    #[arg(long, allow_negative_numbers = true)]
    rotation: Option<f64>,

    /// Anchor preset (top-left, top-center, ..., center, ..., bottom-right);
    /// overrides --x/--y using the first source image's dimensions
    #[arg(long)]
    anchor: Option<String>,
}

impl WatermarkArgs {
    fn build_spec(
        &self,
        config: &Config,
        store: &TemplateStore,
    ) -> Result<WatermarkSpec, Box<dyn std::error::Error>> {
        if self.text.is_some() && self.image.is_some() {
            return Err("--text and --image are mutually exclusive".into());
        }

        let mut spec = match &self.template {
            Some(name) => store.load(name)?,
            None => WatermarkSpec {
                font_family: config.fonts.default_family.clone(),
                font_size: config.fonts.default_size,
                ..WatermarkSpec::default()
            },
        };

        if let Some(text) = &self.text {
            spec.mode = WatermarkMode::Text;
            spec.text = text.clone();
        }
        if let Some(image) = &self.image {
            spec.mode = WatermarkMode::Image;
            spec.image_path = Some(image.clone());
        }
        if let Some(color) = &self.color {
            spec.color =
                Color::from_hex(color).ok_or("invalid --color, expected RRGGBB hex")?;
        }
        if let Some(opacity) = self.opacity {
            spec.opacity = opacity;
        }
        if let Some(font) = &self.font {
            spec.font_family = font.clone();
        }
        if let Some(size) = self.font_size {
            spec.font_size = size;
        }
        if self.bold {
            spec.bold = true;
        }
        if self.italic {
            spec.italic = true;
        }
        if let Some(opacity) = self.image_opacity {
            spec.image_opacity = opacity;
        }
        if let Some(scale) = self.scale {
            spec.image_scale = scale;
        }
        if let Some(x) = self.x {
            spec.x = x;
        }
        if let Some(y) = self.y {
            spec.y = y;
        }
        if let Some(rotation) = self.rotation {
            spec.rotation = rotation;
        }

        spec.validate()?;
        Ok(spec)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = if cli.config.exists() {
        let config_content = std::fs::read_to_string(&cli.config)?;
        toml_edit::de::from_str::<Config>(&config_content)?
    } else {
        info!("Config file not found at {:?}, using defaults", cli.config);
        Config::default()
    };

    let store = TemplateStore::new(
        config
            .templates
            .directory
            .clone()
            .unwrap_or_else(TemplateStore::default_location),
    );

    match cli.command {
        Commands::Template(cmd) => handle_template_command(cmd, &config, &store),
        Commands::Export {
            inputs,
            input_dir,
            recursive,
            output_dir,
            format,
            quality,
            naming,
            token,
            watermark,
        } => {
            run_export(
                &config, &store, inputs, input_dir, recursive, output_dir, format, quality,
                naming, token, watermark,
            )
            .await
        }
    }
}

fn handle_template_command(
    cmd: TemplateCommands,
    config: &Config,
    store: &TemplateStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        TemplateCommands::List => {
            let names = store.list()?;
            if names.is_empty() {
                println!("No templates in {:?}", store.directory());
            } else {
                for name in names {
                    println!("{name}");
                }
            }
        }
        TemplateCommands::Show { name } => {
            let spec = store.load(&name)?;
            println!("{}", serde_json::to_string_pretty(&spec)?);
        }
        TemplateCommands::Save { name, watermark } => {
            let spec = watermark.build_spec(config, store)?;
            let path = store.save(&name, &spec)?;
            println!("Saved template '{}' to {:?}", name, path);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_export(
    config: &Config,
    store: &TemplateStore,
    inputs: Vec<PathBuf>,
    input_dir: Option<PathBuf>,
    recursive: bool,
    output_dir: PathBuf,
    format: OutputFormat,
    quality: Option<u8>,
    naming: NamingConvention,
    token: String,
    watermark: WatermarkArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let assets = collect_assets(inputs, input_dir, recursive)?;
    if assets.is_empty() {
        return Err("no input images; pass files or --input-dir".into());
    }
    info!("Exporting {} image(s)", assets.len());

    let fonts = Arc::new(FontCatalog::new(&config.fonts.directory));
    let mut spec = watermark.build_spec(config, store)?;

    if let Some(anchor) = &watermark.anchor {
        let (h, v) =
            anchor_preset(anchor).ok_or_else(|| format!("unknown anchor preset {anchor:?}"))?;
        // Anchor against the first source, the way the interactive flow
        // anchors against the currently previewed image.
        let (canvas_w, canvas_h) = assets[0].dimensions()?;
        let footprint = measure_footprint(&spec, &fonts)?;
        let (x, y) = anchor_position(h, v, footprint, canvas_w, canvas_h, DEFAULT_ANCHOR_MARGIN);
        let (x, y) = clamp_position(x, y, footprint, canvas_w, canvas_h);
        spec.x = x;
        spec.y = y;
        info!("Anchor {} -> ({}, {})", anchor, x, y);
    }

    let mut job = ExportJob::new(assets, output_dir);
    job.naming = naming;
    job.token = token;
    job.format = format;
    job.jpeg_quality = quality.unwrap_or(config.export.jpeg_quality);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested, finishing current image");
            signal_cancel.cancel();
        }
    });

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ExportProgress>();
    let reporter = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            info!("{}", update.message);
        }
    });

    let coordinator = ExportCoordinator::new(fonts);
    let result = coordinator.run(job, spec, cancel, progress_tx).await?;
    reporter.await?;

    println!("{}", result.summary);
    if result.failed > 0 && !result.cancelled {
        std::process::exit(1);
    }
    Ok(())
}

fn collect_assets(
    inputs: Vec<PathBuf>,
    input_dir: Option<PathBuf>,
    recursive: bool,
) -> Result<Vec<ImageAsset>, Box<dyn std::error::Error>> {
    let mut assets = Vec::new();
    if let Some(dir) = input_dir {
        assets.extend(assets::scan_directory(&dir, recursive)?);
    }
    for path in inputs {
        if !assets::is_supported_image(&path) {
            warn!("Skipping {:?}: unsupported file type", path);
            continue;
        }
        assets.push(ImageAsset::new(path));
    }
    Ok(assets)
}
