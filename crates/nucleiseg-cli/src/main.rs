//! nucleiseg CLI — command-line interface for primary-object segmentation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use nucleiseg::{
    segment, DividingLineMethod, GlobalOtsu, ManualThreshold, MaskedImage, SegmentConfig,
    SegmentationResult, Thresholder, UnclumpMethod,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "nucleiseg")]
#[command(about = "Segment primary objects (nuclei) in grayscale microscopy images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment one image and write summary measurements (JSON).
    Segment(CliSegmentArgs),

    /// Print the default segmentation configuration (JSON).
    ConfigInfo,
}

#[derive(Debug, Clone, Args)]
struct CliSegmentArgs {
    /// Path to the input image (grayscale PNG).
    #[arg(long)]
    image: PathBuf,

    /// Path to write summary measurements (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Optional validity mask image; zero pixels are ignored.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Path to write the final label map (16-bit grayscale PNG).
    #[arg(long)]
    labels_png: Option<PathBuf>,

    /// Path to write the object outlines (binary PNG).
    #[arg(long)]
    outlines_png: Option<PathBuf>,

    /// Smallest accepted object diameter in pixels.
    #[arg(long, default_value = "10.0")]
    min_diameter: f32,

    /// Largest accepted object diameter in pixels.
    #[arg(long, default_value = "40.0")]
    max_diameter: f32,

    /// Keep objects outside the diameter range.
    #[arg(long)]
    keep_out_of_size: bool,

    /// Keep objects touching the image border or mask edge.
    #[arg(long)]
    keep_on_border: bool,

    /// Do not fill enclosed background holes.
    #[arg(long)]
    no_fill_holes: bool,

    /// Seed-finding strategy for splitting touching objects.
    #[arg(long, value_enum, default_value_t = UnclumpArg::Intensity)]
    unclump: UnclumpArg,

    /// Dividing-line strategy between touching objects.
    #[arg(long, value_enum, default_value_t = DividingLineArg::Intensity)]
    dividing_line: DividingLineArg,

    /// Smoothing filter size in pixels (default: derived from min diameter).
    #[arg(long)]
    smoothing_filter_size: Option<f32>,

    /// Maxima suppression distance in pixels (default: derived from min diameter).
    #[arg(long)]
    maxima_suppression_size: Option<f32>,

    /// Disable the low-resolution maxima fast path for large objects.
    #[arg(long)]
    no_low_res_maxima: bool,

    /// Manual LoG response threshold in [0, 1] (default: masked Otsu).
    #[arg(long)]
    log_threshold: Option<f32>,

    /// LoG filter diameter in pixels (default: derived from the diameter range).
    #[arg(long)]
    log_diameter: Option<f32>,

    /// Fixed binarization threshold in [0, 1] instead of global Otsu.
    #[arg(long)]
    threshold: Option<f32>,

    /// Multiplier applied to the automatic Otsu threshold.
    #[arg(long, default_value = "1.0")]
    threshold_correction: f32,

    /// Lower clamp for the corrected threshold.
    #[arg(long, default_value = "0.0")]
    min_threshold: f32,

    /// Upper clamp for the corrected threshold.
    #[arg(long, default_value = "1.0")]
    max_threshold: f32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnclumpArg {
    Intensity,
    Shape,
    Log,
    None,
}

impl UnclumpArg {
    fn to_core(self) -> UnclumpMethod {
        match self {
            Self::Intensity => UnclumpMethod::Intensity,
            Self::Shape => UnclumpMethod::Shape,
            Self::Log => UnclumpMethod::LaplacianOfGaussian,
            Self::None => UnclumpMethod::None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DividingLineArg {
    Intensity,
    Distance,
    None,
}

impl DividingLineArg {
    fn to_core(self) -> DividingLineMethod {
        match self {
            Self::Intensity => DividingLineMethod::Intensity,
            Self::Distance => DividingLineMethod::Distance,
            Self::None => DividingLineMethod::None,
        }
    }
}

impl CliSegmentArgs {
    fn to_config(&self) -> SegmentConfig {
        let mut config = SegmentConfig {
            min_diameter: self.min_diameter,
            max_diameter: self.max_diameter,
            discard_size: !self.keep_out_of_size,
            discard_border: !self.keep_on_border,
            fill_holes: !self.no_fill_holes,
            ..Default::default()
        };
        config.unclump.method = self.unclump.to_core();
        config.unclump.dividing_line = self.dividing_line.to_core();
        config.unclump.smoothing_filter_size = self.smoothing_filter_size;
        config.unclump.maxima_suppression_size = self.maxima_suppression_size;
        config.unclump.low_res_maxima = !self.no_low_res_maxima;
        config.unclump.log_threshold = self.log_threshold;
        config.unclump.log_diameter = self.log_diameter;
        config
    }

    fn to_thresholder(&self) -> Box<dyn Thresholder> {
        match self.threshold {
            Some(value) => Box::new(ManualThreshold { value }),
            None => Box::new(GlobalOtsu {
                correction_factor: self.threshold_correction,
                min_threshold: self.min_threshold,
                max_threshold: self.max_threshold,
            }),
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Segment(args) => run_segment(&args),
        Commands::ConfigInfo => run_config_info(),
    }
}

// ── segment ───────────────────────────────────────────────────────────

fn run_segment(args: &CliSegmentArgs) -> CliResult<()> {
    let gray = image::open(&args.image)
        .map_err(|e| -> CliError { format!("cannot read {}: {e}", args.image.display()).into() })?
        .to_luma8();
    let input = match &args.mask {
        Some(path) => {
            let mask = image::open(path)
                .map_err(|e| -> CliError { format!("cannot read {}: {e}", path.display()).into() })?
                .to_luma8();
            MaskedImage::with_mask(MaskedImage::from_gray8(&gray).pixels().clone(), mask)?
        }
        None => MaskedImage::from_gray8(&gray),
    };

    let config = args.to_config();
    let thresholder = args.to_thresholder();
    let result = segment(&input, &config, thresholder.as_ref())?;

    tracing::info!(
        "{} objects, threshold {:.4}",
        result.object_count,
        result.global_threshold
    );

    let summary = result.summary();
    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(&args.out, json)
        .map_err(|e| -> CliError { format!("cannot write {}: {e}", args.out.display()).into() })?;

    if let Some(path) = &args.labels_png {
        write_labels_png(&result, path)?;
    }
    if let Some(path) = &args.outlines_png {
        write_outlines_png(&result, path)?;
    }
    Ok(())
}

fn write_labels_png(result: &SegmentationResult, path: &PathBuf) -> CliResult<()> {
    let (w, h) = result.labels.dimensions();
    let data: Vec<u16> = result
        .labels
        .as_raw()
        .iter()
        .map(|&v| v.min(u16::MAX as u32) as u16)
        .collect();
    let img: image::ImageBuffer<image::Luma<u16>, Vec<u16>> =
        image::ImageBuffer::from_raw(w, h, data).expect("dimensions match label map");
    img.save(path)
        .map_err(|e| -> CliError { format!("cannot write {}: {e}", path.display()).into() })?;
    Ok(())
}

fn write_outlines_png(result: &SegmentationResult, path: &PathBuf) -> CliResult<()> {
    let (w, h) = result.outlines.dimensions();
    let data: Vec<u8> = result
        .outlines
        .as_raw()
        .iter()
        .map(|&v| if v != 0 { 255 } else { 0 })
        .collect();
    let img = image::GrayImage::from_raw(w, h, data).expect("dimensions match outline map");
    img.save(path)
        .map_err(|e| -> CliError { format!("cannot write {}: {e}", path.display()).into() })?;
    Ok(())
}

// ── config-info ───────────────────────────────────────────────────────

fn run_config_info() -> CliResult<()> {
    let config = SegmentConfig::default();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
