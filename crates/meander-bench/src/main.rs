//! meander-bench: CLI tool for centerline extraction experiments and
//! migration diagnostics.
//!
//! Loads an ordered series of water-mask images, runs the meander pipeline
//! on them and prints the migration series with per-epoch diagnostics.
//! Useful for:
//!
//! - Tuning the opening radii and ridge window for a new sensor
//! - Comparing flattened and per-component matching on braided reaches
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin meander-bench -- [OPTIONS] <MASK>...
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use meander_pipeline::{
    BinaryMask, Epoch, EpochPipeline, GeoTransform, Georeference, MatchingMode, NearestSearchKind,
    PipelineConfig, SeriesResult,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Centerline extraction and migration diagnostics for meander.
///
/// Each mask is an image (PNG, JPEG, BMP, WebP) in which every non-zero
/// pixel is water. Masks are processed in the order given and must share
/// one grid.
#[derive(Parser)]
#[command(name = "meander-bench", version)]
struct Cli {
    /// Water-mask images, oldest first.
    #[arg(required = true, num_args = 1..)]
    masks: Vec<PathBuf>,

    /// Epoch labels, comma-separated (defaults to the file stems).
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Elapsed time between consecutive epochs.
    #[arg(long, default_value_t = 10.0)]
    interval: f64,

    /// Erosion radius of the opening, in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_ERODE_RADIUS)]
    erode_radius: u32,

    /// Dilation radius of the opening, in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_DILATE_RADIUS)]
    dilate_radius: u32,

    /// Side of the ridge-detection window, in pixels.
    #[arg(
        long,
        default_value_t = PipelineConfig::DEFAULT_LOCAL_MAX_WINDOW,
        value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..)
    )]
    local_max_window: u32,

    /// Douglas-Peucker tolerance in CRS units.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SIMPLIFY_TOLERANCE)]
    simplify_tolerance: f64,

    /// Skeleton components with fewer pixels are dropped.
    #[arg(
        long,
        default_value_t = PipelineConfig::DEFAULT_MIN_COMPONENT_PIXELS,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    min_component_pixels: usize,

    /// Nearest-neighbor backend.
    #[arg(long, value_enum, default_value_t = Search::Rtree)]
    nearest_search: Search,

    /// Matching of multi-channel centerlines.
    #[arg(long, value_enum, default_value_t = Matching::Flattened)]
    matching: Matching,

    /// Pixel size in CRS units. When set, the grid is north-up (rows run
    /// south); otherwise pixel indices are used as coordinates.
    #[arg(long)]
    pixel_size: Option<f64>,

    /// X coordinate of the upper-left corner.
    #[arg(long, default_value_t = 0.0)]
    origin_x: f64,

    /// Y coordinate of the upper-left corner.
    #[arg(long, default_value_t = 0.0)]
    origin_y: f64,

    /// Coordinate reference system identifier, e.g. `EPSG:32615`.
    #[arg(long)]
    crs: Option<String>,

    /// Output results and diagnostics as JSON instead of a report.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Nearest-neighbor backend selection.
#[derive(Clone, Copy, ValueEnum)]
enum Search {
    /// Compare every pair of vertices.
    Exhaustive,
    /// R*-tree over the later epoch's vertices.
    Rtree,
}

/// Multi-polyline matching selection.
#[derive(Clone, Copy, ValueEnum)]
enum Matching {
    /// One point cloud per epoch.
    Flattened,
    /// Each earlier polyline against its best later polyline.
    PerComponent,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        erode_radius: cli.erode_radius,
        dilate_radius: cli.dilate_radius,
        local_max_window: cli.local_max_window,
        simplify_tolerance: cli.simplify_tolerance,
        min_component_pixels: cli.min_component_pixels,
        nearest_search: match cli.nearest_search {
            Search::Exhaustive => NearestSearchKind::Exhaustive,
            Search::Rtree => NearestSearchKind::RTree,
        },
        matching: match cli.matching {
            Matching::Flattened => MatchingMode::Flattened,
            Matching::PerComponent => MatchingMode::PerComponent,
        },
    })
}

fn georeference_from_cli(cli: &Cli) -> Georeference {
    let transform = cli.pixel_size.map_or_else(
        || GeoTransform::new(cli.origin_x, cli.origin_y, 1.0, 1.0),
        |size| GeoTransform::new(cli.origin_x, cli.origin_y, size, -size),
    );
    Georeference::new(transform, cli.crs.clone())
}

/// Pair every mask path with its label.
fn labels_from_cli(cli: &Cli) -> Result<Vec<String>, String> {
    match &cli.labels {
        Some(labels) if labels.len() != cli.masks.len() => Err(format!(
            "--labels has {} entries but {} masks were given",
            labels.len(),
            cli.masks.len(),
        )),
        Some(labels) => Ok(labels.clone()),
        None => Ok(cli.masks.iter().map(|path| file_label(path)).collect()),
    }
}

fn file_label(path: &Path) -> String {
    path.file_stem().map_or_else(
        || path.display().to_string(),
        |stem| stem.to_string_lossy().into_owned(),
    )
}

fn load_epoch(path: &Path, label: String, georeference: &Georeference) -> Result<Epoch, String> {
    let gray = image::open(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?
        .to_luma8();
    debug!(
        path = %path.display(),
        width = gray.width(),
        height = gray.height(),
        "loaded mask"
    );
    Ok(Epoch::new(
        label,
        BinaryMask::from_gray(&gray, georeference.clone()),
    ))
}

fn print_report(result: &SeriesResult) {
    println!(
        "{:<12} {:<12} {:>10} {:>12} {:>12} {:>8}",
        "From", "To", "Interval", "Mean offset", "Rate", "Points"
    );
    println!("{}", "-".repeat(72));
    for e in &result.estimates {
        let flag = if e.degenerate { "  (degenerate)" } else { "" };
        println!(
            "{:<12} {:<12} {:>10.2} {:>12.3} {:>12.4} {:>8}{flag}",
            e.epoch_from, e.epoch_to, e.time_interval, e.mean_offset, e.rate, e.matched_points,
        );
    }

    if !result.baseline.is_empty() {
        println!();
        println!(
            "{:<12} {:<12} {:>12} {:>12}",
            "Baseline", "Epoch", "RMSE", "Hausdorff"
        );
        println!("{}", "-".repeat(52));
        for b in &result.baseline {
            println!(
                "{:<12} {:<12} {:>12.3} {:>12.3}",
                b.baseline, b.epoch, b.rmse, b.hausdorff
            );
        }
    }

    let shifts: Vec<_> = result.vectors.iter().flatten().collect();
    if !shifts.is_empty() {
        println!();
        println!("{:<12} {:<12} {:>14}", "From", "To", "Centroid shift");
        println!("{}", "-".repeat(40));
        for v in shifts {
            println!("{:<12} {:<12} {:>14.3}", v.epoch_from, v.epoch_to, v.distance);
        }
    }

    println!();
    println!("{}", result.diagnostics.report());
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let labels = match labels_from_cli(&cli) {
        Ok(labels) => labels,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let georeference = georeference_from_cli(&cli);
    let mut epochs = Vec::with_capacity(cli.masks.len());
    for (path, label) in cli.masks.iter().zip(labels) {
        match load_epoch(path, label, &georeference) {
            Ok(epoch) => epochs.push(epoch),
            Err(msg) => {
                eprintln!("{msg}");
                return ExitCode::FAILURE;
            }
        }
    }

    let pipeline = match EpochPipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Masks: {}", epochs.len());
    eprintln!("Config: {:#?}", pipeline.config());
    eprintln!();

    let result = match pipeline.run_detailed(epochs, cli.interval) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(estimates = result.estimates.len(), "pipeline finished");

    if cli.json {
        let output = serde_json::json!({
            "centerlines": result.centerlines,
            "estimates": result.estimates,
            "baseline": result.baseline,
            "vectors": result.vectors,
            "diagnostics": result.diagnostics,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing results: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&result);
    }

    ExitCode::SUCCESS
}
