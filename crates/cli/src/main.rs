use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use lightmap_core::config::LightmapConfig;
use lightmap_core::density::domain::cluster_config::ClusterThreshold;
use lightmap_core::detection::domain::detection_config::ThresholdPolicy;
use lightmap_core::detection::infrastructure::tophat_light_detector::TopHatLightDetector;
use lightmap_core::media::infrastructure::image_dir_reader::ImageDirReader;
use lightmap_core::media::infrastructure::image_file_writer::ImageFileWriter;
use lightmap_core::media::infrastructure::json_report_store::JsonReportStore;
use lightmap_core::pipeline::batch_executor::{BatchExecutor, SequentialBatchExecutor};
use lightmap_core::pipeline::cluster_crops_use_case::ClusterCropsUseCase;
use lightmap_core::pipeline::composite_use_case::CompositeUseCase;
use lightmap_core::pipeline::detect_lights_use_case::{DetectLightsUseCase, DetectionOutputs};
use lightmap_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use lightmap_core::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use lightmap_core::shared::constants::{IMAGE_EXTENSIONS, OUT_CLUSTER_BOXES, OUT_HEATMAP};

/// Point-light detection over frame batches and stationary-light mapping.
#[derive(Parser)]
#[command(name = "lightmap", version)]
struct Cli {
    /// JSON config file; flags below override what it sets.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads for detection and accumulation (default: all cores).
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect lights in every frame, writing annotated and cropped frames
    /// plus a JSON report.
    Detect {
        #[command(flatten)]
        paths: DetectPaths,
        #[command(flatten)]
        tuning: DetectTuning,
    },
    /// Build max/mean composites and the detection heatmap.
    Composite {
        #[command(flatten)]
        paths: CompositePaths,
        #[command(flatten)]
        tuning: HeatmapTuning,
    },
    /// Segment a heatmap image into clusters and write enlarged crops.
    Clusters {
        /// Heatmap image to segment.
        #[arg(long, default_value = "./composite_out/composite_heatmap.png")]
        heatmap: PathBuf,
        /// Directory for cluster crops.
        #[arg(long, default_value = "./composite_out/crops")]
        out_dir: PathBuf,
        /// Debug image with cluster rectangles.
        #[arg(long, default_value = "./composite_out/heatmap_boxes.png")]
        debug: PathBuf,
        #[command(flatten)]
        tuning: ClusterTuning,
    },
    /// Detect, composite and cluster in one pass.
    Run {
        #[command(flatten)]
        paths: DetectPaths,
        /// Directory for composites and cluster output.
        #[arg(long, default_value = "./composite_out")]
        out_dir: PathBuf,
        #[command(flatten)]
        detect: DetectTuning,
        #[command(flatten)]
        heatmap: HeatmapTuning,
        #[command(flatten)]
        cluster: ClusterTuning,
    },
}

#[derive(Args)]
struct DetectPaths {
    /// Directory of input frames.
    #[arg(long, default_value = "./frames")]
    input: PathBuf,
    /// Directory for annotated frames.
    #[arg(long, default_value = "./annotated")]
    annotated: PathBuf,
    /// Directory for cropped frames.
    #[arg(long, default_value = "./cropped")]
    cropped: PathBuf,
    /// Detection report path.
    #[arg(long, default_value = "./detection_report.json")]
    report: PathBuf,
}

#[derive(Args)]
struct CompositePaths {
    /// Directory of annotated frames.
    #[arg(long, default_value = "./annotated")]
    annotated: PathBuf,
    /// Detection report path.
    #[arg(long, default_value = "./detection_report.json")]
    report: PathBuf,
    /// Directory for composites.
    #[arg(long, default_value = "./composite_out")]
    out_dir: PathBuf,
}

#[derive(Args)]
struct DetectTuning {
    /// Frame file extension.
    #[arg(long)]
    ext: Option<String>,
    /// Top-hat structuring element size (odd).
    #[arg(long)]
    kernel_size: Option<usize>,
    /// Residual threshold: fixed, adaptive or otsu.
    #[arg(long)]
    threshold: Option<String>,
    /// Level for the fixed threshold (1-254).
    #[arg(long)]
    fixed_thresh: Option<i32>,
    /// Gamma applied before suppression (1.0 disables).
    #[arg(long)]
    gamma: Option<f64>,
    /// Enable tile-based histogram equalization.
    #[arg(long)]
    equalize: bool,
    #[arg(long)]
    min_area: Option<i64>,
    #[arg(long)]
    max_area: Option<i64>,
    #[arg(long)]
    min_brightness: Option<u32>,
    /// Pixels added to each side of a detection when drawing and cropping.
    #[arg(long)]
    box_grow: Option<i32>,
    /// Pixels added around the union of grown boxes for the crop.
    #[arg(long)]
    padding: Option<i32>,
}

#[derive(Args)]
struct HeatmapTuning {
    /// Heatmap opacity over the mean stack (0.0-1.0).
    #[arg(long)]
    overlay_alpha: Option<f64>,
    #[arg(long)]
    low_percentile: Option<f64>,
    #[arg(long)]
    high_percentile: Option<f64>,
    /// Skip the heatmap and overlay.
    #[arg(long)]
    no_heatmap: bool,
}

#[derive(Args)]
struct ClusterTuning {
    /// Cluster threshold: percentile, otsu or fixed.
    #[arg(long)]
    cluster_mode: Option<String>,
    /// Percentile for the percentile mode (0-100).
    #[arg(long)]
    percentile: Option<f64>,
    /// Level for the fixed mode (0-255).
    #[arg(long)]
    cluster_thresh: Option<i32>,
    #[arg(long)]
    cluster_min_area: Option<i64>,
    #[arg(long)]
    cluster_padding: Option<i32>,
    /// Upscale factor for cluster crops.
    #[arg(long)]
    scale_factor: Option<f64>,
    /// Longest side of a cluster crop after scaling.
    #[arg(long)]
    max_output_long: Option<u32>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => LightmapConfig::load(path)?,
        None => LightmapConfig::default(),
    };
    let workers = cli.workers.unwrap_or_else(default_workers).max(1);

    match cli.command {
        Command::Detect { paths, tuning } => {
            apply_detect(&mut config, &tuning)?;
            validate_dir(&paths.input)?;
            run_detect(&config, &paths, workers)?;
        }
        Command::Composite { paths, tuning } => {
            apply_heatmap(&mut config, &tuning);
            validate_dir(&paths.annotated)?;
            run_composite(&config, &paths, workers)?;
        }
        Command::Clusters {
            heatmap,
            out_dir,
            debug,
            tuning,
        } => {
            apply_cluster(&mut config, &tuning)?;
            if !heatmap.is_file() {
                return Err(format!("Heatmap not found: {}", heatmap.display()).into());
            }
            let mut use_case = ClusterCropsUseCase::new(
                Box::new(ImageFileWriter::new()),
                Box::new(LogPipelineLogger::default()),
                &config.cluster,
            );
            let crops = use_case.execute(&heatmap, &out_dir, &debug)?;
            log::info!("Saved {} cluster crops to {}", crops.len(), out_dir.display());
        }
        Command::Run {
            paths,
            out_dir,
            detect,
            heatmap,
            cluster,
        } => {
            apply_detect(&mut config, &detect)?;
            apply_heatmap(&mut config, &heatmap);
            apply_cluster(&mut config, &cluster)?;
            validate_dir(&paths.input)?;
            run_all(&config, &paths, &out_dir, workers)?;
        }
    }

    Ok(())
}

fn run_detect(
    config: &LightmapConfig,
    paths: &DetectPaths,
    workers: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let logger = LogPipelineLogger::default();
    let mut use_case = detect_use_case(config, workers, Box::new(logger));
    let run = use_case.execute(&paths.input, &detection_outputs(paths))?;
    log::info!(
        "Processed {} frames, {} lights total",
        run.reports.len(),
        run.total_lights()
    );
    Ok(())
}

fn run_composite(
    config: &LightmapConfig,
    paths: &CompositePaths,
    workers: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut use_case = composite_use_case(config, workers);
    let run = use_case.execute(&paths.annotated, &paths.report, &paths.out_dir)?;
    for path in &run.written {
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

/// Detection, then composites from the in-memory report, then clusters
/// segmented straight from the normalized density map.
fn run_all(
    config: &LightmapConfig,
    paths: &DetectPaths,
    out_dir: &Path,
    workers: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut detect = detect_use_case(config, workers, Box::new(LogPipelineLogger::default()));
    let detection = detect.execute(&paths.input, &detection_outputs(paths))?;
    if detection.is_empty() {
        return Ok(());
    }

    let mut composite = composite_use_case(config, workers);
    let composites = composite.execute_with_reports(&paths.annotated, &detection.reports, out_dir)?;

    let (Some(density), Some(heat)) = (composites.density, composites.heatmap) else {
        log::info!("Heatmap disabled; skipping clusters");
        return Ok(());
    };

    let mut clusters = ClusterCropsUseCase::new(
        Box::new(ImageFileWriter::new()),
        Box::new(LogPipelineLogger::default()),
        &config.cluster,
    );
    let crops = clusters.execute_on(
        &heat,
        density.grid(),
        &out_dir.join("crops"),
        &out_dir.join(OUT_CLUSTER_BOXES),
    )?;
    log::info!(
        "{} frames, {} lights, {} clusters; heatmap at {}",
        detection.reports.len(),
        detection.total_lights(),
        crops.len(),
        out_dir.join(OUT_HEATMAP).display()
    );
    Ok(())
}

fn detect_use_case(
    config: &LightmapConfig,
    workers: usize,
    logger: Box<dyn PipelineLogger>,
) -> DetectLightsUseCase {
    let executor: Box<dyn BatchExecutor> = if workers > 1 {
        Box::new(ThreadedBatchExecutor::new(workers))
    } else {
        Box::new(SequentialBatchExecutor::new())
    };
    DetectLightsUseCase::new(
        Box::new(ImageDirReader::with_extension(&config.detection.extension)),
        Arc::new(TopHatLightDetector::new(&config.detection)),
        executor,
        Box::new(ImageFileWriter::new()),
        Box::new(JsonReportStore::new()),
        logger,
        &config.detection,
    )
}

fn composite_use_case(config: &LightmapConfig, workers: usize) -> CompositeUseCase {
    CompositeUseCase::new(
        Box::new(ImageDirReader::new(IMAGE_EXTENSIONS)),
        Box::new(ImageFileWriter::new()),
        Box::new(JsonReportStore::new()),
        Box::new(LogPipelineLogger::default()),
        &config.heatmap,
        workers,
    )
}

fn detection_outputs(paths: &DetectPaths) -> DetectionOutputs {
    DetectionOutputs {
        annotated_dir: paths.annotated.clone(),
        cropped_dir: paths.cropped.clone(),
        report_path: paths.report.clone(),
    }
}

fn apply_detect(
    config: &mut LightmapConfig,
    t: &DetectTuning,
) -> Result<(), Box<dyn std::error::Error>> {
    let d = &mut config.detection;
    if let Some(ext) = &t.ext {
        d.extension = ext.clone();
    }
    if let Some(k) = t.kernel_size {
        d.kernel_size = k;
    }
    if let Some(mode) = &t.threshold {
        d.threshold = match mode.as_str() {
            "fixed" => ThresholdPolicy::Fixed {
                value: t.fixed_thresh.unwrap_or(20),
            },
            "adaptive" => ThresholdPolicy::Adaptive,
            "otsu" => ThresholdPolicy::Otsu,
            other => {
                return Err(format!(
                    "Threshold must be 'fixed', 'adaptive' or 'otsu', got '{other}'"
                )
                .into())
            }
        };
    } else if let Some(value) = t.fixed_thresh {
        d.threshold = ThresholdPolicy::Fixed { value };
    }
    if let Some(g) = t.gamma {
        d.gamma = g;
    }
    if t.equalize {
        d.equalize = true;
    }
    if let Some(v) = t.min_area {
        d.min_area = v;
    }
    if let Some(v) = t.max_area {
        d.max_area = v;
    }
    if let Some(v) = t.min_brightness {
        d.min_brightness = v;
    }
    if let Some(v) = t.box_grow {
        d.box_grow = v;
    }
    if let Some(v) = t.padding {
        d.padding = v;
    }
    Ok(())
}

fn apply_heatmap(config: &mut LightmapConfig, t: &HeatmapTuning) {
    let h = &mut config.heatmap;
    if let Some(a) = t.overlay_alpha {
        h.overlay_alpha = a;
    }
    if let Some(p) = t.low_percentile {
        h.low_percentile = p;
    }
    if let Some(p) = t.high_percentile {
        h.high_percentile = p;
    }
    if t.no_heatmap {
        h.make_heatmap = false;
    }
}

fn apply_cluster(
    config: &mut LightmapConfig,
    t: &ClusterTuning,
) -> Result<(), Box<dyn std::error::Error>> {
    let c = &mut config.cluster;
    if let Some(mode) = &t.cluster_mode {
        c.threshold = match mode.as_str() {
            "percentile" => ClusterThreshold::Percentile {
                percentile: t.percentile.unwrap_or(92.0),
            },
            "otsu" => ClusterThreshold::Otsu,
            "fixed" => ClusterThreshold::Fixed {
                value: t.cluster_thresh.unwrap_or(30),
            },
            other => {
                return Err(format!(
                    "Cluster mode must be 'percentile', 'otsu' or 'fixed', got '{other}'"
                )
                .into())
            }
        };
    } else if let Some(percentile) = t.percentile {
        c.threshold = ClusterThreshold::Percentile { percentile };
    } else if let Some(value) = t.cluster_thresh {
        c.threshold = ClusterThreshold::Fixed { value };
    }
    if let Some(v) = t.cluster_min_area {
        c.min_area = v;
    }
    if let Some(v) = t.cluster_padding {
        c.padding = v;
    }
    if let Some(v) = t.scale_factor {
        c.scale_factor = v;
    }
    if let Some(v) = t.max_output_long {
        c.max_output_long = v;
    }
    Ok(())
}

fn validate_dir(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("Input directory not found: {}", dir.display()).into());
    }
    Ok(())
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_detect_defaults() {
        let cli = Cli::try_parse_from(["lightmap", "detect"]).unwrap();
        let Command::Detect { paths, .. } = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(paths.input, PathBuf::from("./frames"));
        assert_eq!(paths.report, PathBuf::from("./detection_report.json"));
    }

    #[test]
    fn test_detect_overrides_apply() {
        let cli = Cli::try_parse_from([
            "lightmap",
            "detect",
            "--threshold",
            "fixed",
            "--fixed-thresh",
            "35",
            "--kernel-size",
            "15",
            "--equalize",
        ])
        .unwrap();
        let Command::Detect { tuning, .. } = cli.command else {
            panic!("expected detect");
        };
        let mut config = LightmapConfig::default();
        apply_detect(&mut config, &tuning).unwrap();
        assert_eq!(config.detection.threshold, ThresholdPolicy::Fixed { value: 35 });
        assert_eq!(config.detection.kernel_size, 15);
        assert!(config.detection.equalize);
    }

    #[test]
    fn test_unknown_threshold_rejected() {
        let cli = Cli::try_parse_from(["lightmap", "detect", "--threshold", "magic"]).unwrap();
        let Command::Detect { tuning, .. } = cli.command else {
            panic!("expected detect");
        };
        assert!(apply_detect(&mut LightmapConfig::default(), &tuning).is_err());
    }

    #[test]
    fn test_cluster_percentile_flag_implies_mode() {
        let cli = Cli::try_parse_from(["lightmap", "clusters", "--percentile", "80"]).unwrap();
        let Command::Clusters { tuning, .. } = cli.command else {
            panic!("expected clusters");
        };
        let mut config = LightmapConfig::default();
        apply_cluster(&mut config, &tuning).unwrap();
        assert_eq!(
            config.cluster.threshold,
            ClusterThreshold::Percentile { percentile: 80.0 }
        );
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["lightmap", "run", "--workers", "3"]).unwrap();
        assert_eq!(cli.workers, Some(3));
    }

    #[test]
    fn test_no_heatmap_flag() {
        let cli = Cli::try_parse_from(["lightmap", "composite", "--no-heatmap"]).unwrap();
        let Command::Composite { tuning, .. } = cli.command else {
            panic!("expected composite");
        };
        let mut config = LightmapConfig::default();
        apply_heatmap(&mut config, &tuning);
        assert!(!config.heatmap.make_heatmap);
    }

    #[test]
    fn test_validate_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_dir(dir.path()).is_ok());
        assert!(validate_dir(&dir.path().join("missing")).is_err());
    }
}
