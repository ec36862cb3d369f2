use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use toonface_core::compositing::infrastructure::falloff_compositor::FalloffCompositor;
use toonface_core::detection::domain::face_locator::FaceLocator;
use toonface_core::detection::infrastructure::face_analysis_model::FaceAnalysisModel;
use toonface_core::detection::infrastructure::insightface_locator::InsightFaceLocator;
use toonface_core::pipeline::batch_executor::{BatchExecutor, BatchJob};
use toonface_core::pipeline::personalize_use_case::{PersonalizeOptions, PersonalizeUseCase};
use toonface_core::pipeline::pipeline_logger::{PipelineLogger, TimingPipelineLogger};
use toonface_core::pipeline::settings::PipelineSettings;
use toonface_core::pipeline::target_region::TargetRegionPolicy;
use toonface_core::shared::constants::IMAGE_EXTENSIONS;
use toonface_core::shared::image_codec;
use toonface_core::shared::model_resolver;
use toonface_core::stylizing::infrastructure::cartoon_stylizer::CartoonStylizer;

/// Turn a face photo into a cartoon likeness blended into an illustration.
#[derive(Parser)]
#[command(name = "toonface")]
struct Cli {
    /// Settings JSON (defaults to the platform config dir, then built-ins).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding det_10g.onnx, w600k_r50.onnx and genderage.onnx.
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(flatten)]
    knobs: Knobs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stylize the largest face of a photo into a template.
    Personalize {
        photo: PathBuf,
        template: PathBuf,
        /// Output PNG.
        output: PathBuf,
    },
    /// Print every detected face as JSON.
    Detect { photo: PathBuf },
    /// Personalize several photos against one template.
    Batch {
        template: PathBuf,
        /// Directory receiving one `<photo stem>.png` per success.
        output_dir: PathBuf,
        /// Photo files, or directories scanned for images.
        #[arg(required = true)]
        photos: Vec<PathBuf>,
        /// Worker threads.
        #[arg(long, default_value = "4")]
        workers: usize,
    },
}

/// Per-run overrides of individual settings.
#[derive(Args, Default)]
struct Knobs {
    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, global = true)]
    confidence: Option<f32>,

    /// Canny low threshold.
    #[arg(long, global = true)]
    edge_low: Option<f32>,

    /// Canny high threshold.
    #[arg(long, global = true)]
    edge_high: Option<f32>,

    /// Bilateral filter radius in pixels.
    #[arg(long, global = true)]
    smoothing_radius: Option<u32>,

    /// Bilateral colour tolerance.
    #[arg(long, global = true)]
    smoothing_tolerance: Option<f64>,

    /// Number of palette colours.
    #[arg(long, global = true)]
    colors: Option<usize>,

    /// Face padding as a fraction of the box size per side.
    #[arg(long, global = true)]
    padding: Option<f64>,

    /// Centred target size as template fractions, e.g. `0.3,0.4`.
    #[arg(long, global = true, value_delimiter = ',')]
    target_fraction: Option<Vec<f64>>,
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
    let settings = load_settings(cli.config.as_deref(), &cli.knobs)?;

    match &cli.command {
        Command::Personalize {
            photo,
            template,
            output,
        } => run_personalize(&cli, &settings, photo, template, output),
        Command::Detect { photo } => run_detect(&cli, &settings, photo),
        Command::Batch {
            template,
            output_dir,
            photos,
            workers,
        } => run_batch(&cli, &settings, template, output_dir, photos, *workers),
    }
}

fn run_personalize(
    cli: &Cli,
    settings: &PipelineSettings,
    photo: &Path,
    template: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = read_input(photo)?;
    let template_bytes = read_input(template)?;

    let model = load_model(cli, settings)?;
    let logger = Arc::new(TimingPipelineLogger::new());
    let use_case = build_use_case(Box::new(InsightFaceLocator::new(model.clone())), settings)
        .with_logger(logger.clone());

    let run = use_case.process(&source, &template_bytes);
    logger.summary();
    drop(use_case);
    drop(model);

    match run.outcome {
        Ok(out) => {
            fs::write(output, &out.png)?;
            log::info!(
                "Face blended at {:?}; output written to {}",
                out.composite.region,
                output.display()
            );
            Ok(())
        }
        Err(failure) => {
            log::debug!("{failure}");
            Err(failure.user_message().into())
        }
    }
}

fn run_detect(
    cli: &Cli,
    settings: &PipelineSettings,
    photo: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = image_codec::decode(&read_input(photo)?)?;
    let model = load_model(cli, settings)?;
    let locator = InsightFaceLocator::new(model);
    let detections = locator.locate(&image)?;

    let faces: Vec<_> = detections
        .detections()
        .iter()
        .map(|d| {
            serde_json::json!({
                "bbox": d.bbox.as_array(),
                "landmarks": d.landmarks.points(),
                "age": d.age,
                "gender": d.gender,
                "score": d.score,
                "near_frontal": d.landmarks.is_near_frontal(),
                "embedding_len": d.embedding.len(),
            })
        })
        .collect();
    let (width, height) = detections.image_shape();
    let report = serde_json::json!({
        "image": { "width": width, "height": height },
        "faces": faces,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_batch(
    cli: &Cli,
    settings: &PipelineSettings,
    template: &Path,
    output_dir: &Path,
    photos: &[PathBuf],
    workers: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let template_bytes = read_input(template)?;
    let paths = collect_photos(photos)?;
    if paths.is_empty() {
        return Err("No JPEG or PNG photos found".into());
    }
    fs::create_dir_all(output_dir)?;

    let jobs = paths
        .iter()
        .map(|p| {
            Ok(BatchJob {
                name: p
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string()),
                source: read_input(p)?,
            })
        })
        .collect::<Result<Vec<_>, Box<dyn std::error::Error>>>()?;

    let model = load_model(cli, settings)?;
    let logger = Arc::new(TimingPipelineLogger::new());
    let use_case = build_use_case(Box::new(InsightFaceLocator::new(model.clone())), settings)
        .with_logger(logger.clone());
    let executor = BatchExecutor::new(Arc::new(use_case), template_bytes, workers);

    let outcomes = executor.run(jobs);
    logger.summary();
    drop(executor);
    drop(model);

    let mut failed = 0;
    for outcome in outcomes {
        match outcome.run.outcome {
            Ok(out) => {
                let path = output_dir.join(format!("{}.png", outcome.name));
                fs::write(&path, &out.png)?;
                println!("{}: written to {}", outcome.name, path.display());
            }
            Err(failure) => {
                failed += 1;
                println!("{}: {}", outcome.name, failure.user_message());
            }
        }
    }
    if failed > 0 {
        log::warn!("{failed} photo(s) could not be personalized");
    }
    Ok(())
}

fn build_use_case(locator: Box<dyn FaceLocator>, settings: &PipelineSettings) -> PersonalizeUseCase {
    PersonalizeUseCase::new(
        locator,
        Box::new(CartoonStylizer::new(settings.stylizer.clone())),
        Box::new(FalloffCompositor::new(settings.composite.mask_core_fraction)),
        PersonalizeOptions {
            selection: settings.face_selection,
            target_region: settings.composite.target_region,
            min_target_size: settings.composite.min_target_size,
        },
    )
}

fn load_model(
    cli: &Cli,
    settings: &PipelineSettings,
) -> Result<Arc<FaceAnalysisModel>, Box<dyn std::error::Error>> {
    log::info!("Resolving face analysis models");
    let progress: &model_resolver::ProgressFn = &download_progress;
    let paths = model_resolver::resolve_all(cli.model_dir.as_deref(), Some(progress))?;
    let model = FaceAnalysisModel::load(
        &paths,
        settings.detection.confidence,
        settings.detection.nms_iou,
    )?;
    Ok(Arc::new(model))
}

fn load_settings(
    config: Option<&Path>,
    knobs: &Knobs,
) -> Result<PipelineSettings, Box<dyn std::error::Error>> {
    let mut settings = match config {
        Some(path) => PipelineSettings::load(path)?,
        None => PipelineSettings::load_default()?,
    };
    apply_knobs(&mut settings, knobs)?;
    settings.validate()?;
    Ok(settings)
}

fn apply_knobs(
    settings: &mut PipelineSettings,
    knobs: &Knobs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(v) = knobs.confidence {
        settings.detection.confidence = v;
    }
    let s = &mut settings.stylizer;
    if let Some(v) = knobs.edge_low {
        s.edge_low = v;
    }
    if let Some(v) = knobs.edge_high {
        s.edge_high = v;
    }
    if let Some(v) = knobs.smoothing_radius {
        s.smoothing_radius = v;
    }
    if let Some(v) = knobs.smoothing_tolerance {
        s.smoothing_color_sigma = v;
    }
    if let Some(v) = knobs.colors {
        s.clusters = v;
    }
    if let Some(v) = knobs.padding {
        s.padding = v;
    }
    if let Some(f) = knobs.target_fraction.as_deref() {
        let [w, h] = *f else {
            return Err(format!(
                "--target-fraction takes WIDTH,HEIGHT, got {} value(s)",
                f.len()
            )
            .into());
        };
        settings.composite.target_region = TargetRegionPolicy::Centered {
            width_fraction: w,
            height_fraction: h,
        };
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    fs::read(path).map_err(|e| format!("Cannot read {}: {e}", path.display()).into())
}

/// Expand directories into the image files they contain, sorted by name.
fn collect_photos(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut photos = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image(p))
                .collect();
            found.sort();
            photos.extend(found);
        } else {
            photos.push(input.clone());
        }
    }
    Ok(photos)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(model: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {model}... {pct}%");
    } else {
        eprint!("\rDownloading {model}... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}
