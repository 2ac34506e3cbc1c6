use std::path::PathBuf;
use std::process;

use clap::Parser;

use auscan_core::pipeline::au_pipeline::AuPipeline;
use auscan_core::pipeline::factory::{create_pipeline_from_paths, ModelPaths};
use auscan_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use auscan_core::shared::constants::{
    AU_MANIFEST_NAME, AU_MANIFEST_URL, FACE_DETECTOR_MODEL_NAME, FACE_DETECTOR_MODEL_URL,
    LANDMARK_MODEL_NAME, LANDMARK_MODEL_URL,
};
use auscan_core::shared::model_resolver;

/// Facial Action Unit intensity estimation for single images.
#[derive(Parser)]
#[command(name = "auscan")]
struct Cli {
    /// Input image file.
    input: PathBuf,

    /// Directory containing the model files (falls back to the user
    /// cache, downloading on first use).
    #[arg(long)]
    models: Option<PathBuf>,

    /// Print results as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Print a per-stage timing summary after inference.
    #[arg(long)]
    timings: bool,
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

    let mut pipeline = build_pipeline(&cli)?;
    if cli.timings {
        pipeline.set_logger(Box::new(StdoutPipelineLogger::new()));
    }

    let img = image::open(&cli.input)?.to_rgb8();
    let (width, height) = img.dimensions();
    let buffer =
        ndarray::Array3::from_shape_vec((height as usize, width as usize, 3), img.into_raw())?;

    let result = pipeline.infer(buffer.view().into_dyn())?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let mut entries: Vec<_> = result.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, intensity) in entries {
            println!("{name}  {intensity:.3}");
        }
    }

    if cli.timings {
        pipeline.log_summary();
    }

    Ok(())
}

fn build_pipeline(cli: &Cli) -> Result<AuPipeline, Box<dyn std::error::Error>> {
    let paths = ModelPaths {
        face_detector: resolve_model(FACE_DETECTOR_MODEL_NAME, FACE_DETECTOR_MODEL_URL, cli)?,
        landmark_model: resolve_model(LANDMARK_MODEL_NAME, LANDMARK_MODEL_URL, cli)?,
        au_manifest: resolve_model(AU_MANIFEST_NAME, AU_MANIFEST_URL, cli)?,
    };
    Ok(create_pipeline_from_paths(&paths)?)
}

fn resolve_model(
    name: &str,
    url: &str,
    cli: &Cli,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let progress = Box::new(|downloaded: u64, total: u64| {
        if total > 0 {
            let pct = downloaded as f64 / total as f64 * 100.0;
            log::info!("downloading: {pct:.0}%");
        }
    });
    let path = model_resolver::resolve(name, url, cli.models.as_deref(), Some(progress))?;
    log::debug!("using {name} from {}", path.display());
    Ok(path)
}
