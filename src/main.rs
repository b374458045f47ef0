use clap::Parser;
use image::ImageReader;
use std::path::{Path, PathBuf};

use digitpad::DigitRecognizer;
use digitpad::detection::annotate::{AnnotationStyle, annotate};
use digitpad::detection::classifier::MODEL_DIR;

#[derive(Parser)]
#[command(name = "digitpad")]
#[command(about = "Draw digits with the mouse and let a pretrained model read them")]
struct Cli {
    /// Directory holding model.json and the model weights
    #[arg(long, value_name = "DIR", default_value = MODEL_DIR)]
    model_dir: PathBuf,

    /// Classify the digits in this image instead of opening the drawing window
    #[arg(long, value_name = "IMAGE")]
    image: Option<PathBuf>,

    /// Write the annotated result to this file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    // The model has to be usable before anything is drawn
    let mut recognizer = DigitRecognizer::from_model_dir(&args.model_dir)?
        .with_verbose(args.verbose);
    if let Some(debug_dir) = args.debug_out {
        recognizer = recognizer.with_debug(debug_dir);
    }

    match args.image {
        Some(path) => run_headless(&recognizer, &path, args.save.as_deref()),
        None => run_gui(recognizer, args.save),
    }
}

fn run_headless(recognizer: &DigitRecognizer, path: &Path, save: Option<&Path>) -> anyhow::Result<()> {
    log::info!("Loading image: {:?}", path);
    let canvas = ImageReader::open(path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?
        .to_rgb8();

    let predictions = recognizer.recognize(&canvas)?;

    println!("\n=== Digit Predictions ===");
    println!("Total digits detected: {}", predictions.len());
    for prediction in &predictions {
        let bbox = prediction.bbox;
        println!("  {} at ({}, {}) {}x{}",
            prediction.label(), bbox.x, bbox.y, bbox.width, bbox.height);
    }

    if let Some(out) = save {
        annotate(&canvas, &predictions, &AnnotationStyle::default())
            .save(out)
            .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", out.display(), e))?;
        log::info!("Annotated image written to {}", out.display());
    }

    Ok(())
}

#[cfg(feature = "gui")]
fn run_gui(recognizer: DigitRecognizer, save: Option<PathBuf>) -> anyhow::Result<()> {
    digitpad::gui::run(recognizer, save)
        .map_err(|e| anyhow::anyhow!("Window error: {}", e))
}

#[cfg(not(feature = "gui"))]
fn run_gui(_recognizer: DigitRecognizer, _save: Option<PathBuf>) -> anyhow::Result<()> {
    anyhow::bail!("Built without the `gui` feature; pass --image to classify a file")
}
