//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (plus `.env` / environment fallbacks)
//! - runs training (corpus, augmentation, grid search, model save)
//! - recognizes images against a saved model
//! - prints reports and writes optional exports

use std::path::PathBuf;

use clap::Parser;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, RecognizeArgs, ShowArgs, TrainArgs};
use crate::data::DEFAULT_MNIST_URL;
use crate::domain::{HyperparameterGrid, RecognitionResult, RecognizeConfig, TrainConfig};
use crate::error::AppError;
use crate::io::load_model;
use crate::recognizer::Recognizer;

pub mod pipeline;

pub const ENV_MODEL_PATH: &str = "DIGITS_MODEL_PATH";
pub const ENV_DATA_DIR: &str = "DIGITS_DATA_DIR";
pub const ENV_MNIST_URL: &str = "DIGITS_MNIST_URL";

const DEFAULT_MODEL_PATH: &str = "model/digits.json";
const DEFAULT_DATA_DIR: &str = "data/mnist";
const DEFAULT_LOG_FILTER: &str = "digit_recog=info";

/// Ranked combinations shown in the terminal summary.
const SUMMARY_TOP_N: usize = 10;

/// Entry point for the `digits` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    // We want `digits img.png` to mean `digits recognize img.png` and
    // `digits --pca 40` to mean `digits train --pca 40`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Recognize(args) => handle_recognize(args),
        Command::Show(args) => handle_show(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = train_config_from_args(&args, &env_lookup)?;
    let run = pipeline::run_training(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.stats, &run.outcome, SUMMARY_TOP_N)
    );
    println!("{}", crate::report::format_evaluation(&run.evaluation));
    println!("Model saved to: {}", config.model_path.display());

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::write_results_csv(path, &run.outcome)?;
    }
    if let Some(path) = &config.debug_report {
        crate::debug::write_debug_report(path, &run)?;
    }

    Ok(())
}

fn handle_recognize(args: RecognizeArgs) -> Result<(), AppError> {
    let config = recognize_config_from_args(&args, &env_lookup);
    let recognizer = Recognizer::new(load_model(&config.model_path)?.into_handle());

    // One shared read-only model; files are read and recognized in parallel,
    // results printed in argument order.
    let results: Vec<Result<RecognitionResult, AppError>> = config
        .images
        .par_iter()
        .map(|path| {
            let bytes = std::fs::read(path).map_err(|e| {
                AppError::invalid_image(format!("Failed to read image '{}': {e}", path.display()))
            })?;
            Ok(recognizer.recognize(&bytes))
        })
        .collect();

    let mut first_error = None;
    for (path, result) in config.images.iter().zip(results) {
        let result = match result {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "image unreadable");
                first_error.get_or_insert(err);
                RecognitionResult::Error
            }
        };
        let json = serde_json::to_string(&result)
            .map_err(|e| AppError::io(format!("Failed to serialize result: {e}")))?;
        if config.images.len() > 1 {
            println!("{}\t{json}", path.display());
        } else {
            println!("{json}");
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let bytes = std::fs::read(&args.image).map_err(|e| {
        AppError::invalid_image(format!("Failed to read image '{}': {e}", args.image.display()))
    })?;
    let sample = crate::preprocess::normalize_bytes(&bytes)?;

    println!("normalized ({}):", args.image.display());
    print!("{}", crate::plot::render_sample(&sample));
    if args.deskew {
        println!("deskewed:");
        print!("{}", crate::plot::render_sample(&crate::preprocess::deskew(&sample)));
    }
    Ok(())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve training flags, environment values and defaults into a validated
/// [`TrainConfig`].
pub fn train_config_from_args(
    args: &TrainArgs,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<TrainConfig, AppError> {
    if args.folds < 2 {
        return Err(AppError::config(format!(
            "--folds must be at least 2 (got {}).",
            args.folds
        )));
    }
    if args.pca.contains(&0) {
        return Err(AppError::config("--pca values must be >= 1."));
    }
    if args.neighbors.contains(&0) {
        return Err(AppError::config("--neighbors values must be >= 1."));
    }
    if args.jobs == Some(0) {
        return Err(AppError::config("--jobs must be >= 1."));
    }
    if !(args.synthetic_test_fraction > 0.0 && args.synthetic_test_fraction < 1.0) {
        return Err(AppError::config(format!(
            "--synthetic-test-fraction must be in (0, 1) (got {}).",
            args.synthetic_test_fraction
        )));
    }

    Ok(TrainConfig {
        source: args.source,
        data_dir: args
            .data_dir
            .clone()
            .or_else(|| env(ENV_DATA_DIR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        download: args.download,
        mnist_url: args
            .mnist_url
            .clone()
            .or_else(|| env(ENV_MNIST_URL))
            .unwrap_or_else(|| DEFAULT_MNIST_URL.to_string()),
        synthetic_per_class: args.synthetic_per_class,
        synthetic_test_fraction: args.synthetic_test_fraction,

        model_path: resolve_model_path(args.model.as_ref(), env),
        grid: HyperparameterGrid {
            pca_components: args.pca.clone(),
            neighbors: args.neighbors.clone(),
            weightings: args.weights.clone(),
        },
        cv_folds: args.folds,
        seed: args.seed,
        jobs: args.jobs,
        augment: !args.no_augment,

        export_results: args.export_results.clone(),
        debug_report: args.debug_report.clone(),
    })
}

pub fn recognize_config_from_args(args: &RecognizeArgs, env: &dyn Fn(&str) -> Option<String>) -> RecognizeConfig {
    RecognizeConfig {
        model_path: resolve_model_path(args.model.as_ref(), env),
        images: args.images.clone(),
    }
}

fn resolve_model_path(flag: Option<&PathBuf>, env: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    flag.cloned()
        .or_else(|| env(ENV_MODEL_PATH).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH))
}

/// Rewrite argv so the common cases need no subcommand.
///
/// Rules:
/// - `digits`                        -> `digits help`
/// - `digits --pca 40 ...`           -> `digits train --pca 40 ...`
/// - `digits img.png ...`            -> `digits recognize img.png ...`
/// - `digits --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("help".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "train" | "recognize" | "show");
    if is_subcommand {
        return argv;
    }

    // A leading flag means "train flags"; anything else is an image path.
    if arg1.starts_with('-') {
        argv.insert(1, "train".to_string());
    } else {
        argv.insert(1, "recognize".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn train_args(extra: &[&str]) -> TrainArgs {
        let mut items = vec!["digits", "train"];
        items.extend_from_slice(extra);
        match crate::cli::Cli::parse_from(items).command {
            Command::Train(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn rewrite_args_defaults() {
        assert_eq!(rewrite_args(argv(&["digits"])), argv(&["digits", "help"]));
        assert_eq!(
            rewrite_args(argv(&["digits", "--pca", "40"])),
            argv(&["digits", "train", "--pca", "40"])
        );
        assert_eq!(
            rewrite_args(argv(&["digits", "seven.png"])),
            argv(&["digits", "recognize", "seven.png"])
        );
        assert_eq!(rewrite_args(argv(&["digits", "--help"])), argv(&["digits", "--help"]));
        assert_eq!(
            rewrite_args(argv(&["digits", "show", "x.png"])),
            argv(&["digits", "show", "x.png"])
        );
    }

    #[test]
    fn flags_override_environment_which_overrides_defaults() {
        let env = |key: &str| match key {
            ENV_MODEL_PATH => Some("/srv/env-model.json".to_string()),
            ENV_DATA_DIR => Some("/srv/mnist".to_string()),
            _ => None,
        };
        let no_env = |_: &str| -> Option<String> { None };

        let cfg = train_config_from_args(&train_args(&[]), &env).unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("/srv/env-model.json"));
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/mnist"));
        assert_eq!(cfg.mnist_url, DEFAULT_MNIST_URL);
        assert!(cfg.augment);

        let cfg = train_config_from_args(&train_args(&["--model", "m.json", "--no-augment"]), &env).unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("m.json"));
        assert!(!cfg.augment);

        let cfg = train_config_from_args(&train_args(&[]), &no_env).unwrap();
        assert_eq!(cfg.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(cfg.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn invalid_flags_are_config_errors() {
        let no_env = |_: &str| -> Option<String> { None };
        for extra in [
            &["--folds", "1"][..],
            &["--pca", "0,10"][..],
            &["--neighbors", "0"][..],
            &["--jobs", "0"][..],
            &["--synthetic-test-fraction", "1.5"][..],
        ] {
            let err = train_config_from_args(&train_args(extra), &no_env).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Config, "{extra:?}");
        }
    }
}
