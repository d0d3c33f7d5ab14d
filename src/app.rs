//! # Command Line Application
//!
//! `topoblock [RASTER] [CONFIG] [OUTPUT]`
//!
//! * `RASTER`: PNG or TIFF heightmap; `-` or missing generates a Perlin field
//! * `CONFIG`: JSON [`GenerationConfig`]; `-` or missing uses defaults
//! * `OUTPUT`: optional path for a JSON dump of the generated world

use std::{
    fs::File,
    io::{self, BufWriter},
    path::PathBuf,
    sync::Arc,
};

use log::{error, info};
use thiserror::Error;

use crate::{
    config::GenerationConfig,
    error::{BuildError, ConfigError, RasterError, SourceError},
    raster::{source, ElevationSampler, RasterSamples},
    world::{BuildReport, GridWorldBuilder},
};

/// Side of the synthetic raster generated when no file is given.
const DEFAULT_SYNTHETIC_SIZE: usize = 256;

/// Skipped cells named in the summary line; the sink already warned about each one.
const SUMMARY_CELL_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to write world: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize world: {0}")]
    Export(#[from] serde_json::Error),
}

/// Positional arguments.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Args {
    pub raster: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Args {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut positional = args
            .into_iter()
            .map(|arg| (arg != "-").then(|| PathBuf::from(arg)));

        Self {
            raster: positional.next().flatten(),
            config: positional.next().flatten(),
            output: positional.next().flatten(),
        }
    }
}

pub fn run(args: Args) -> Result<(), AppError> {
    let config = match &args.config {
        Some(path) => GenerationConfig::from_json_file(path)?,
        None => GenerationConfig::default(),
    };

    let raster = load_raster(&args)?;
    let sampler = ElevationSampler::from_raster(raster, config.output_range)?;
    let range = sampler.range();
    info!(
        "Elevation range {:.2}..={:.2} mapped to {}..={}",
        range.min, range.max, config.output_range.min, config.output_range.max
    );

    let builder = GridWorldBuilder::new(config)?.with_progress(|completed, total| {
        info!(
            "Loaded block {:.1}%",
            completed as f64 / total as f64 * 100.0
        );
    });
    let (world, report) = builder.build_world(Arc::new(sampler))?;

    if let Some(stats) = world.height_stats() {
        info!(
            "Block heights: min {}, max {}, mean {:.1}",
            stats.min, stats.max, stats.mean
        );
    }
    if let Some(summary) = skipped_summary(&report) {
        error!("{summary}");
    }

    if let Some(path) = &args.output {
        let writer = BufWriter::new(File::create(path)?);
        world.write_json(writer)?;
        info!("Wrote {} blocks to {}", world.len(), path.display());
    }

    Ok(())
}

/// One line describing the cells missing from the world, if any.
fn skipped_summary(report: &BuildReport) -> Option<String> {
    if report.skipped.is_empty() {
        return None;
    }

    let cells: Vec<String> = report
        .skipped
        .iter()
        .take(SUMMARY_CELL_LIMIT)
        .map(|cell| format!("({}, {})", cell.x, cell.y))
        .collect();
    let more = report.skipped.len().saturating_sub(SUMMARY_CELL_LIMIT);
    let tail = if more > 0 {
        format!(" and {more} more")
    } else {
        String::new()
    };

    Some(format!(
        "{} of {} cells missing from world: {}{}",
        report.skipped.len(),
        report.total,
        cells.join(", "),
        tail
    ))
}

fn load_raster(args: &Args) -> Result<RasterSamples, AppError> {
    match &args.raster {
        Some(path) => Ok(source::from_image(path)?),
        None => {
            let seed = fastrand::u32(..);
            info!(
                "No raster given, generating {0}x{0} Perlin terrain with seed {1}",
                DEFAULT_SYNTHETIC_SIZE, seed
            );
            Ok(source::perlin(
                DEFAULT_SYNTHETIC_SIZE,
                DEFAULT_SYNTHETIC_SIZE,
                seed,
                source::PERLIN_SCALE_FACTOR,
            )?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_positional_arguments() {
        let args = Args::parse(strings(&["dem.png", "config.json", "world.json"]));
        assert_eq!(args.raster, Some(PathBuf::from("dem.png")));
        assert_eq!(args.config, Some(PathBuf::from("config.json")));
        assert_eq!(args.output, Some(PathBuf::from("world.json")));
    }

    #[test]
    fn dash_and_missing_arguments_are_none() {
        let args = Args::parse(strings(&["-", "config.json"]));
        assert_eq!(args.raster, None);
        assert_eq!(args.config, Some(PathBuf::from("config.json")));
        assert_eq!(args.output, None);
        assert_eq!(Args::parse(Vec::new()), Args::default());
    }

    #[test]
    fn skipped_cells_are_summarized_on_one_line() {
        use crate::world::SkipReason;

        let sampler = ElevationSampler::initialize((0..30).map(|i| i as f32).collect(), 10, 3).unwrap();
        let builder = GridWorldBuilder::new(
            GenerationConfig::default()
                .with_grid_size(10)
                .with_worker_count(2),
        )
        .unwrap();
        let (_, report) = builder.build_world(Arc::new(sampler)).unwrap();
        assert_eq!(report.skipped.len(), 70);
        assert!(report
            .skipped
            .iter()
            .all(|cell| matches!(cell.reason, SkipReason::Raster(_))));

        let summary = skipped_summary(&report).unwrap();
        assert!(!summary.contains('\n'));
        assert!(summary.starts_with("70 of 100 cells missing from world: "));
        assert!(summary.ends_with(" and 65 more"));
        assert_eq!(summary.matches('(').count(), SUMMARY_CELL_LIMIT);
    }

    #[test]
    fn complete_build_has_no_skip_summary() {
        let sampler = ElevationSampler::initialize(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let (_, report) = GridWorldBuilder::new(GenerationConfig::default().with_worker_count(1))
            .unwrap()
            .build_world(Arc::new(sampler))
            .unwrap();
        assert_eq!(skipped_summary(&report), None);
    }

    #[test]
    fn synthetic_run_writes_world() {
        let dir = std::env::temp_dir();
        let id = fastrand::u64(..);
        let config_path = dir.join(format!("topoblock-config-{id}.json"));
        let output_path = dir.join(format!("topoblock-world-{id}.json"));
        std::fs::write(&config_path, r#"{ "grid_size": 8, "worker_count": 2 }"#).unwrap();

        run(Args {
            raster: None,
            config: Some(config_path.clone()),
            output: Some(output_path.clone()),
        })
        .unwrap();

        let json = std::fs::read(&output_path).unwrap();
        let _ = std::fs::remove_file(&config_path);
        let _ = std::fs::remove_file(&output_path);

        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["grid_size"], 8);
        assert_eq!(value["blocks"].as_array().unwrap().len(), 64);
    }
}
