//! Synthetic sample generation CLI
//!
//! Composites randomly augmented foreground objects onto backgrounds and
//! writes the results to a class-bucketed output directory.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use synthgen::utils::logging::{init_logging, LogConfig};
use synthgen::{GeneratorConfig, ImagePool, ImageSource, SampleGenerator, TransformConfig};

/// Synthetic training-image generator
///
/// Builds labeled training samples by compositing augmented foreground
/// objects onto background images.
#[derive(Parser, Debug)]
#[command(name = "synthgen")]
#[command(version)]
#[command(about = "Composite augmented foregrounds onto backgrounds", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate composited training samples
    Generate {
        /// Foreground source: image file, path-list file, or directory
        #[arg(short, long)]
        images: PathBuf,

        /// Background source: image file, path-list file, or directory
        #[arg(short, long)]
        backgrounds: PathBuf,

        /// Output directory for generated samples
        #[arg(short, long, default_value = "output/samples")]
        output_dir: PathBuf,

        /// Number of samples to generate
        #[arg(short, long, default_value = "10")]
        num_samples: usize,

        /// Treat foreground subdirectories as class labels
        #[arg(long, default_value = "false")]
        classify: bool,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// JSON file with transformation parameters (unknown keys rejected)
        #[arg(long)]
        transform_config: Option<PathBuf>,

        /// Probability of each flip draw
        #[arg(long)]
        flip_prob: Option<f64>,

        /// Maximum rotation angle in degrees
        #[arg(long)]
        max_rotate: Option<i32>,

        /// Probability of applying the smoothing blur
        #[arg(long)]
        blur_prob: Option<f64>,

        /// Per-axis probability of trimming an edge before placement
        #[arg(long)]
        edge_crop_prob: Option<f64>,

        /// Minimum fraction of the background canvas the foreground covers
        #[arg(long)]
        min_coverage: Option<f64>,

        /// Maximum fraction of the background canvas the foreground covers
        #[arg(long)]
        max_coverage: Option<f64>,

        /// Probability that the resize stretches the axes independently
        #[arg(long)]
        stretch_prob: Option<f64>,

        /// Probability of each lighting draw
        #[arg(long)]
        lighting_prob: Option<f64>,

        /// Maximum relative brightness/contrast change
        #[arg(long)]
        max_lighting: Option<f64>,
    },

    /// Load the image pools and print their statistics
    Inspect {
        /// Foreground source: image file, path-list file, or directory
        #[arg(short, long)]
        images: PathBuf,

        /// Background source: image file, path-list file, or directory
        #[arg(short, long)]
        backgrounds: PathBuf,

        /// Treat foreground subdirectories as class labels
        #[arg(long, default_value = "false")]
        classify: bool,

        /// Output file for statistics (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Generate {
            images,
            backgrounds,
            output_dir,
            num_samples,
            classify,
            seed,
            transform_config,
            flip_prob,
            max_rotate,
            blur_prob,
            edge_crop_prob,
            min_coverage,
            max_coverage,
            stretch_prob,
            lighting_prob,
            max_lighting,
        } => {
            let mut transform = match transform_config {
                Some(path) => TransformConfig::from_json_file(&path)?,
                None => TransformConfig::default(),
            };
            apply_override(&mut transform.flip_prob, flip_prob);
            apply_override(&mut transform.max_rotate, max_rotate);
            apply_override(&mut transform.blur_prob, blur_prob);
            apply_override(&mut transform.edge_crop_prob, edge_crop_prob);
            apply_override(&mut transform.min_coverage, min_coverage);
            apply_override(&mut transform.max_coverage, max_coverage);
            apply_override(&mut transform.stretch_prob, stretch_prob);
            apply_override(&mut transform.lighting_prob, lighting_prob);
            apply_override(&mut transform.max_lighting, max_lighting);
            transform.validate()?;

            let generator_config = GeneratorConfig {
                num_samples,
                output_dir,
                subdir_is_class: classify,
                seed,
            };
            generate(&images, &backgrounds, transform, generator_config)
        }

        Commands::Inspect {
            images,
            backgrounds,
            classify,
            output,
        } => inspect(&images, &backgrounds, classify, output.as_deref()),
    }
}

fn apply_override<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn generate(
    images: &std::path::Path,
    backgrounds: &std::path::Path,
    transform: TransformConfig,
    config: GeneratorConfig,
) -> Result<()> {
    let pool = ImagePool::load(
        &ImageSource::path(images),
        &ImageSource::path(backgrounds),
        config.subdir_is_class,
    )?;

    let output_dir = config.output_dir.clone();
    let mut generator = SampleGenerator::new(pool, transform, config)?;
    let stats = generator.run()?;

    println!("\n{}", "Generation complete".green().bold());
    println!("  Output:    {}", output_dir.display());
    println!("  Requested: {}", stats.requested);
    println!("  Generated: {}", stats.generated.to_string().green());
    if stats.skipped > 0 {
        println!("  Skipped:   {}", stats.skipped.to_string().yellow());
    }
    for (class, count) in &stats.per_class {
        let label = if class.is_empty() { "(unclassified)" } else { class };
        println!("    {:<30} {}", label, count);
    }
    Ok(())
}

fn inspect(
    images: &std::path::Path,
    backgrounds: &std::path::Path,
    classify: bool,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let pool = ImagePool::load(
        &ImageSource::path(images),
        &ImageSource::path(backgrounds),
        classify,
    )?;

    let stats = pool.stats();
    stats.print();

    if let Some(path) = output {
        fs::write(path, serde_json::to_string_pretty(&stats)?)?;
        println!("\nStatistics saved to {}", path.display());
    }
    Ok(())
}
