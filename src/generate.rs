//! Sample orchestration.
//!
//! Drives the full pipeline for each requested sample: draw a class, a
//! foreground, and a background, run the augmentation engine and the
//! compositor, and persist the result under the class's output
//! subdirectory with a collision-resistant filename.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use image::{DynamicImage, ImageReader, RgbaImage};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::augment::Augmenter;
use crate::compose::Compositor;
use crate::config::{GeneratorConfig, TransformConfig};
use crate::pool::{ImagePool, UNCLASSIFIED};
use crate::utils::error::{Error, Result};
use crate::utils::logging::ProgressLogger;

/// Outcome of a generation run
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub requested: usize,
    pub generated: usize,
    pub skipped: usize,
    pub seed: u64,
    pub per_class: BTreeMap<String, usize>,
}

/// Generates N composited samples from the loaded pools.
///
/// Single-threaded by design: each sample runs to completion before the
/// next begins, and shares nothing with other samples beyond the read-only
/// pool and configuration.
pub struct SampleGenerator {
    pool: ImagePool,
    augmenter: Augmenter,
    compositor: Compositor,
    config: GeneratorConfig,
    seed: u64,
    rng: ChaCha8Rng,
}

impl SampleGenerator {
    /// Validates the configuration and pool up front so empty pools and
    /// bad knobs surface before any sample is attempted.
    pub fn new(
        pool: ImagePool,
        transform: TransformConfig,
        config: GeneratorConfig,
    ) -> Result<Self> {
        transform.validate()?;
        pool.ensure_non_empty()?;

        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        Ok(Self {
            pool,
            augmenter: Augmenter::new(transform.clone()),
            compositor: Compositor::new(transform),
            config,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Runs the sampling loop. A failing sample is logged and skipped
    /// rather than aborting the whole run; the stats report both counts.
    pub fn run(&mut self) -> Result<RunStats> {
        self.prepare_output_dirs()?;
        info!(
            "Generating {} samples into {:?} (seed {})",
            self.config.num_samples, self.config.output_dir, self.seed
        );

        let mut stats = RunStats {
            requested: self.config.num_samples,
            generated: 0,
            skipped: 0,
            seed: self.seed,
            per_class: BTreeMap::new(),
        };
        let mut progress = ProgressLogger::new("Generating samples", self.config.num_samples);

        for index in 0..self.config.num_samples {
            match self.generate_one(index) {
                Ok((class, path)) => {
                    stats.generated += 1;
                    *stats.per_class.entry(class).or_insert(0) += 1;
                    debug!("Wrote {}", path.display());
                }
                Err(err) => {
                    warn!("Skipping sample {}: {}", index, err);
                    stats.skipped += 1;
                }
            }
            progress.increment();
        }
        progress.finish();

        self.write_manifest(&stats)?;
        info!(
            "Run complete: {}/{} samples written, {} skipped",
            stats.generated, stats.requested, stats.skipped
        );
        Ok(stats)
    }

    /// One destination subdirectory per named class; the unclassified
    /// bucket writes into the output root itself.
    fn prepare_output_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.config.output_dir)?;
        for class in self.pool.classes() {
            if !class.is_empty() {
                fs::create_dir_all(self.config.output_dir.join(class))?;
            }
        }
        Ok(())
    }

    fn generate_one(&mut self, index: usize) -> Result<(String, PathBuf)> {
        let class = {
            let classes = self.pool.classes();
            (*classes
                .choose(&mut self.rng)
                .ok_or_else(|| Error::EmptyPool("no class buckets to sample".into()))?)
            .to_string()
        };
        let fg_path = self
            .pool
            .bucket(&class)
            .and_then(|bucket| bucket.choose(&mut self.rng))
            .ok_or_else(|| Error::EmptyPool(format!("class bucket '{}' is empty", class)))?
            .clone();
        let bg_path = self
            .pool
            .backgrounds()
            .choose(&mut self.rng)
            .ok_or_else(|| Error::EmptyPool("background pool is empty".into()))?
            .clone();

        let foreground = load_rgba(&fg_path)?;
        let background = load_rgba(&bg_path)?;

        let (foreground, edges) = self.augmenter.apply(foreground, &mut self.rng);
        let sample = self
            .compositor
            .compose(foreground, background, edges, &mut self.rng)?;

        let dest = self.output_path(&class, &fg_path, index);
        save_rgba(&sample, &dest)?;
        Ok((class, dest))
    }

    /// `<output>/<class>/<stem><millis><seq>.<ext>`: the source stem plus
    /// an all-digit time-based disambiguator before the extension.
    fn output_path(&self, class: &str, source: &Path, index: usize) -> PathBuf {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sample");
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "png".to_string());
        let file_name = format!(
            "{}{}{:04}.{}",
            stem,
            Utc::now().timestamp_millis(),
            index % 10_000,
            ext
        );

        let dir = if class == UNCLASSIFIED {
            self.config.output_dir.clone()
        } else {
            self.config.output_dir.join(class)
        };
        dir.join(file_name)
    }

    fn write_manifest(&self, stats: &RunStats) -> Result<()> {
        let path = self.config.output_dir.join("generation_stats.json");
        fs::write(&path, serde_json::to_string_pretty(stats)?)?;
        Ok(())
    }
}

/// Loads an image and converts it to RGBA8.
pub fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let image = ImageReader::open(path)
        .map_err(|e| Error::ImageLoad(path.to_path_buf(), e.to_string()))?
        .decode()
        .map_err(|e| Error::ImageLoad(path.to_path_buf(), e.to_string()))?;
    Ok(image.to_rgba8())
}

/// Saves a sample, flattening the alpha channel for formats without one.
pub fn save_rgba(image: &RgbaImage, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    let result = match ext.as_deref() {
        Some("jpg") | Some("jpeg") => DynamicImage::ImageRgba8(image.clone()).to_rgb8().save(path),
        _ => image.save(path),
    };
    result.map_err(|e| Error::ImageWrite(path.to_path_buf(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ImageSource;
    use image::Rgba;
    use tempfile::TempDir;

    fn write_image(path: &Path, size: u32, color: [u8; 4]) {
        RgbaImage::from_pixel(size, size, Rgba(color))
            .save(path)
            .unwrap();
    }

    fn class_fixture() -> (TempDir, ImageSource, ImageSource) {
        let dir = TempDir::new().unwrap();
        let fg_root = dir.path().join("objects");
        let cats = fg_root.join("cat");
        let dogs = fg_root.join("dog");
        fs::create_dir_all(&cats).unwrap();
        fs::create_dir_all(&dogs).unwrap();
        write_image(&cats.join("a.png"), 8, [255, 0, 0, 255]);
        write_image(&dogs.join("b.png"), 8, [0, 255, 0, 255]);

        let bg_root = dir.path().join("scenes");
        fs::create_dir_all(&bg_root).unwrap();
        write_image(&bg_root.join("bg1.png"), 32, [0, 0, 255, 255]);

        let fg = ImageSource::path(&fg_root);
        let bg = ImageSource::path(&bg_root);
        (dir, fg, bg)
    }

    fn collect_samples(root: &Path) -> Vec<PathBuf> {
        walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && p.extension().map_or(false, |e| e == "png"))
            .collect()
    }

    #[test]
    fn test_generates_requested_count_under_class_dirs() {
        let (dir, fg, bg) = class_fixture();
        let out = dir.path().join("out");

        let pool = ImagePool::load(&fg, &bg, true).unwrap();
        let config = GeneratorConfig {
            num_samples: 4,
            output_dir: out.clone(),
            subdir_is_class: true,
            seed: Some(42),
        };
        let mut generator =
            SampleGenerator::new(pool, TransformConfig::default(), config).unwrap();
        let stats = generator.run().unwrap();

        assert_eq!(stats.generated, 4);
        assert_eq!(stats.skipped, 0);

        let samples = collect_samples(&out);
        assert_eq!(samples.len(), 4);
        // Every sample sits in a drawn class directory and keeps the
        // source stem followed by digits
        for sample in &samples {
            let parent = sample.parent().unwrap().file_name().unwrap();
            assert!(parent == "cat" || parent == "dog");
            let name = sample.file_stem().unwrap().to_str().unwrap();
            let stem = if parent == "cat" { "a" } else { "b" };
            assert!(name.starts_with(stem));
            assert!(name[stem.len()..].chars().all(|c| c.is_ascii_digit()));
        }
        assert!(out.join("generation_stats.json").exists());
    }

    #[test]
    fn test_deterministic_pixels_under_fixed_seed() {
        let (dir, fg, bg) = class_fixture();

        let mut outputs = Vec::new();
        for run in 0..2 {
            let out = dir.path().join(format!("out{}", run));
            let pool = ImagePool::load(&fg, &bg, true).unwrap();
            let config = GeneratorConfig {
                num_samples: 2,
                output_dir: out.clone(),
                subdir_is_class: true,
                seed: Some(7),
            };
            let mut generator =
                SampleGenerator::new(pool, TransformConfig::default(), config).unwrap();
            generator.run().unwrap();

            let mut samples = collect_samples(&out);
            samples.sort();
            let pixels: Vec<Vec<u8>> = samples
                .iter()
                .map(|p| load_rgba(p).unwrap().into_raw())
                .collect();
            outputs.push(pixels);
        }

        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn test_empty_foreground_pool_rejected_before_run() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        let bg_dir = dir.path().join("scenes");
        fs::create_dir(&bg_dir).unwrap();
        write_image(&bg_dir.join("bg.png"), 16, [0, 0, 255, 255]);

        let pool = ImagePool::load(
            &ImageSource::path(&empty),
            &ImageSource::path(&bg_dir),
            false,
        )
        .unwrap();
        let result = SampleGenerator::new(
            pool,
            TransformConfig::default(),
            GeneratorConfig::default(),
        );
        assert!(matches!(result, Err(Error::EmptyPool(_))));
    }

    #[test]
    fn test_unreadable_sample_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let fg_dir = dir.path().join("objects");
        fs::create_dir(&fg_dir).unwrap();
        // A png extension with no decodable content behind it
        fs::write(fg_dir.join("broken.png"), b"not an image").unwrap();
        let bg_dir = dir.path().join("scenes");
        fs::create_dir(&bg_dir).unwrap();
        write_image(&bg_dir.join("bg.png"), 16, [0, 0, 255, 255]);

        let out = dir.path().join("out");
        let pool = ImagePool::load(
            &ImageSource::path(&fg_dir),
            &ImageSource::path(&bg_dir),
            false,
        )
        .unwrap();
        let config = GeneratorConfig {
            num_samples: 3,
            output_dir: out.clone(),
            subdir_is_class: false,
            seed: Some(1),
        };
        let mut generator =
            SampleGenerator::new(pool, TransformConfig::default(), config).unwrap();
        let stats = generator.run().unwrap();

        assert_eq!(stats.generated, 0);
        assert_eq!(stats.skipped, 3);
    }

    #[test]
    fn test_unclassified_samples_land_in_output_root() {
        let dir = TempDir::new().unwrap();
        let fg_dir = dir.path().join("objects");
        fs::create_dir(&fg_dir).unwrap();
        write_image(&fg_dir.join("thing.png"), 8, [255, 0, 0, 255]);
        let bg_dir = dir.path().join("scenes");
        fs::create_dir(&bg_dir).unwrap();
        write_image(&bg_dir.join("bg.png"), 32, [0, 0, 255, 255]);

        let out = dir.path().join("out");
        let pool = ImagePool::load(
            &ImageSource::path(&fg_dir),
            &ImageSource::path(&bg_dir),
            false,
        )
        .unwrap();
        let config = GeneratorConfig {
            num_samples: 1,
            output_dir: out.clone(),
            subdir_is_class: false,
            seed: Some(3),
        };
        let mut generator =
            SampleGenerator::new(pool, TransformConfig::default(), config).unwrap();
        let stats = generator.run().unwrap();

        assert_eq!(stats.generated, 1);
        let samples = collect_samples(&out);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].parent().unwrap(), out);
    }

    #[test]
    fn test_jpeg_output_flattens_alpha() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flat.jpg");
        let image = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        save_rgba(&image, &path).unwrap();
        assert!(path.exists());

        let reloaded = load_rgba(&path).unwrap();
        assert_eq!(reloaded.dimensions(), (4, 4));
    }
}
