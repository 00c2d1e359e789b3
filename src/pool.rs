//! Image pool loading and class bucketing.
//!
//! Discovers candidate foreground and background images from explicit path
//! collections, list files, or directories, and optionally groups
//! foregrounds into class buckets named after their source subdirectory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::error::{Error, Result};
use crate::IMG_EXTENSIONS;

/// Bucket key for foregrounds that do not belong to any class subdirectory.
pub const UNCLASSIFIED: &str = "";

/// A source of candidate images.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// An explicit collection of image paths, used verbatim.
    Paths(Vec<PathBuf>),
    /// A single path, resolved at load time: an image file is a one-element
    /// collection, any other file is read as a list of paths (one per
    /// line), and a directory is scanned for images.
    Path(PathBuf),
}

impl ImageSource {
    /// Convenience constructor for the single-path variant.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }
}

/// Returns true when the path carries a recognized image extension.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMG_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// The read-only pools the orchestrator samples from.
#[derive(Debug)]
pub struct ImagePool {
    /// Class name to foreground paths. The empty-string key holds
    /// unclassified images. Empty buckets are pruned after loading.
    foregrounds: BTreeMap<String, Vec<PathBuf>>,
    backgrounds: Vec<PathBuf>,
}

impl ImagePool {
    /// Loads both pools. When `subdir_is_class` is set and the foreground
    /// source is a directory, its immediate subdirectories become class
    /// buckets; otherwise all foregrounds land in the unclassified bucket.
    pub fn load(
        foregrounds: &ImageSource,
        backgrounds: &ImageSource,
        subdir_is_class: bool,
    ) -> Result<Self> {
        let foregrounds = if subdir_is_class {
            load_buckets(foregrounds)?
        } else {
            flat_bucket(resolve_source(foregrounds)?)
        };
        let backgrounds = resolve_source(backgrounds)?;

        let mut pool = Self {
            foregrounds,
            backgrounds,
        };
        pool.prune_empty();

        info!(
            "Loaded pool: {} foregrounds in {} class(es), {} backgrounds",
            pool.foreground_count(),
            pool.foregrounds.len(),
            pool.backgrounds.len()
        );
        Ok(pool)
    }

    /// Names of the non-empty class buckets, in stable order.
    pub fn classes(&self) -> Vec<&str> {
        self.foregrounds.keys().map(String::as_str).collect()
    }

    /// The foreground paths of one class bucket.
    pub fn bucket(&self, class: &str) -> Option<&[PathBuf]> {
        self.foregrounds.get(class).map(Vec::as_slice)
    }

    /// All background paths.
    pub fn backgrounds(&self) -> &[PathBuf] {
        &self.backgrounds
    }

    /// Total number of foregrounds across all buckets.
    pub fn foreground_count(&self) -> usize {
        self.foregrounds.values().map(Vec::len).sum()
    }

    /// Fails with `EmptyPool` when either pool has nothing to draw from.
    /// Called before the sampling loop so empty pools never surface mid-run.
    pub fn ensure_non_empty(&self) -> Result<()> {
        if self.foregrounds.is_empty() {
            return Err(Error::EmptyPool("no foreground images discovered".into()));
        }
        if self.backgrounds.is_empty() {
            return Err(Error::EmptyPool("no background images discovered".into()));
        }
        Ok(())
    }

    /// Summarizes the pool for reporting.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            num_classes: self.foregrounds.len(),
            total_foregrounds: self.foreground_count(),
            total_backgrounds: self.backgrounds.len(),
            class_counts: self
                .foregrounds
                .iter()
                .map(|(name, images)| (name.clone(), images.len()))
                .collect(),
        }
    }

    fn prune_empty(&mut self) {
        self.foregrounds.retain(|_, images| !images.is_empty());
    }
}

/// Statistics about a loaded pool
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub num_classes: usize,
    pub total_foregrounds: usize,
    pub total_backgrounds: usize,
    pub class_counts: BTreeMap<String, usize>,
}

impl PoolStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\nPool statistics:");
        println!("{:<40} {:>8}", "Class", "Images");
        println!("{}", "=".repeat(50));
        for (name, count) in &self.class_counts {
            let label = if name.is_empty() { "(unclassified)" } else { name };
            println!("{:<40} {:>8}", label, count);
        }
        println!("{}", "=".repeat(50));
        println!("{:<40} {:>8}", "TOTAL foregrounds", self.total_foregrounds);
        println!("{:<40} {:>8}", "TOTAL backgrounds", self.total_backgrounds);
    }
}

fn resolve_source(source: &ImageSource) -> Result<Vec<PathBuf>> {
    match source {
        ImageSource::Paths(paths) => Ok(paths.clone()),
        ImageSource::Path(path) => {
            if path.is_file() {
                load_from_file(path)
            } else if path.is_dir() {
                scan_directory(path)
            } else {
                Err(Error::InvalidSource(format!(
                    "'{}' is neither an existing file nor a directory",
                    path.display()
                )))
            }
        }
    }
}

/// An image file stands for itself; any other file is a list of paths.
fn load_from_file(file: &Path) -> Result<Vec<PathBuf>> {
    if is_image(file) {
        return Ok(vec![file.to_path_buf()]);
    }
    let contents = fs::read_to_string(file)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Scans a directory one level into subdirectories plus its own top-level
/// images. Results are sorted so repeated loads yield identical pools.
fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    images.sort();
    Ok(images)
}

/// Lists the images directly inside one directory, sorted.
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    images.sort();
    Ok(images)
}

/// Two-phase class discovery: immediate subdirectories become class
/// candidates, then a residual top-level scan fills the unclassified
/// bucket. Membership is decided by the parent directory alone, never by
/// substring matching against the full path.
fn load_buckets(source: &ImageSource) -> Result<BTreeMap<String, Vec<PathBuf>>> {
    let dir = match source {
        ImageSource::Path(path) if path.is_dir() => path,
        other => return Ok(flat_bucket(resolve_source(other)?)),
    };

    let mut buckets = BTreeMap::new();

    let mut class_dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    class_dirs.sort();

    for class_dir in class_dirs {
        let name = match class_dir.file_name().and_then(|n| n.to_str()) {
            Some(name) if !name.starts_with('.') => name.to_string(),
            _ => continue,
        };
        let images = list_images(&class_dir)?;
        debug!("Class '{}': {} images", name, images.len());
        buckets.insert(name, images);
    }

    buckets.insert(UNCLASSIFIED.to_string(), list_images(dir)?);

    Ok(buckets)
}

fn flat_bucket(images: Vec<PathBuf>) -> BTreeMap<String, Vec<PathBuf>> {
    let mut buckets = BTreeMap::new();
    buckets.insert(UNCLASSIFIED.to_string(), images);
    buckets
}
