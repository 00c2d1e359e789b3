//! # synthgen
//!
//! Synthetic training-image generation: composites foreground objects onto
//! backgrounds after a randomized sequence of geometric and photometric
//! augmentations, writing class-labeled samples for downstream
//! classifiers.
//!
//! ## Modules
//!
//! - `pool`: image discovery and class bucketing from files or directories
//! - `augment`: the pre-placement pipeline (flips, rotation, blur, edge crop)
//! - `compose`: canvas-coverage resize, lighting, edge-anchored placement,
//!   and the alpha merge
//! - `generate`: the sample orchestrator and run statistics
//! - `config`: typed transformation and run parameters
//! - `utils`: error types and logging helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use synthgen::{GeneratorConfig, ImagePool, ImageSource, SampleGenerator, TransformConfig};
//!
//! let pool = ImagePool::load(
//!     &ImageSource::path("data/objects"),
//!     &ImageSource::path("data/scenes"),
//!     true,
//! )?;
//! let mut generator = SampleGenerator::new(
//!     pool,
//!     TransformConfig::default(),
//!     GeneratorConfig::default(),
//! )?;
//! let stats = generator.run()?;
//! ```

pub mod augment;
pub mod compose;
pub mod config;
pub mod generate;
pub mod pool;
pub mod utils;

// Re-export commonly used items for convenience
pub use augment::{Augmenter, CropEdges};
pub use compose::Compositor;
pub use config::{GeneratorConfig, TransformConfig};
pub use generate::{RunStats, SampleGenerator};
pub use pool::{ImagePool, ImageSource, PoolStats, UNCLASSIFIED};
pub use utils::error::{Error, Result};

/// Image extensions recognized during pool discovery (matched
/// case-insensitively)
pub const IMG_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
