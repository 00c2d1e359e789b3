//! Compositor: places an augmented foreground onto a background.
//!
//! Owns the final two augmentation steps (canvas-coverage resize and
//! lighting) because both depend on the chosen background, then draws a
//! placement consistent with the crop-edge record and merges the images
//! using the foreground's alpha channel as the stencil.

use image::{imageops, ImageBuffer, Rgba, RgbaImage};
use rand::Rng;
use tracing::warn;

use crate::augment::CropEdges;
use crate::config::TransformConfig;
use crate::utils::error::{Error, Result};

pub struct Compositor {
    config: TransformConfig,
}

impl Compositor {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Resizes and relights the foreground, then merges it onto the
    /// background at an offset chosen from the crop-edge record.
    /// Lighting runs before the merge so pixels outside the foreground
    /// are never altered.
    pub fn compose<R: Rng>(
        &self,
        foreground: RgbaImage,
        mut background: RgbaImage,
        edges: CropEdges,
        rng: &mut R,
    ) -> Result<RgbaImage> {
        let foreground = self.resize_to_canvas(foreground, background.dimensions(), rng)?;
        let foreground = self.lighting(foreground, rng);
        let (x, y) = self.placement(foreground.dimensions(), background.dimensions(), edges, rng);
        imageops::overlay(&mut background, &foreground, x, y);
        Ok(background)
    }

    /// Scales the foreground so each axis covers a random fraction of the
    /// background canvas. With probability `stretch_prob` the axes scale
    /// independently; otherwise one aspect-preserving factor fits the
    /// image inside the target box without ever upscaling.
    fn resize_to_canvas<R: Rng>(
        &self,
        image: RgbaImage,
        canvas: (u32, u32),
        rng: &mut R,
    ) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::DegenerateGeometry(format!(
                "foreground has extent {}x{}",
                width, height
            )));
        }

        let (canvas_width, canvas_height) = canvas;
        let coverage = self.config.min_coverage..=self.config.max_coverage;
        let target_width =
            ((canvas_width as f64 * rng.gen_range(coverage.clone())) as u32).max(1);
        let target_height = ((canvas_height as f64 * rng.gen_range(coverage)) as u32).max(1);

        if rng.gen_bool(self.config.stretch_prob) {
            return Ok(imageops::resize(
                &image,
                target_width,
                target_height,
                imageops::FilterType::Triangle,
            ));
        }

        let scale = (target_width as f64 / width as f64)
            .min(target_height as f64 / height as f64)
            .min(1.0);
        let new_width = ((width as f64 * scale).round() as u32).max(1);
        let new_height = ((height as f64 * scale).round() as u32).max(1);
        if (new_width, new_height) == (width, height) {
            return Ok(image);
        }
        Ok(imageops::resize(
            &image,
            new_width,
            new_height,
            imageops::FilterType::Triangle,
        ))
    }

    /// Brightness and contrast, each drawn independently.
    fn lighting<R: Rng>(&self, image: RgbaImage, rng: &mut R) -> RgbaImage {
        let mut image = image;
        if rng.gen_bool(self.config.lighting_prob) {
            let factor = self.lighting_factor(rng);
            image = adjust_brightness(&image, factor);
        }
        if rng.gen_bool(self.config.lighting_prob) {
            let factor = self.lighting_factor(rng);
            image = adjust_contrast(&image, factor);
        }
        image
    }

    /// A factor of `1 +/- random() * max_lighting`, sign by coin flip.
    fn lighting_factor<R: Rng>(&self, rng: &mut R) -> f32 {
        let magnitude = rng.gen::<f64>() * self.config.max_lighting;
        let factor = if rng.gen_bool(0.5) {
            1.0 + magnitude
        } else {
            1.0 - magnitude
        };
        factor as f32
    }

    /// Chooses the paste offset. A side trimmed flush during the edge crop
    /// anchors the foreground against the matching background edge;
    /// otherwise the offset is uniform within the valid range.
    fn placement<R: Rng>(
        &self,
        foreground: (u32, u32),
        background: (u32, u32),
        edges: CropEdges,
        rng: &mut R,
    ) -> (i64, i64) {
        let x = place_axis(foreground.0, background.0, edges.left, edges.right, rng);
        let y = place_axis(foreground.1, background.1, edges.top, edges.bottom, rng);
        (x, y)
    }
}

fn place_axis<R: Rng>(
    fg_extent: u32,
    bg_extent: u32,
    leading: bool,
    trailing: bool,
    rng: &mut R,
) -> i64 {
    if fg_extent > bg_extent {
        warn!(
            "foreground extent {} exceeds background extent {}, anchoring at 0",
            fg_extent, bg_extent
        );
        return 0;
    }
    let max_offset = (bg_extent - fg_extent) as i64;
    if leading {
        0
    } else if trailing {
        max_offset
    } else if max_offset == 0 {
        0
    } else {
        rng.gen_range(0..=max_offset)
    }
}

fn adjust_brightness(image: &RgbaImage, factor: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let pixel = image.get_pixel(x, y);
        Rgba([
            scale_channel(pixel[0], factor),
            scale_channel(pixel[1], factor),
            scale_channel(pixel[2], factor),
            pixel[3],
        ])
    })
}

fn scale_channel(value: u8, factor: f32) -> u8 {
    (value as f32 * factor).clamp(0.0, 255.0) as u8
}

/// Contrast pivots on the mean intensity of opaque pixels so transparent
/// padding does not drag the pivot toward black.
fn adjust_contrast(image: &RgbaImage, factor: f32) -> RgbaImage {
    let mut sum = 0.0f64;
    let mut opaque = 0u64;
    for pixel in image.pixels() {
        if pixel[3] > 0 {
            sum += (pixel[0] as f64 + pixel[1] as f64 + pixel[2] as f64) / 3.0;
            opaque += 1;
        }
    }
    if opaque == 0 {
        return image.clone();
    }
    let mean = (sum / opaque as f64) as f32;

    let (width, height) = image.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let pixel = image.get_pixel(x, y);
        Rgba([
            (mean + factor * (pixel[0] as f32 - mean)).clamp(0.0, 255.0) as u8,
            (mean + factor * (pixel[1] as f32 - mean)).clamp(0.0, 255.0) as u8,
            (mean + factor * (pixel[2] as f32 - mean)).clamp(0.0, 255.0) as u8,
            pixel[3],
        ])
    })
}
