//! Augmentation engine for foreground images.
//!
//! Applies a fixed, ordered, independently-probabilistic sequence of
//! operations to one foreground: horizontal flip, vertical flip, rotation
//! with canvas expansion, blur, and edge crop. Every operation takes an
//! image by value and returns a new one, so later steps always observe the
//! output of earlier ones. The crop step additionally records which sides
//! were trimmed flush to the boundary; the compositor uses that record to
//! anchor placement.

use image::{imageops, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rand::Rng;

use crate::config::TransformConfig;

/// Records which image edges the crop step trimmed flush to the boundary.
///
/// Produced by [`Augmenter::apply`] and consumed by the placement step of
/// the same run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CropEdges {
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

impl CropEdges {
    /// True when any side was trimmed.
    pub fn any(&self) -> bool {
        self.left || self.top || self.right || self.bottom
    }
}

/// Runs the pre-placement augmentation pipeline.
///
/// Randomness is injected per call so seeded runs are reproducible and
/// parallel samplers can hold independent streams.
pub struct Augmenter {
    config: TransformConfig,
}

impl Augmenter {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Transforms one foreground image, returning the new image and the
    /// crop-edge record for the placement step.
    pub fn apply<R: Rng>(&self, image: RgbaImage, rng: &mut R) -> (RgbaImage, CropEdges) {
        let image = self.flip(image, rng);
        let image = self.flip_vertical(image, rng);
        let image = self.rotate(image, rng);
        let image = self.blur(image, rng);
        self.edge_crop(image, rng)
    }

    fn flip<R: Rng>(&self, image: RgbaImage, rng: &mut R) -> RgbaImage {
        if self.config.flip && rng.gen_bool(self.config.flip_prob) {
            imageops::flip_horizontal(&image)
        } else {
            image
        }
    }

    fn flip_vertical<R: Rng>(&self, image: RgbaImage, rng: &mut R) -> RgbaImage {
        if self.config.flip && self.config.flip_vertical && rng.gen_bool(self.config.flip_prob) {
            imageops::flip_vertical(&image)
        } else {
            image
        }
    }

    /// Always applied; the angle is a uniform integer in
    /// [-max_rotate, max_rotate] degrees.
    fn rotate<R: Rng>(&self, image: RgbaImage, rng: &mut R) -> RgbaImage {
        let max = self.config.max_rotate;
        let angle = if max > 0 { rng.gen_range(-max..=max) } else { 0 };
        rotate_expanded(image, angle)
    }

    fn blur<R: Rng>(&self, image: RgbaImage, rng: &mut R) -> RgbaImage {
        if rng.gen_bool(self.config.blur_prob) {
            imageops::blur(&image, self.config.blur_sigma)
        } else {
            image
        }
    }

    /// Per axis independently: with probability `edge_crop_prob`, removes a
    /// random fraction of the extent from the leading or trailing edge
    /// (coin flip). The surviving extent is clamped to at least one pixel.
    fn edge_crop<R: Rng>(&self, image: RgbaImage, rng: &mut R) -> (RgbaImage, CropEdges) {
        let (width, height) = image.dimensions();
        let mut edges = CropEdges::default();

        if width == 0 || height == 0 {
            return (image, edges);
        }

        let mut x0 = 0u32;
        let mut y0 = 0u32;
        let mut new_width = width;
        let mut new_height = height;

        if rng.gen_bool(self.config.edge_crop_prob) {
            let amount = self.crop_amount(width, rng);
            if amount > 0 {
                new_width = width - amount;
                if rng.gen_bool(0.5) {
                    x0 = amount;
                    edges.left = true;
                } else {
                    edges.right = true;
                }
            }
        }

        if rng.gen_bool(self.config.edge_crop_prob) {
            let amount = self.crop_amount(height, rng);
            if amount > 0 {
                new_height = height - amount;
                if rng.gen_bool(0.5) {
                    y0 = amount;
                    edges.top = true;
                } else {
                    edges.bottom = true;
                }
            }
        }

        if (new_width, new_height) == (width, height) {
            return (image, edges);
        }
        let cropped = imageops::crop_imm(&image, x0, y0, new_width, new_height).to_image();
        (cropped, edges)
    }

    /// Pixels to trim from one axis, clamped so at least one pixel survives.
    fn crop_amount<R: Rng>(&self, extent: u32, rng: &mut R) -> u32 {
        let fraction = rng.gen_range(self.config.min_edge_crop..=self.config.max_edge_crop);
        let amount = (fraction * extent as f64).round() as u32;
        amount.min(extent - 1)
    }
}

/// Rotates by `angle` degrees, expanding the canvas to the rotated
/// bounding box so no content is clipped. Uncovered regions are
/// transparent. An angle that is a multiple of 360 returns the image
/// unchanged.
fn rotate_expanded(image: RgbaImage, angle: i32) -> RgbaImage {
    if angle.rem_euclid(360) == 0 {
        return image;
    }
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image;
    }

    let theta = (angle as f32).to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let new_width = ((width as f32 * cos + height as f32 * sin).round() as u32).max(1);
    let new_height = ((width as f32 * sin + height as f32 * cos).round() as u32).max(1);

    // Rotate inside a square canvas that contains the content at any
    // angle, then crop the bounding box out of its center.
    let diag = ((width as f32).hypot(height as f32).ceil() as u32).max(1);
    let mut canvas = RgbaImage::from_pixel(diag, diag, Rgba([0, 0, 0, 0]));
    imageops::overlay(
        &mut canvas,
        &image,
        ((diag - width) / 2) as i64,
        ((diag - height) / 2) as i64,
    );

    let rotated = rotate_about_center(&canvas, theta, Interpolation::Nearest, Rgba([0, 0, 0, 0]));

    let out_width = new_width.min(diag);
    let out_height = new_height.min(diag);
    let x0 = (diag - out_width) / 2;
    let y0 = (diag - out_height) / 2;
    imageops::crop_imm(&rotated, x0, y0, out_width, out_height).to_image()
}
