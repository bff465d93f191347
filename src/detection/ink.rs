use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use log::debug;

use crate::config::InkConfig;
use crate::detection::contours::find_regions;
use crate::detection::detector::Detector;
use crate::detection::normalize::normalize;
use crate::models::{BoundingBox, Region};

/// Ink density a handwritten signature typically has inside its own box
const TYPICAL_STROKE_DENSITY: f32 = 0.15;
const DENSITY_TOLERANCE: f32 = 0.35;

/// Classical signature detector: dark ink is thresholded, strokes are merged
/// by dilation, and each wide, sparsely inked blob is proposed as a
/// signature.
///
/// Confidence peaks for blobs whose ink density looks like pen strokes and
/// falls off for solid print blocks and stray specks.
#[derive(Debug, Clone)]
pub struct InkBlobDetector {
    pub ink_threshold: u8,
    pub merge_radius: u8,
    pub min_area_fraction: f32,
    pub min_aspect_ratio: f32,
}

impl InkBlobDetector {
    pub fn new(config: &InkConfig) -> Self {
        Self {
            ink_threshold: config.ink_threshold,
            merge_radius: config.merge_radius,
            min_area_fraction: config.min_area_fraction,
            min_aspect_ratio: config.min_aspect_ratio,
        }
    }

    fn ink_mask(&self, gray: &GrayImage) -> GrayImage {
        GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] <= self.ink_threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }

    fn ink_density(ink: &GrayImage, region: &Region) -> f32 {
        let mut count = 0u32;
        for y in region.min_y..=region.max_y {
            for x in region.min_x..=region.max_x {
                if ink.get_pixel(x, y)[0] > 0 {
                    count += 1;
                }
            }
        }
        count as f32 / region.bbox_area() as f32
    }

    fn confidence(&self, density: f32, aspect_ratio: f32) -> f32 {
        let density_score =
            1.0 - ((density - TYPICAL_STROKE_DENSITY).abs() / DENSITY_TOLERANCE);
        let shape_score = (aspect_ratio / (2.0 * self.min_aspect_ratio)).min(1.0);
        (density_score * shape_score).clamp(0.0, 1.0)
    }
}

impl Default for InkBlobDetector {
    fn default() -> Self {
        Self::new(&InkConfig::default())
    }
}

impl Detector for InkBlobDetector {
    fn detect(&self, image: &DynamicImage, min_confidence: f32) -> anyhow::Result<Vec<BoundingBox>> {
        let gray = normalize(image);
        let ink = self.ink_mask(&gray);
        let merged = if self.merge_radius > 0 {
            dilate(&ink, Norm::LInf, self.merge_radius)
        } else {
            ink.clone()
        };

        let image_area = (gray.width() * gray.height()) as f32;
        let mut boxes = Vec::new();

        for region in find_regions(&merged, 1) {
            let area_fraction = region.bbox_area() as f32 / image_area;
            let aspect = region.aspect_ratio();
            if area_fraction < self.min_area_fraction || aspect < self.min_aspect_ratio {
                continue;
            }

            let density = Self::ink_density(&ink, &region);
            let confidence = self.confidence(density, aspect);
            debug!(
                "Ink blob at ({}, {}) {}x{}: density={:.3}, aspect={:.2}, confidence={:.2}",
                region.min_x,
                region.min_y,
                region.width(),
                region.height(),
                density,
                aspect,
                confidence
            );

            if confidence >= min_confidence {
                boxes.push(BoundingBox::new(
                    region.min_x as i32,
                    region.min_y as i32,
                    region.max_x as i32 + 1,
                    region.max_y as i32 + 1,
                    confidence,
                ));
            }
        }

        Ok(boxes)
    }

    fn name(&self) -> &str {
        "Ink Blob"
    }
}
