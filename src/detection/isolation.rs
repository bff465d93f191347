use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use log::debug;

use crate::config::IsolatorConfig;
use crate::detection::contours;
use crate::detection::normalize::normalize;
use crate::models::Region;

/// Finds the physical ID card inside a photograph shot against a bright
/// background.
#[derive(Debug, Clone)]
pub struct CredentialIsolator {
    pub background_threshold: u8,
    pub dilate_radius: u8,
    pub dilate_iterations: u32,
}

impl CredentialIsolator {
    pub fn new(config: &IsolatorConfig) -> Self {
        Self {
            background_threshold: config.background_threshold,
            dilate_radius: config.dilate_radius,
            dilate_iterations: config.dilate_iterations,
        }
    }

    /// Inverted binarization: near-white background becomes 0, everything
    /// else 255, then dilated to bridge small gaps.
    pub fn foreground_mask(&self, gray: &GrayImage) -> GrayImage {
        let threshold = self.background_threshold;
        let mut mask = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] > threshold {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });

        for _ in 0..self.dilate_iterations {
            mask = dilate(&mask, Norm::LInf, self.dilate_radius);
        }
        mask
    }

    /// Bounding rectangle of the largest external contour, or `None` when the
    /// image holds no foreground at all.
    pub fn locate(&self, img: &DynamicImage) -> Option<Region> {
        let gray = normalize(img);
        let mask = self.foreground_mask(&gray);
        let candidates = contours::external_contours(&mask);

        debug!("Credential isolation: {} external contours", candidates.len());

        // First contour wins ties
        let mut best: Option<(f64, &contours::ExternalContour)> = None;
        for contour in &candidates {
            let area = contour.area();
            if best.is_none_or(|(best_area, _)| area > best_area) {
                best = Some((area, contour));
            }
        }

        let region = best.and_then(|(_, contour)| contour.bounding_region())?;
        debug!(
            "Credential located at ({}, {}) size {}x{}",
            region.min_x,
            region.min_y,
            region.width(),
            region.height()
        );
        Some(region)
    }

    /// Crop the credential out of the photograph, keeping its color space
    pub fn isolate(&self, img: &DynamicImage) -> Option<(Region, DynamicImage)> {
        let region = self.locate(img)?;
        let crop = img.crop_imm(region.min_x, region.min_y, region.width(), region.height());
        Some((region, crop))
    }
}

impl Default for CredentialIsolator {
    fn default() -> Self {
        Self::new(&IsolatorConfig::default())
    }
}
