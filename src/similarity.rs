//! Structural similarity scoring of signature crops.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use log::debug;
use std::borrow::Cow;

use crate::config::ComparisonConfig;
use crate::detection::normalize::normalize;
use crate::models::SimilarityResult;

const SSIM_WINDOW: u32 = 7;
const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;

/// Gaussian sigma equivalent to an 11x11 adaptive-threshold block
const ADAPTIVE_SIGMA: f32 = 2.0;
const ADAPTIVE_OFFSET: i16 = 2;

/// Resizes both operands to a canonical square and scores them with SSIM
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    pub canonical_size: u32,
    pub threshold: f64,
}

impl SimilarityScorer {
    pub fn new(config: &ComparisonConfig) -> Self {
        Self {
            canonical_size: config.canonical_size,
            threshold: config.match_threshold,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Grayscale 8-bit at the canonical size
    pub fn canonicalize(&self, img: &DynamicImage) -> GrayImage {
        let gray = normalize(img);
        if self.is_canonical(&gray) {
            return gray;
        }
        self.fit(&gray).into_owned()
    }

    fn is_canonical(&self, gray: &GrayImage) -> bool {
        gray.dimensions() == (self.canonical_size, self.canonical_size)
    }

    fn fit<'a>(&self, gray: &'a GrayImage) -> Cow<'a, GrayImage> {
        if self.is_canonical(gray) {
            return Cow::Borrowed(gray);
        }
        let side = self.canonical_size;
        Cow::Owned(imageops::resize(gray, side, side, FilterType::Triangle))
    }

    /// Score two crops of any size and color space
    pub fn compare(&self, a: &DynamicImage, b: &DynamicImage) -> SimilarityResult {
        let a = self.canonicalize(a);
        let b = self.canonicalize(b);
        self.score_canonical(&a, &b)
    }

    /// Score two grayscale images; operands not already at the canonical
    /// size are resized first.
    pub fn score_canonical(&self, a: &GrayImage, b: &GrayImage) -> SimilarityResult {
        let score = ssim(&self.fit(a), &self.fit(b));
        let result = SimilarityResult::new(score, self.threshold);
        debug!(
            "SSIM = {:.4} (threshold {:.2}, match: {})",
            result.score, result.threshold, result.is_match
        );
        result
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(&ComparisonConfig::default())
    }
}

/// Mean structural similarity of two equally sized grayscale images.
///
/// Uses a 7x7 uniform window with sample covariance and averages over every
/// window lying fully inside the image. The raw index lies in [-1, 1].
///
/// Panics if the operands differ in size; use [`SimilarityScorer::compare`]
/// for arbitrary crops.
pub fn ssim(a: &GrayImage, b: &GrayImage) -> f64 {
    assert_eq!(a.dimensions(), b.dimensions(), "SSIM operands must share dimensions");
    let (width, height) = a.dimensions();

    let mut win = SSIM_WINDOW.min(width).min(height);
    if win % 2 == 0 {
        win -= 1;
    }
    if win == 0 {
        return if a == b { 1.0 } else { 0.0 };
    }

    let sum_a = IntegralImage::new(a, b, |p, _| p);
    let sum_b = IntegralImage::new(a, b, |_, q| q);
    let sum_aa = IntegralImage::new(a, b, |p, _| p * p);
    let sum_bb = IntegralImage::new(a, b, |_, q| q * q);
    let sum_ab = IntegralImage::new(a, b, |p, q| p * q);

    let np = (win * win) as f64;
    let cov_norm = if np > 1.0 { np / (np - 1.0) } else { 1.0 };
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let mut total = 0.0;
    let mut count = 0u64;

    for y in 0..=(height - win) {
        for x in 0..=(width - win) {
            let ux = sum_a.window(x, y, win) / np;
            let uy = sum_b.window(x, y, win) / np;
            let uxx = sum_aa.window(x, y, win) / np;
            let uyy = sum_bb.window(x, y, win) / np;
            let uxy = sum_ab.window(x, y, win) / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);

            total += numerator / denominator;
            count += 1;
        }
    }

    total / count as f64
}

/// Summed-area table over a per-pixel function of both operands
struct IntegralImage {
    stride: usize,
    sums: Vec<f64>,
}

impl IntegralImage {
    fn new(a: &GrayImage, b: &GrayImage, f: impl Fn(f64, f64) -> f64) -> Self {
        let (width, height) = a.dimensions();
        let stride = width as usize + 1;
        let mut sums = vec![0.0; stride * (height as usize + 1)];

        for y in 0..height as usize {
            let mut row = 0.0;
            for x in 0..width as usize {
                let p = a.get_pixel(x as u32, y as u32)[0] as f64;
                let q = b.get_pixel(x as u32, y as u32)[0] as f64;
                row += f(p, q);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }

        Self { stride, sums }
    }

    fn window(&self, x: u32, y: u32, win: u32) -> f64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + win as usize, y0 + win as usize);
        self.sums[y1 * self.stride + x1] - self.sums[y0 * self.stride + x1]
            - self.sums[y1 * self.stride + x0]
            + self.sums[y0 * self.stride + x0]
    }
}

/// Inverted Gaussian adaptive threshold: ink becomes white on black.
///
/// Only used to render comparison panels for reviewers; scores are always
/// computed on the grayscale images.
pub fn adaptive_binarize(gray: &GrayImage) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, ADAPTIVE_SIGMA);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y)[0] as i16;
        let threshold = local_mean.get_pixel(x, y)[0] as i16 - ADAPTIVE_OFFSET;
        if value > threshold {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    })
}

/// 2x2 review panel: both canonical operands on top, their binarized views
/// below.
pub fn comparison_panel(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (width, height) = a.dimensions();
    let mut canvas = GrayImage::from_pixel(width * 2, height * 2, Luma([255u8]));

    imageops::overlay(&mut canvas, a, 0, 0);
    imageops::overlay(&mut canvas, b, width.into(), 0);
    imageops::overlay(&mut canvas, &adaptive_binarize(a), 0, height.into());
    imageops::overlay(&mut canvas, &adaptive_binarize(b), width.into(), height.into());

    canvas
}
