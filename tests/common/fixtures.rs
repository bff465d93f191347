#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage};
use pawnsig::{BoundingBox, Detector, EngineConfig, SignatureComparator, SignatureExtractor};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Size of an ID card photo
pub const PHOTO_SIZE: (u32, u32) = (240, 180);
/// Card rectangle inside the photo: x, y, width, height
pub const CARD_RECT: (u32, u32, u32, u32) = (40, 30, 120, 80);
/// Isolated credential: the card grown by the 4px dilation margin
pub const ID_CROP_SIZE: (u32, u32) = (128, 88);
pub const ID_CROP_ORIGIN: (u32, u32) = (36, 26);

pub const PATCH_SIZE: (u32, u32) = (80, 40);
/// Signature placement relative to the isolated credential
pub const ID_PATCH_OFFSET: (u32, u32) = (20, 30);

pub const INVOICE_SIZE: (u32, u32) = (300, 200);
pub const INVOICE_PATCH_AT: (u32, u32) = (110, 80);
pub const REGISTRATION_SIZE: (u32, u32) = (320, 220);
pub const REGISTRATION_PATCH_AT: (u32, u32) = (60, 120);

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const CARD_GRAY: Rgb<u8> = Rgb([200, 200, 200]);
const INK: Rgb<u8> = Rgb([20, 20, 60]);

/// Box covering a patch placed at `at`
pub fn patch_box(at: (u32, u32), confidence: f32) -> BoundingBox {
    BoundingBox::new(
        at.0 as i32,
        at.1 as i32,
        (at.0 + PATCH_SIZE.0) as i32,
        (at.1 + PATCH_SIZE.1) as i32,
        confidence,
    )
}

pub fn id_signature_box() -> BoundingBox {
    patch_box(ID_PATCH_OFFSET, 0.9)
}

/// A wavy pen stroke on white paper
pub fn signature_patch(width: u32, height: u32, phase: f32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, WHITE);
    let mid = height as f32 / 2.0;
    let amplitude = height as f32 / 3.0;

    for x in 4..width.saturating_sub(4) {
        let t = x as f32 / width as f32;
        let y = mid + amplitude * (t * 4.0 * std::f32::consts::PI + phase).sin();
        for dy in -1i32..=1 {
            let py = y as i32 + dy;
            if py >= 0 && (py as u32) < height {
                img.put_pixel(x, py as u32, INK);
            }
        }
    }
    img
}

/// Dense deterministic texture, nothing like a signature
pub fn noise_patch(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = ((x * 37 + y * 91 + x * y * 13) % 256) as u8;
        Rgb([v, v, v])
    })
}

/// Photo of an ID card on a white table, with `patch` as the signature
pub fn card_photo(patch: &RgbImage) -> RgbImage {
    let mut photo = RgbImage::from_pixel(PHOTO_SIZE.0, PHOTO_SIZE.1, WHITE);
    let (cx, cy, cw, ch) = CARD_RECT;
    for y in cy..cy + ch {
        for x in cx..cx + cw {
            photo.put_pixel(x, y, CARD_GRAY);
        }
    }
    image::imageops::overlay(
        &mut photo,
        patch,
        (ID_CROP_ORIGIN.0 + ID_PATCH_OFFSET.0).into(),
        (ID_CROP_ORIGIN.1 + ID_PATCH_OFFSET.1).into(),
    );
    photo
}

/// A white document page with `patch` pasted at `at`
pub fn document_page(size: (u32, u32), patch: &RgbImage, at: (u32, u32)) -> RgbImage {
    let mut page = RgbImage::from_pixel(size.0, size.1, WHITE);
    image::imageops::overlay(&mut page, patch, at.0.into(), at.1.into());
    page
}

pub fn blank_photo() -> RgbImage {
    RgbImage::from_pixel(PHOTO_SIZE.0, PHOTO_SIZE.1, WHITE)
}

/// Write an image as PNG into `dir` and return its path
pub fn write_png(dir: &Path, name: &str, img: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save test image");
    path
}

/// The three documents of a matching intake, written into `dir`
pub struct IntakeFixture {
    pub id_photo: PathBuf,
    pub invoice: PathBuf,
    pub registration: PathBuf,
}

pub fn write_matching_intake(dir: &Path) -> IntakeFixture {
    let patch = signature_patch(PATCH_SIZE.0, PATCH_SIZE.1, 0.0);
    IntakeFixture {
        id_photo: write_png(dir, "id.png", &card_photo(&patch)),
        invoice: write_png(dir, "invoice.png", &document_page(INVOICE_SIZE, &patch, INVOICE_PATCH_AT)),
        registration: write_png(
            dir,
            "registration.png",
            &document_page(REGISTRATION_SIZE, &patch, REGISTRATION_PATCH_AT),
        ),
    }
}

/// Detector stub returning scripted boxes.
///
/// Queued responses are consumed first, one per call; after that the answer
/// is looked up by the size of the image the detector is handed, defaulting
/// to no boxes. Every call records the image size it saw.
#[derive(Default)]
pub struct ScriptedDetector {
    queued: Mutex<VecDeque<Vec<BoundingBox>>>,
    by_size: HashMap<(u32, u32), Vec<BoundingBox>>,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_size(mut self, size: (u32, u32), boxes: Vec<BoundingBox>) -> Self {
        self.by_size.insert(size, boxes);
        self
    }

    pub fn then(self, boxes: Vec<BoundingBox>) -> Self {
        self.queued.lock().unwrap().push_back(boxes);
        self
    }

    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Detector for ScriptedDetector {
    fn detect(&self, image: &DynamicImage, min_confidence: f32) -> anyhow::Result<Vec<BoundingBox>> {
        let size = (image.width(), image.height());
        self.calls.lock().unwrap().push(size);

        let boxes = match self.queued.lock().unwrap().pop_front() {
            Some(boxes) => boxes,
            None => self.by_size.get(&size).cloned().unwrap_or_default(),
        };
        Ok(boxes.into_iter().filter(|b| b.confidence >= min_confidence).collect())
    }

    fn name(&self) -> &str {
        "Scripted"
    }
}

/// Detector whose model always errors
pub struct FailingDetector;

impl Detector for FailingDetector {
    fn detect(&self, _image: &DynamicImage, _min_confidence: f32) -> anyhow::Result<Vec<BoundingBox>> {
        anyhow::bail!("model weights not loaded")
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

/// Scripted detector that finds the fixture signature on every document
pub fn matching_detector() -> ScriptedDetector {
    ScriptedDetector::new()
        .on_size(ID_CROP_SIZE, vec![id_signature_box()])
        .on_size(INVOICE_SIZE, vec![patch_box(INVOICE_PATCH_AT, 0.8)])
        .on_size(REGISTRATION_SIZE, vec![patch_box(REGISTRATION_PATCH_AT, 0.8)])
}

pub fn extractor_with(detector: &Arc<ScriptedDetector>) -> SignatureExtractor {
    let model: Arc<dyn Detector> = detector.clone();
    SignatureExtractor::new(model, &EngineConfig::default())
}

pub fn comparator_with(detector: &Arc<ScriptedDetector>, staging_dir: &Path) -> SignatureComparator {
    let model: Arc<dyn Detector> = detector.clone();
    SignatureComparator::from_config(model, &EngineConfig::default(), staging_dir)
}
