use image::DynamicImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::{BoundingBox, DetectionOutcome, SignatureCrop};

/// An object-detection capability that proposes signature boxes.
///
/// Implementations return every box whose confidence reaches
/// `min_confidence`, in coordinates of `image`. Trained models are plugged in
/// behind this trait; [`crate::detection::ink::InkBlobDetector`] is the
/// built-in heuristic.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &DynamicImage, min_confidence: f32) -> anyhow::Result<Vec<BoundingBox>>;

    /// Human-readable name for logs
    fn name(&self) -> &str;
}

/// Enforces the exactly-one-signature policy on top of a [`Detector`] and
/// crops the accepted box.
#[derive(Clone)]
pub struct SignatureDetector {
    model: Arc<dyn Detector>,
}

impl SignatureDetector {
    pub fn new(model: Arc<dyn Detector>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Run the detector on `image` and apply the cardinality policy:
    /// zero boxes is `NotFound`, more than one is `Ambiguous`, exactly one is
    /// cropped and returned as `Found`. The crop is written to `artifact`
    /// when a path is given.
    pub fn detect(
        &self,
        image: &DynamicImage,
        min_confidence: f32,
        artifact: Option<&Path>,
    ) -> DetectionOutcome {
        let boxes = match self.model.detect(image, min_confidence) {
            Ok(boxes) => boxes,
            Err(e) => {
                warn!("Detector {} failed: {:#}", self.model.name(), e);
                return DetectionOutcome::DetectorFailed(format!("{:#}", e));
            }
        };

        let boxes: Vec<BoundingBox> = boxes
            .into_iter()
            .filter(|b| b.confidence >= min_confidence)
            .collect();

        debug!(
            "Detector {} proposed {} box(es) at min confidence {:.2}",
            self.model.name(),
            boxes.len(),
            min_confidence
        );

        let bbox = match boxes.as_slice() {
            [] => return DetectionOutcome::NotFound,
            [only] => *only,
            many => return DetectionOutcome::Ambiguous(many.len()),
        };

        let Some((x, y, width, height)) = bbox.clamp_to(image.width(), image.height()) else {
            warn!("Detected box {:?} lies outside the {}x{} image", bbox, image.width(), image.height());
            return DetectionOutcome::NotFound;
        };

        let crop = image.crop_imm(x, y, width, height);
        let artifact = artifact.and_then(|path| save_artifact(&crop, path));

        DetectionOutcome::Found(SignatureCrop {
            image: crop,
            bbox,
            source: None,
            artifact,
        })
    }

    /// Detect on an image file. A missing file is reported before the
    /// detector is invoked.
    pub fn detect_file(
        &self,
        path: &Path,
        min_confidence: f32,
        artifact: Option<&Path>,
    ) -> DetectionOutcome {
        let image = match load_source(path) {
            Ok(image) => image,
            Err(outcome) => return outcome,
        };
        with_source(self.detect(&image, min_confidence, artifact), path)
    }
}

/// Decode a source image, mapping expected failures to outcome values
pub fn load_source(path: &Path) -> Result<DynamicImage, DetectionOutcome> {
    if !path.is_file() {
        return Err(DetectionOutcome::SourceMissing(path.to_path_buf()));
    }

    let decoded = image::ImageReader::open(path)
        .map_err(anyhow::Error::from)
        .and_then(|reader| reader.with_guessed_format().map_err(anyhow::Error::from))
        .and_then(|reader| reader.decode().map_err(anyhow::Error::from));

    decoded.map_err(|e| DetectionOutcome::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Record which file a found signature came from
pub(crate) fn with_source(outcome: DetectionOutcome, path: &Path) -> DetectionOutcome {
    match outcome {
        DetectionOutcome::Found(mut crop) => {
            crop.source = Some(path.to_path_buf());
            DetectionOutcome::Found(crop)
        }
        other => other,
    }
}

fn save_artifact(crop: &DynamicImage, path: &Path) -> Option<PathBuf> {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Failed to create artifact directory {:?}: {}", parent, e);
            return None;
        }
    }

    match crop.save(path) {
        Ok(()) => {
            info!("Saved signature artifact {:?}", path);
            Some(path.to_path_buf())
        }
        Err(e) => {
            warn!("Failed to save signature artifact {:?}: {}", path, e);
            None
        }
    }
}
