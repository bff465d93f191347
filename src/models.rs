use image::DynamicImage;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Detector box in pixel coordinates of the image it was run on.
/// `x2`/`y2` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub confidence: f32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Clamp to an image of the given size and return `(x, y, width, height)`,
    /// or `None` when nothing of the box lies inside the image.
    pub fn clamp_to(&self, img_width: u32, img_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = self.x1.clamp(0, img_width as i32) as u32;
        let y1 = self.y1.clamp(0, img_height as i32) as u32;
        let x2 = self.x2.clamp(0, img_width as i32) as u32;
        let y2 = self.y2.clamp(0, img_height as i32) as u32;

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1, y1, x2 - x1, y2 - y1))
    }
}

/// Axis-aligned region of foreground pixels, bounds inclusive
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub label: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> u32 {
        self.pixel_count
    }

    pub fn bbox_area(&self) -> u32 {
        self.width() * self.height()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width() as f32 / self.height() as f32
    }
}

/// The documents a pawn intake carries a signature on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    IdCard,
    InvoiceReverse,
    RegistrationCard,
}

impl DocumentKind {
    /// Human-facing name used in report messages
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::IdCard => "ID card",
            DocumentKind::InvoiceReverse => "invoice reverse",
            DocumentKind::RegistrationCard => "vehicle registration card",
        }
    }

    /// Short name used in artifact filenames
    pub fn slug(&self) -> &'static str {
        match self {
            DocumentKind::IdCard => "id",
            DocumentKind::InvoiceReverse => "invoice",
            DocumentKind::RegistrationCard => "registration",
        }
    }
}

/// A single detected signature
#[derive(Debug, Clone)]
pub struct SignatureCrop {
    /// Pixels inside the detector box, in the source's color space
    pub image: DynamicImage,
    /// Box relative to the image the detector ran on
    pub bbox: BoundingBox,
    /// File the signature was extracted from
    pub source: Option<PathBuf>,
    /// Where the crop was persisted for audit, if it was
    pub artifact: Option<PathBuf>,
}

/// Result of one detection attempt. Exactly one variant per attempt.
#[derive(Debug, Clone)]
pub enum DetectionOutcome {
    Found(SignatureCrop),
    NotFound,
    Ambiguous(usize),
    SourceMissing(PathBuf),
    /// No capture was supplied at all
    NoCaptures,
    RegionNotLocated,
    Unreadable { path: PathBuf, reason: String },
    DetectorFailed(String),
    /// Every candidate capture failed; `last` is the final attempt's outcome
    CandidatesExhausted {
        candidates: Vec<PathBuf>,
        last: Box<DetectionOutcome>,
    },
}

impl DetectionOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, DetectionOutcome::Found(_))
    }

    pub fn crop(&self) -> Option<&SignatureCrop> {
        match self {
            DetectionOutcome::Found(crop) => Some(crop),
            _ => None,
        }
    }

    pub fn artifact(&self) -> Option<&PathBuf> {
        self.crop().and_then(|c| c.artifact.as_ref())
    }

    /// The most specific failure: unwraps exhausted candidates to the last
    /// attempt's reason.
    pub fn root_cause(&self) -> &DetectionOutcome {
        match self {
            DetectionOutcome::CandidatesExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

impl fmt::Display for DetectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionOutcome::Found(crop) => write!(
                f,
                "signature found at ({}, {})-({}, {}) with confidence {:.2}",
                crop.bbox.x1, crop.bbox.y1, crop.bbox.x2, crop.bbox.y2, crop.bbox.confidence
            ),
            DetectionOutcome::NotFound => write!(f, "no signature detected"),
            DetectionOutcome::Ambiguous(count) => {
                write!(f, "{} signatures detected, expected exactly one", count)
            }
            DetectionOutcome::SourceMissing(path) => {
                write!(f, "file does not exist: {}", path.display())
            }
            DetectionOutcome::NoCaptures => write!(f, "no captures supplied"),
            DetectionOutcome::RegionNotLocated => {
                write!(f, "credential could not be located in the image")
            }
            DetectionOutcome::Unreadable { path, reason } => {
                write!(f, "failed to decode {}: {}", path.display(), reason)
            }
            DetectionOutcome::DetectorFailed(reason) => {
                write!(f, "signature detector failed: {}", reason)
            }
            DetectionOutcome::CandidatesExhausted { candidates, last } => {
                write!(f, "no valid signature found in any candidate file:")?;
                for candidate in candidates {
                    write!(f, "\n  - {}", candidate.display())?;
                }
                write!(f, "\nlast attempt: {}", last)
            }
        }
    }
}

/// SSIM score and the decision taken against a fixed threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub score: f64,
    pub is_match: bool,
    pub threshold: f64,
}

impl SimilarityResult {
    /// `score` is clamped into [0, 1]; `is_match` is `score >= threshold`.
    pub fn new(score: f64, threshold: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            score,
            is_match: score >= threshold,
            threshold,
        }
    }
}

/// Which side(s) of a comparison failed to yield a signature
#[derive(Debug, Clone)]
pub enum ComparisonFailure {
    LeftFailed(DetectionOutcome),
    RightFailed(DetectionOutcome),
    BothFailed {
        left: DetectionOutcome,
        right: DetectionOutcome,
    },
}

impl fmt::Display for ComparisonFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonFailure::LeftFailed(reason) => write!(f, "left side failed: {}", reason),
            ComparisonFailure::RightFailed(reason) => write!(f, "right side failed: {}", reason),
            ComparisonFailure::BothFailed { left, right } => {
                write!(f, "both sides failed: left: {}; right: {}", left, right)
            }
        }
    }
}

/// Outcome of comparing one document pair. Artifact paths are kept for
/// whichever side was detected, even when the comparison failed.
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub left_kind: DocumentKind,
    pub right_kind: DocumentKind,
    pub result: Result<SimilarityResult, ComparisonFailure>,
    pub left_artifact: Option<PathBuf>,
    pub right_artifact: Option<PathBuf>,
}

impl ComparisonOutcome {
    pub fn similarity(&self) -> Option<&SimilarityResult> {
        self.result.as_ref().ok()
    }

    pub fn is_match(&self) -> bool {
        self.similarity().is_some_and(|s| s.is_match)
    }
}
