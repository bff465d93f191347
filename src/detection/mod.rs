pub mod contours;
pub mod detector;
pub mod ink;
pub mod isolation;
pub mod normalize;

use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::models::{DetectionOutcome, DocumentKind};
use detector::{load_source, with_source, Detector, SignatureDetector};
use isolation::CredentialIsolator;

/// A document to extract a signature from: its kind and the capture(s) to
/// try, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSource {
    pub kind: DocumentKind,
    pub candidates: Vec<PathBuf>,
}

impl DocumentSource {
    /// An ID card supplied as two captures of the same card
    pub fn id_card(first: impl Into<PathBuf>, second: impl Into<PathBuf>) -> Self {
        Self {
            kind: DocumentKind::IdCard,
            candidates: vec![first.into(), second.into()],
        }
    }

    pub fn single(kind: DocumentKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            candidates: vec![path.into()],
        }
    }
}

/// Per-document-kind signature extraction: credential isolation (card
/// photographs only) followed by the signature detector, with first-success
/// fallback across candidate captures.
#[derive(Clone)]
pub struct SignatureExtractor {
    pub detector: SignatureDetector,
    pub isolator: CredentialIsolator,
    pub id_min_confidence: f32,
    pub document_min_confidence: f32,
    pub isolate_registration_card: bool,
}

impl SignatureExtractor {
    pub fn new(model: Arc<dyn Detector>, config: &EngineConfig) -> Self {
        Self {
            detector: SignatureDetector::new(model),
            isolator: CredentialIsolator::new(&config.isolator),
            id_min_confidence: config.detector.id_min_confidence,
            document_min_confidence: config.detector.document_min_confidence,
            isolate_registration_card: config.isolator.isolate_registration_card,
        }
    }

    pub fn min_confidence(&self, kind: DocumentKind) -> f32 {
        match kind {
            DocumentKind::IdCard => self.id_min_confidence,
            _ => self.document_min_confidence,
        }
    }

    /// ID cards are always photographed; registration cards only when
    /// configured. Other documents are pre-cropped pages.
    pub fn isolates_credential(&self, kind: DocumentKind) -> bool {
        match kind {
            DocumentKind::IdCard => true,
            DocumentKind::RegistrationCard => self.isolate_registration_card,
            DocumentKind::InvoiceReverse => false,
        }
    }

    /// Signature on an ID card captured twice: `first` is tried, then
    /// `second`. The first `Found` wins.
    pub fn extract_id_signature(
        &self,
        first: &Path,
        second: &Path,
        artifact: Option<&Path>,
    ) -> DetectionOutcome {
        self.extract_id_signature_from(&[first.to_path_buf(), second.to_path_buf()], artifact)
    }

    /// Signature on an ID card from any number of ordered captures
    pub fn extract_id_signature_from(
        &self,
        candidates: &[PathBuf],
        artifact: Option<&Path>,
    ) -> DetectionOutcome {
        self.first_found(DocumentKind::IdCard, candidates, artifact)
    }

    /// Signature on a single pre-cropped document page (no isolation)
    pub fn extract_document_signature(
        &self,
        path: &Path,
        artifact: Option<&Path>,
    ) -> DetectionOutcome {
        self.attempt(DocumentKind::InvoiceReverse, path, artifact)
    }

    pub fn extract(&self, source: &DocumentSource, artifact: Option<&Path>) -> DetectionOutcome {
        self.first_found(source.kind, &source.candidates, artifact)
    }

    fn first_found(
        &self,
        kind: DocumentKind,
        candidates: &[PathBuf],
        artifact: Option<&Path>,
    ) -> DetectionOutcome {
        match candidates {
            [] => {
                warn!("No captures supplied for {}", kind.label());
                return DetectionOutcome::NoCaptures;
            }
            [only] => return self.attempt(kind, only, artifact),
            _ => {}
        }

        let mut last = DetectionOutcome::NotFound;
        for (i, path) in candidates.iter().enumerate() {
            let outcome = self.attempt(kind, path, artifact);
            if outcome.is_found() {
                if i > 0 {
                    info!("{} signature found in fallback capture {:?}", kind.label(), path);
                }
                return outcome;
            }
            debug!("{} capture {:?} failed: {}", kind.label(), path, outcome);
            last = outcome;
        }

        DetectionOutcome::CandidatesExhausted {
            candidates: candidates.to_vec(),
            last: Box::new(last),
        }
    }

    /// One detection attempt on one file
    fn attempt(&self, kind: DocumentKind, path: &Path, artifact: Option<&Path>) -> DetectionOutcome {
        let min_confidence = self.min_confidence(kind);

        if !self.isolates_credential(kind) {
            return self.detector.detect_file(path, min_confidence, artifact);
        }

        let image = match load_source(path) {
            Ok(image) => image,
            Err(outcome) => return outcome,
        };

        let Some((_, credential)) = self.isolator.isolate(&image) else {
            return DetectionOutcome::RegionNotLocated;
        };

        with_source(self.detector.detect(&credential, min_confidence, artifact), path)
    }
}
