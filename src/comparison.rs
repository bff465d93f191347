use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::detection::detector::Detector;
use crate::detection::{DocumentSource, SignatureExtractor};
use crate::models::{ComparisonFailure, ComparisonOutcome, DetectionOutcome};
use crate::similarity::{comparison_panel, SimilarityScorer};

/// Extracts the signature on both sides of a document pair and scores them
/// against each other.
///
/// Detected crops are written into the injected staging directory so a
/// reviewer can audit them, whether or not the comparison itself succeeds.
#[derive(Clone)]
pub struct SignatureComparator {
    extractor: SignatureExtractor,
    scorer: SimilarityScorer,
    staging_dir: PathBuf,
    save_artifacts: bool,
    visualize: bool,
}

impl SignatureComparator {
    pub fn new(
        extractor: SignatureExtractor,
        scorer: SimilarityScorer,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            scorer,
            staging_dir: staging_dir.into(),
            save_artifacts: true,
            visualize: false,
        }
    }

    pub fn from_config(
        model: Arc<dyn Detector>,
        config: &EngineConfig,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            SignatureExtractor::new(model, config),
            SimilarityScorer::new(&config.comparison),
            staging_dir,
        )
        .with_artifacts(config.staging.save_artifacts)
        .with_visualization(config.comparison.visualize)
    }

    pub fn with_artifacts(mut self, save_artifacts: bool) -> Self {
        self.save_artifacts = save_artifacts;
        self
    }

    pub fn with_visualization(mut self, visualize: bool) -> Self {
        self.visualize = visualize;
        self
    }

    pub fn extractor(&self) -> &SignatureExtractor {
        &self.extractor
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Artifact location for one side of a named pair, if artifacts are kept
    pub fn artifact_path(&self, pair: &str, side: &str, source: &DocumentSource) -> Option<PathBuf> {
        self.named_artifact_path(&format!("{}_{}_{}", pair, side, source.kind.slug()))
    }

    /// `<staging>/<name>.png`, if artifacts are kept
    pub fn named_artifact_path(&self, name: &str) -> Option<PathBuf> {
        self.save_artifacts
            .then(|| self.staging_dir.join(format!("{}.png", name)))
    }

    /// Extract and score both sides. Both extractions always run; a failure on
    /// one side never prevents the other side's artifact from being written.
    pub fn compare(&self, left: &DocumentSource, right: &DocumentSource) -> ComparisonOutcome {
        let pair = format!("{}_vs_{}", left.kind.slug(), right.kind.slug());

        let left_artifact = self.artifact_path(&pair, "left", left);
        let right_artifact = self.artifact_path(&pair, "right", right);

        let left_outcome = self.extractor.extract(left, left_artifact.as_deref());
        let right_outcome = self.extractor.extract(right, right_artifact.as_deref());

        let left_saved = left_outcome.artifact().cloned();
        let right_saved = right_outcome.artifact().cloned();

        let result = match (left_outcome, right_outcome) {
            (DetectionOutcome::Found(l), DetectionOutcome::Found(r)) => {
                let a = self.scorer.canonicalize(&l.image);
                let b = self.scorer.canonicalize(&r.image);
                let similarity = self.scorer.score_canonical(&a, &b);

                if self.visualize {
                    let panel_path = self.staging_dir.join(format!("{}_panel.png", pair));
                    let saved = std::fs::create_dir_all(&self.staging_dir)
                        .map_err(image::ImageError::IoError)
                        .and_then(|()| comparison_panel(&a, &b).save(&panel_path));
                    match saved {
                        Ok(()) => info!("Saved comparison panel {:?}", panel_path),
                        Err(e) => warn!("Failed to save comparison panel {:?}: {}", panel_path, e),
                    }
                }

                info!(
                    "{} vs {}: score {:.3}, match {}",
                    left.kind.label(),
                    right.kind.label(),
                    similarity.score,
                    similarity.is_match
                );
                Ok(similarity)
            }
            (DetectionOutcome::Found(_), failed) => {
                warn!("{} signature unavailable: {}", right.kind.label(), failed);
                Err(ComparisonFailure::RightFailed(failed))
            }
            (failed, DetectionOutcome::Found(_)) => {
                warn!("{} signature unavailable: {}", left.kind.label(), failed);
                Err(ComparisonFailure::LeftFailed(failed))
            }
            (left_failed, right_failed) => {
                warn!(
                    "No signature on either side: {}: {}; {}: {}",
                    left.kind.label(),
                    left_failed,
                    right.kind.label(),
                    right_failed
                );
                Err(ComparisonFailure::BothFailed {
                    left: left_failed,
                    right: right_failed,
                })
            }
        };

        ComparisonOutcome {
            left_kind: left.kind,
            right_kind: right.kind,
            result,
            left_artifact: left_saved,
            right_artifact: right_saved,
        }
    }
}
