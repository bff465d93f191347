mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from pawnsig for tests
pub use pawnsig::{
    BoundingBox, ComparisonFailure, DetectionOutcome, Detector, DocumentKind, DocumentSource,
    EngineConfig, SignatureComparator, SignatureExtractor,
};
