pub mod comparison;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod report;
pub mod similarity;
pub mod staging;

pub use comparison::SignatureComparator;
pub use config::EngineConfig;
pub use detection::detector::{Detector, SignatureDetector};
pub use detection::ink::InkBlobDetector;
pub use detection::isolation::CredentialIsolator;
pub use detection::normalize::normalize;
pub use detection::{DocumentSource, SignatureExtractor};
pub use error::{EngineError, EngineResult};
pub use models::{
    BoundingBox, ComparisonFailure, ComparisonOutcome, DetectionOutcome, DocumentKind, Region,
    SignatureCrop, SimilarityResult,
};
pub use report::{CheckResult, IntakeDocuments, SignatureStampValidator, ValidationReport};
pub use similarity::SimilarityScorer;
pub use staging::StagingArea;
