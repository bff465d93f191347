//! Business-facing signature and stamp checks for a pawn intake.
//!
//! This is the only layer that turns detection and comparison outcomes into
//! instructions for a reviewer.

use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use crate::comparison::SignatureComparator;
use crate::detection::DocumentSource;
use crate::models::{ComparisonFailure, ComparisonOutcome, DetectionOutcome, DocumentKind};

pub const CHECK_STAMP_AND_SIGNATURE: &str = "stamp_and_signature_presence";
pub const CHECK_INVOICE_REVERSE_SIGNATURE: &str = "invoice_reverse_signature";
pub const CHECK_ID_INVOICE_MATCH: &str = "id_invoice_signature_match";
pub const CHECK_ID_REGISTRATION_MATCH: &str = "id_registration_signature_match";

/// Pass/fail verdict of one named check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
}

impl CheckResult {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub results: BTreeMap<String, CheckResult>,
    pub artifact_paths: BTreeMap<String, PathBuf>,
}

impl ValidationReport {
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.results.get(name)
    }

    pub fn all_passed(&self) -> bool {
        self.results.values().all(|r| r.passed)
    }
}

/// Documents of one intake session
#[derive(Debug, Clone)]
pub struct IntakeDocuments {
    /// Captures of the applicant's ID card, tried in order
    pub id_captures: Vec<PathBuf>,
    pub invoice_reverse: PathBuf,
    pub registration_card: PathBuf,
}

impl IntakeDocuments {
    pub fn new(
        id_captures: Vec<PathBuf>,
        invoice_reverse: impl Into<PathBuf>,
        registration_card: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id_captures,
            invoice_reverse: invoice_reverse.into(),
            registration_card: registration_card.into(),
        }
    }

    fn id_source(&self) -> DocumentSource {
        DocumentSource {
            kind: DocumentKind::IdCard,
            candidates: self.id_captures.clone(),
        }
    }
}

pub struct SignatureStampValidator {
    comparator: SignatureComparator,
}

impl SignatureStampValidator {
    pub fn new(comparator: SignatureComparator) -> Self {
        Self { comparator }
    }

    pub fn comparator(&self) -> &SignatureComparator {
        &self.comparator
    }

    /// Stamp and signature on the invoice front are never judged
    /// automatically.
    pub fn check_stamp_and_signature(&self) -> CheckResult {
        CheckResult::fail("Human review required to validate the stamp and signature on the invoice")
    }

    /// Endorsement: a signature must be present on the invoice reverse
    pub fn check_invoice_reverse_signature(&self, invoice_reverse: &Path) -> (CheckResult, Option<PathBuf>) {
        let artifact = self.comparator.named_artifact_path("invoice_reverse_presence");
        let outcome = self
            .comparator
            .extractor()
            .extract_document_signature(invoice_reverse, artifact.as_deref());

        let result = match outcome.root_cause() {
            DetectionOutcome::Found(_) => CheckResult::pass("Signature detected on invoice reverse"),
            DetectionOutcome::NotFound => CheckResult::fail(
                "No signature found on invoice reverse - request endorsement in favor of the lender",
            ),
            _ => CheckResult::fail(describe_failure(DocumentKind::InvoiceReverse, &outcome)),
        };
        (result, outcome.artifact().cloned())
    }

    /// Verdict on an ID-card-versus-document comparison
    pub fn check_signature_match(&self, outcome: &ComparisonOutcome) -> CheckResult {
        let left = outcome.left_kind;
        let right = outcome.right_kind;

        match &outcome.result {
            Ok(similarity) if similarity.is_match => CheckResult::pass(format!(
                "{} and {} signatures match (score {:.2})",
                capitalize(left.label()),
                right.label(),
                similarity.score
            )),
            Ok(similarity) => CheckResult::fail(format!(
                "Signatures found on {} and {} but do not match (score {:.2}) - needs correction: {}",
                left.label(),
                right.label(),
                similarity.score,
                mismatch_instruction(right)
            )),
            Err(ComparisonFailure::LeftFailed(reason)) => {
                CheckResult::fail(describe_failure(left, reason))
            }
            Err(ComparisonFailure::RightFailed(reason)) => {
                CheckResult::fail(describe_failure(right, reason))
            }
            Err(ComparisonFailure::BothFailed { left: l, right: r }) => CheckResult::fail(format!(
                "{}; {}",
                describe_failure(left, l),
                describe_failure(right, r)
            )),
        }
    }

    /// Run all four checks for one intake session
    pub fn run_validation_report(&self, documents: &IntakeDocuments) -> ValidationReport {
        let mut results = BTreeMap::new();
        let mut artifact_paths = BTreeMap::new();

        results.insert(CHECK_STAMP_AND_SIGNATURE.to_string(), self.check_stamp_and_signature());

        let (presence, presence_artifact) =
            self.check_invoice_reverse_signature(&documents.invoice_reverse);
        results.insert(CHECK_INVOICE_REVERSE_SIGNATURE.to_string(), presence);
        if let Some(path) = presence_artifact {
            artifact_paths.insert("invoice_reverse".to_string(), path);
        }

        let id = documents.id_source();
        let pairs = [
            (
                CHECK_ID_INVOICE_MATCH,
                "id_invoice",
                DocumentSource::single(DocumentKind::InvoiceReverse, &documents.invoice_reverse),
            ),
            (
                CHECK_ID_REGISTRATION_MATCH,
                "id_registration",
                DocumentSource::single(DocumentKind::RegistrationCard, &documents.registration_card),
            ),
        ];

        for (check, prefix, other) in pairs {
            let outcome = self.comparator.compare(&id, &other);
            results.insert(check.to_string(), self.check_signature_match(&outcome));

            if let Some(path) = outcome.left_artifact {
                artifact_paths.insert(format!("{}.{}", prefix, id.kind.slug()), path);
            }
            if let Some(path) = outcome.right_artifact {
                artifact_paths.insert(format!("{}.{}", prefix, other.kind.slug()), path);
            }
        }

        let passed = results.values().filter(|r| r.passed).count();
        info!("Validation report: {}/{} checks passed", passed, results.len());

        ValidationReport {
            generated_at: OffsetDateTime::now_utc(),
            results,
            artifact_paths,
        }
    }
}

/// Reviewer instruction for a document whose signature could not be used
pub fn describe_failure(kind: DocumentKind, outcome: &DetectionOutcome) -> String {
    let label = kind.label();
    let mut message = match outcome.root_cause() {
        DetectionOutcome::Found(_) => format!("Signature detected on {}", label),
        DetectionOutcome::NotFound => {
            format!("No signature found on {} - needs human review", label)
        }
        DetectionOutcome::Ambiguous(count) => format!(
            "{} signatures detected on {} - needs human review to identify the applicant's",
            count, label
        ),
        DetectionOutcome::SourceMissing(path) => format!(
            "{} file is missing ({}) - provide the document",
            capitalize(label),
            path.display()
        ),
        DetectionOutcome::NoCaptures => format!(
            "No capture of {} supplied - provide the document",
            label
        ),
        DetectionOutcome::RegionNotLocated => format!(
            "{} could not be located in the photo - provide a clearer photo",
            capitalize(label)
        ),
        DetectionOutcome::Unreadable { .. } => format!(
            "{} image could not be read - provide a clearer photo",
            capitalize(label)
        ),
        DetectionOutcome::DetectorFailed(_) => format!(
            "Signature detection failed on {} - needs human review",
            label
        ),
        // root_cause never returns this variant
        DetectionOutcome::CandidatesExhausted { .. } => {
            format!("No usable capture of {} - needs human review", label)
        }
    };

    if let DetectionOutcome::CandidatesExhausted { candidates, .. } = outcome {
        message.push_str(&format!(" ({} captures tried)", candidates.len()));
    }
    message
}

fn mismatch_instruction(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::RegistrationCard => "request correction within 24 hours",
        _ => "request the applicant to sign again as closely as possible to the ID card",
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
