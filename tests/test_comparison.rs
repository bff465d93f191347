//! Comparing the ID card signature against another document.

mod common;

use std::sync::Arc;

use common::*;

fn id_and_invoice(fixture: &IntakeFixture) -> (DocumentSource, DocumentSource) {
    (
        DocumentSource::id_card(&fixture.id_photo, &fixture.id_photo),
        DocumentSource::single(DocumentKind::InvoiceReverse, &fixture.invoice),
    )
}

#[test]
fn test_identical_signatures_match_perfectly() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let staging = dir.path().join("staging");
    let fixture = write_matching_intake(dir.path());
    let comparator = comparator_with(&Arc::new(matching_detector()), &staging);

    let (id, invoice) = id_and_invoice(&fixture);
    let outcome = comparator.compare(&id, &invoice);

    let similarity = outcome.similarity().expect("both sides should be found");
    assert_eq!(similarity.score, 1.0);
    assert!(similarity.is_match);
    assert!(outcome.is_match());

    let left = outcome.left_artifact.clone().unwrap();
    let right = outcome.right_artifact.clone().unwrap();
    assert!(left.starts_with(&staging) && left.exists());
    assert!(right.starts_with(&staging) && right.exists());
    assert_ne!(left, right);
    Ok(())
}

#[test]
fn test_left_failure_keeps_right_artifact_and_skips_scoring() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let staging = dir.path().join("staging");
    let fixture = write_matching_intake(dir.path());
    let detector = Arc::new(
        ScriptedDetector::new()
            .on_size(ID_CROP_SIZE, vec![])
            .on_size(INVOICE_SIZE, vec![patch_box(INVOICE_PATCH_AT, 0.8)]),
    );
    let comparator = comparator_with(&detector, &staging);

    let (id, invoice) = id_and_invoice(&fixture);
    let outcome = comparator.compare(&id, &invoice);

    match &outcome.result {
        Err(ComparisonFailure::LeftFailed(reason)) => {
            assert!(matches!(reason.root_cause(), DetectionOutcome::NotFound));
        }
        other => panic!("expected LeftFailed, got {:?}", other),
    }
    assert!(outcome.similarity().is_none());
    assert!(outcome.left_artifact.is_none());
    assert!(outcome.right_artifact.as_ref().is_some_and(|p| p.exists()));
    Ok(())
}

#[test]
fn test_right_failure_keeps_left_artifact() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let staging = dir.path().join("staging");
    let fixture = write_matching_intake(dir.path());
    let detector = Arc::new(
        ScriptedDetector::new()
            .on_size(ID_CROP_SIZE, vec![id_signature_box()])
            .on_size(
                INVOICE_SIZE,
                vec![
                    patch_box(INVOICE_PATCH_AT, 0.8),
                    patch_box((10, 10), 0.7),
                ],
            ),
    );
    let comparator = comparator_with(&detector, &staging);

    let (id, invoice) = id_and_invoice(&fixture);
    let outcome = comparator.compare(&id, &invoice);

    assert!(matches!(
        outcome.result,
        Err(ComparisonFailure::RightFailed(DetectionOutcome::Ambiguous(2)))
    ));
    assert!(outcome.left_artifact.is_some());
    assert!(outcome.right_artifact.is_none());
    Ok(())
}

#[test]
fn test_both_sides_are_attempted_when_both_fail() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let staging = dir.path().join("staging");
    let detector = Arc::new(ScriptedDetector::new());
    let comparator = comparator_with(&detector, &staging);

    let id = DocumentSource::id_card(dir.path().join("a.png"), dir.path().join("b.png"));
    let invoice = DocumentSource::single(DocumentKind::InvoiceReverse, dir.path().join("c.png"));
    let outcome = comparator.compare(&id, &invoice);

    match outcome.result {
        Err(ComparisonFailure::BothFailed { left, right }) => {
            assert!(matches!(left, DetectionOutcome::CandidatesExhausted { .. }));
            assert!(matches!(left.root_cause(), DetectionOutcome::SourceMissing(_)));
            assert!(matches!(right, DetectionOutcome::SourceMissing(_)));
        }
        other => panic!("expected BothFailed, got {:?}", other),
    }
    assert!(outcome.left_artifact.is_none() && outcome.right_artifact.is_none());
    Ok(())
}

#[test]
fn test_artifacts_can_be_disabled() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let staging = dir.path().join("staging");
    let fixture = write_matching_intake(dir.path());
    let comparator = comparator_with(&Arc::new(matching_detector()), &staging).with_artifacts(false);

    let (id, invoice) = id_and_invoice(&fixture);
    let outcome = comparator.compare(&id, &invoice);

    assert!(outcome.is_match());
    assert!(outcome.left_artifact.is_none() && outcome.right_artifact.is_none());
    assert!(!staging.exists());
    Ok(())
}

#[test]
fn test_visualization_writes_review_panel() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let staging = dir.path().join("staging");
    let fixture = write_matching_intake(dir.path());
    let comparator = comparator_with(&Arc::new(matching_detector()), &staging).with_visualization(true);

    let (id, invoice) = id_and_invoice(&fixture);
    comparator.compare(&id, &invoice);

    let panel = image::open(staging.join("id_vs_invoice_panel.png"))?;
    assert_eq!((panel.width(), panel.height()), (600, 600));
    Ok(())
}

#[test]
fn test_different_signatures_do_not_match() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let staging = dir.path().join("staging");
    let patch = signature_patch(PATCH_SIZE.0, PATCH_SIZE.1, 0.0);
    let id_photo = write_png(dir.path(), "id.png", &card_photo(&patch));
    let forged = write_png(
        dir.path(),
        "registration.png",
        &document_page(REGISTRATION_SIZE, &noise_patch(PATCH_SIZE.0, PATCH_SIZE.1), REGISTRATION_PATCH_AT),
    );
    let comparator = comparator_with(&Arc::new(matching_detector()), &staging);

    let outcome = comparator.compare(
        &DocumentSource::id_card(&id_photo, &id_photo),
        &DocumentSource::single(DocumentKind::RegistrationCard, &forged),
    );

    let similarity = outcome.similarity().unwrap();
    assert!(similarity.score < similarity.threshold);
    assert!(!outcome.is_match());
    assert!(outcome.left_artifact.is_some() && outcome.right_artifact.is_some());
    Ok(())
}
