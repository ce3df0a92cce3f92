mod common;

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use learning_insights::bundle::{artifact_path, read_metadata, METADATA_FILE};
use learning_insights::config::TrainingConfig;
use learning_insights::error::BundleError;
use learning_insights::models::PredictorKind;
use learning_insights::predictor::{
    load_or_fallback, InsightSource, PredictorService, ValidationMode,
};
use learning_insights::snapshot::load_snapshot;
use learning_insights::trainer::{ModelTrainer, TrainingReport};

fn train_into(models_dir: &Path) -> TrainingReport {
    let data = tempfile::tempdir().unwrap();
    common::write_snapshot(data.path(), 30);
    let snapshot = load_snapshot(data.path()).unwrap();
    ModelTrainer::new(TrainingConfig::default())
        .run(&snapshot, models_dir)
        .unwrap()
}

fn full_request() -> Value {
    json!({
        "quiz_score": 72,
        "time_taken_seconds": 540,
        "number_of_attempts": 1,
        "previous_mastery_score": 66,
        "baseline_proficiency": 60,
        "subject": "Math",
        "topic": "Algebra",
        "difficulty_level": "medium",
        "grade": 10,
        "learning_pace": "average",
        "preferred_learning_style": "visual",
        "tasks_completed": 7,
        "peer_review_score": 3.8,
        "communication_score": 4,
        "collaboration_score": 4,
        "creativity_score": 3.5,
        "project_completion_pct": 75,
        "role_in_team": "Coder",
        "avg_mastery_score": 64,
        "avg_peer_score": 3.8,
        "total_tasks": 7
    })
}

#[test]
fn train_persist_load_and_predict() {
    let models = tempfile::tempdir().unwrap();
    let report = train_into(models.path());
    assert_eq!(report.trained.len(), 3);
    assert!(report.failures.is_empty());

    let metadata = read_metadata(models.path()).unwrap();
    assert_eq!(metadata.run_id, report.run_id);
    let mastery = &metadata.predictors[&PredictorKind::Mastery];
    assert_eq!(mastery.feature_columns[0], "quiz_score");
    assert!(mastery
        .feature_columns
        .iter()
        .any(|name| name == "subject_encoded"));

    let service = PredictorService::load(models.path()).unwrap();
    assert_eq!(service.run_id(), report.run_id);

    let insights = service.handle_request(&full_request()).unwrap();
    let mastery_score = insights.mastery_score.unwrap();
    let engagement_index = insights.engagement_index.unwrap();
    assert!((0.0..=100.0).contains(&mastery_score));
    assert!((0.0..=100.0).contains(&engagement_index));

    let recommendation = insights.task_recommendation;
    assert!((recommendation.probabilities.total() - 1.0).abs() < 1e-6);
    assert_eq!(
        recommendation.confidence,
        recommendation
            .probabilities
            .get(recommendation.difficulty_level)
    );
}

#[test]
fn unseen_categories_and_missing_fields_still_answer() {
    let models = tempfile::tempdir().unwrap();
    train_into(models.path());
    let service = PredictorService::load(models.path()).unwrap();

    let insights = service
        .handle_request(&json!({
            "quiz_score": 90,
            "time_taken_seconds": 300,
            "subject": "Astronomy",
            "grade": "12"
        }))
        .unwrap();
    assert!(insights.mastery_score.is_some());
    assert!(insights.engagement_index.is_none());
}

#[test]
fn strict_service_rejects_incomplete_requests() {
    let models = tempfile::tempdir().unwrap();
    train_into(models.path());
    let source = load_or_fallback(models.path(), ValidationMode::Strict);
    assert!(source.handle_request(&json!({"grade": 10})).is_err());
    assert!(source.handle_request(&full_request()).is_ok());
}

#[test]
fn retraining_the_same_snapshot_gives_the_same_metrics() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let a = train_into(first.path());
    let b = train_into(second.path());
    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.trained, b.trained);
}

#[test]
fn missing_bundle_falls_back_to_heuristics() {
    let models = tempfile::tempdir().unwrap();
    assert!(matches!(
        PredictorService::load(models.path()),
        Err(BundleError::Missing { .. })
    ));

    let source = load_or_fallback(models.path(), ValidationMode::Lenient);
    let insights = source.handle_request(&full_request()).unwrap();
    assert_eq!(insights.task_recommendation.confidence, 1.0);
}

#[test]
fn artifact_from_another_run_is_rejected() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    train_into(first.path());
    train_into(second.path());

    fs::copy(
        artifact_path(second.path(), PredictorKind::Mastery),
        artifact_path(first.path(), PredictorKind::Mastery),
    )
    .unwrap();

    assert!(matches!(
        PredictorService::load(first.path()),
        Err(BundleError::RunMismatch {
            predictor: PredictorKind::Mastery,
            ..
        })
    ));
}

#[test]
fn corrupt_artifact_is_a_configuration_error() {
    let models = tempfile::tempdir().unwrap();
    train_into(models.path());
    fs::write(
        artifact_path(models.path(), PredictorKind::Engagement),
        "{ not json",
    )
    .unwrap();

    assert!(matches!(
        PredictorService::load(models.path()),
        Err(BundleError::Corrupt { .. })
    ));
}

#[test]
fn newer_bundle_format_is_refused() {
    let models = tempfile::tempdir().unwrap();
    train_into(models.path());

    let path = models.path().join(METADATA_FILE);
    let mut metadata: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    metadata["format_version"] = json!(99);
    fs::write(&path, serde_json::to_string(&metadata).unwrap()).unwrap();

    assert!(matches!(
        PredictorService::load(models.path()),
        Err(BundleError::UnsupportedVersion { found: 99, .. })
    ));
}

#[test]
fn recommendation_artifact_missing_a_class_is_refused() {
    let models = tempfile::tempdir().unwrap();
    train_into(models.path());

    let path = artifact_path(models.path(), PredictorKind::Recommendation);
    let mut artifact: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    artifact["model"]["weights"].as_array_mut().unwrap().pop();
    artifact["model"]["biases"].as_array_mut().unwrap().pop();
    fs::write(&path, serde_json::to_string(&artifact).unwrap()).unwrap();

    assert!(matches!(
        PredictorService::load(models.path()),
        Err(BundleError::ClassCount {
            predictor: PredictorKind::Recommendation,
            found: 2,
            ..
        })
    ));
}
