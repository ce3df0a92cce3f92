use std::path::PathBuf;

use uuid::Uuid;

use crate::models::PredictorKind;

/// A persisted model bundle could not be used to serve predictions.
///
/// Fatal to the service instance; callers fall back to heuristics.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("model artifact not found: {}", path.display())]
    Missing { path: PathBuf },
    #[error("model artifact {} is unreadable", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact {} is corrupt", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write model artifact {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported bundle format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("{predictor} artifact belongs to training run {found}, metadata is from run {expected}")]
    RunMismatch {
        predictor: PredictorKind,
        expected: Uuid,
        found: Uuid,
    },
    #[error("metadata has no entry for the {0} predictor")]
    MissingPredictor(PredictorKind),
    #[error("{predictor} artifact holds a {found} model")]
    WrongFamily {
        predictor: PredictorKind,
        found: &'static str,
    },
    #[error("{predictor} model has {found} classes, expected {expected}")]
    ClassCount {
        predictor: PredictorKind,
        expected: usize,
        found: usize,
    },
    #[error("{predictor} model expects {model_inputs} inputs but its schema has {schema_columns} columns")]
    SchemaMismatch {
        predictor: PredictorKind,
        model_inputs: usize,
        schema_columns: usize,
    },
}

/// Training of a single predictor failed. Other predictors are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("not enough rows to split ({rows})")]
    EmptySplit { rows: usize },
    #[error("target has a single class")]
    SingleClass,
    #[error("class {class} has {count} rows, at least 2 are needed to stratify")]
    ClassTooSmall { class: usize, count: usize },
    #[error("model fit diverged: {0}")]
    DegenerateFit(String),
}

/// An inference request was rejected before feature construction.
#[derive(Debug, thiserror::Error)]
pub enum InputValidationError {
    #[error("request must be a flat JSON object")]
    NotAnObject,
    #[error("field `{key}` has unsupported type {kind}")]
    UnsupportedValue { key: String, kind: &'static str },
    #[error("field `{key}` is not a finite number")]
    NonFinite { key: String },
    #[error("{predictor} request is missing required fields: {}", keys.join(", "))]
    MissingKeys {
        predictor: PredictorKind,
        keys: Vec<String>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}
