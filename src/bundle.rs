//! `metadata.json` plus one `<predictor>.json` artifact per predictor, all
//! stamped with the same run id.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{FeatureCodec, FeatureSchema};
use crate::config::TrainingConfig;
use crate::error::BundleError;
use crate::metrics::TrainingMetrics;
use crate::model::{Classifier, Regressor, RidgeRegressor, SoftmaxClassifier};
use crate::models::PredictorKind;

pub const FORMAT_VERSION: u32 = 1;
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelArtifact {
    Ridge(RidgeRegressor),
    Softmax(SoftmaxClassifier),
}

impl ModelArtifact {
    pub fn family(&self) -> &'static str {
        match self {
            Self::Ridge(_) => "ridge",
            Self::Softmax(_) => "softmax",
        }
    }

    pub fn input_dim(&self) -> usize {
        match self {
            Self::Ridge(model) => model.input_dim(),
            Self::Softmax(model) => model.input_dim(),
        }
    }
}

/// A trained predictor together with the schema it was fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModelBundle {
    pub predictor: PredictorKind,
    pub schema: FeatureSchema,
    pub model: ModelArtifact,
    pub metrics: TrainingMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorArtifact {
    pub run_id: Uuid,
    pub predictor: PredictorKind,
    pub model: ModelArtifact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorMetadata {
    pub schema: FeatureSchema,
    pub feature_columns: Vec<String>,
    pub metrics: TrainingMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub format_version: u32,
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub training: TrainingConfig,
    pub codec: FeatureCodec,
    pub predictors: BTreeMap<PredictorKind, PredictorMetadata>,
}

impl BundleMetadata {
    pub fn new(run_id: Uuid, training: TrainingConfig, codec: FeatureCodec, bundles: &[TrainedModelBundle]) -> Self {
        let predictors = bundles
            .iter()
            .map(|bundle| {
                (
                    bundle.predictor,
                    PredictorMetadata {
                        schema: bundle.schema.clone(),
                        feature_columns: bundle.schema.feature_names(),
                        metrics: bundle.metrics.clone(),
                    },
                )
            })
            .collect();
        Self {
            format_version: FORMAT_VERSION,
            run_id,
            trained_at: Utc::now(),
            training,
            codec,
            predictors,
        }
    }
}

pub fn artifact_path(dir: &Path, predictor: PredictorKind) -> PathBuf {
    dir.join(predictor.artifact_file())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BundleError> {
    let file = File::create(path).map_err(|source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).map_err(|source| BundleError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BundleError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(BundleError::Missing {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(BundleError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_reader(BufReader::new(file)).map_err(|source| BundleError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Write every bundle plus the metadata record. Artifacts of predictors
/// missing from `bundles` are removed so a stale model is never paired with
/// the new metadata.
pub fn write_run(dir: &Path, metadata: &BundleMetadata, bundles: &[TrainedModelBundle]) -> Result<(), BundleError> {
    std::fs::create_dir_all(dir).map_err(|source| BundleError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for predictor in PredictorKind::ALL {
        let path = artifact_path(dir, predictor);
        match bundles.iter().find(|bundle| bundle.predictor == predictor) {
            Some(bundle) => {
                let artifact = PredictorArtifact {
                    run_id: metadata.run_id,
                    predictor,
                    model: bundle.model.clone(),
                };
                write_json(&path, &artifact)?;
                tracing::info!(predictor = %predictor, path = %path.display(), "saved model artifact");
            }
            None => match std::fs::remove_file(&path) {
                Ok(()) => tracing::warn!(predictor = %predictor, "removed stale model artifact"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(BundleError::Io { path, source }),
            },
        }
    }

    let path = dir.join(METADATA_FILE);
    write_json(&path, metadata)?;
    tracing::info!(run_id = %metadata.run_id, path = %path.display(), "saved bundle metadata");
    Ok(())
}

pub fn read_metadata(dir: &Path) -> Result<BundleMetadata, BundleError> {
    let metadata: BundleMetadata = read_json(&dir.join(METADATA_FILE))?;
    if metadata.format_version != FORMAT_VERSION {
        return Err(BundleError::UnsupportedVersion {
            found: metadata.format_version,
            expected: FORMAT_VERSION,
        });
    }
    Ok(metadata)
}

pub fn read_artifact(dir: &Path, predictor: PredictorKind) -> Result<PredictorArtifact, BundleError> {
    read_json(&artifact_path(dir, predictor))
}

/// Load the bundle of `predictor`, checking it belongs to the metadata's run
/// and that the model accepts the recorded schema.
pub fn read_bundle(dir: &Path, metadata: &BundleMetadata, predictor: PredictorKind) -> Result<TrainedModelBundle, BundleError> {
    let entry = metadata
        .predictors
        .get(&predictor)
        .ok_or(BundleError::MissingPredictor(predictor))?;
    let artifact = read_artifact(dir, predictor)?;
    if artifact.run_id != metadata.run_id {
        return Err(BundleError::RunMismatch {
            predictor,
            expected: metadata.run_id,
            found: artifact.run_id,
        });
    }
    if artifact.model.input_dim() != entry.schema.len() {
        return Err(BundleError::SchemaMismatch {
            predictor,
            model_inputs: artifact.model.input_dim(),
            schema_columns: entry.schema.len(),
        });
    }
    Ok(TrainedModelBundle {
        predictor,
        schema: entry.schema.clone(),
        model: artifact.model,
        metrics: entry.metrics.clone(),
    })
}
