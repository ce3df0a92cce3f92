use std::path::Path;

use uuid::Uuid;

use crate::bundle::{self, BundleMetadata, ModelArtifact, TrainedModelBundle};
use crate::codec::FeatureCodec;
use crate::config::TrainingConfig;
use crate::dataset::{DatasetBuilder, Dataset, Datasets, TrainingSnapshot};
use crate::error::{BundleError, TrainingError};
use crate::metrics::{
    self, ClassificationMetrics, EvaluationMetrics, RegressionMetrics, TrainingMetrics,
};
use crate::model::{Classifier, Regressor, RidgeRegressor, SoftmaxClassifier};
use crate::models::{DifficultyLevel, PredictorKind};
use crate::split;

#[derive(Debug, Default)]
pub struct TrainingOutcome {
    pub bundles: Vec<TrainedModelBundle>,
    pub failures: Vec<(PredictorKind, TrainingError)>,
}

#[derive(Debug)]
pub struct TrainingReport {
    pub run_id: Uuid,
    pub trained: Vec<(PredictorKind, TrainingMetrics)>,
    pub failures: Vec<(PredictorKind, TrainingError)>,
}

pub struct ModelTrainer {
    config: TrainingConfig,
}

fn clip_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

fn select<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn train_mastery(&self, dataset: &Dataset) -> Result<TrainedModelBundle, TrainingError> {
        self.train_regressor(dataset)
    }

    pub fn train_engagement(&self, dataset: &Dataset) -> Result<TrainedModelBundle, TrainingError> {
        self.train_regressor(dataset)
    }

    fn train_regressor(&self, dataset: &Dataset) -> Result<TrainedModelBundle, TrainingError> {
        let split = split::train_test_split(dataset.len(), self.config.test_ratio, self.config.seed)?;
        let (train_x, test_x) = (select(&dataset.rows, &split.train), select(&dataset.rows, &split.test));
        let (train_y, test_y) = (
            select(&dataset.targets, &split.train),
            select(&dataset.targets, &split.test),
        );

        let model = RidgeRegressor::fit(&train_x, &train_y, dataset.schema.len(), self.config.ridge_lambda)?;

        let predict = |rows: &[Vec<f64>]| -> Vec<f64> {
            rows.iter().map(|row| clip_score(model.predict(row))).collect()
        };
        let (train_pred, test_pred) = (predict(&train_x), predict(&test_x));
        let evaluation = RegressionMetrics {
            train_rmse: metrics::rmse(&train_y, &train_pred),
            test_rmse: metrics::rmse(&test_y, &test_pred),
            train_r2: metrics::r2_score(&train_y, &train_pred),
            test_r2: metrics::r2_score(&test_y, &test_pred),
        };
        tracing::info!(
            predictor = %dataset.predictor,
            train_rows = train_x.len(),
            test_rows = test_x.len(),
            train_rmse = format_args!("{:.2}", evaluation.train_rmse),
            test_rmse = format_args!("{:.2}", evaluation.test_rmse),
            train_r2 = format_args!("{:.4}", evaluation.train_r2),
            test_r2 = format_args!("{:.4}", evaluation.test_r2),
            "trained regressor"
        );

        let metrics = TrainingMetrics {
            train_rows: train_x.len(),
            test_rows: test_x.len(),
            evaluation: EvaluationMetrics::Regression(evaluation),
            top_features: self.top_features(dataset, &model.importances()),
        };
        Ok(TrainedModelBundle {
            predictor: dataset.predictor,
            schema: dataset.schema.clone(),
            model: ModelArtifact::Ridge(model),
            metrics,
        })
    }

    pub fn train_recommendation(&self, dataset: &Dataset) -> Result<TrainedModelBundle, TrainingError> {
        let labels: Vec<usize> = dataset.targets.iter().map(|t| *t as usize).collect();
        let split = split::stratified_split(&labels, self.config.test_ratio, self.config.seed)?;
        let (train_x, test_x) = (select(&dataset.rows, &split.train), select(&dataset.rows, &split.test));
        let (train_y, test_y) = (select(&labels, &split.train), select(&labels, &split.test));

        let model = SoftmaxClassifier::fit(
            &train_x,
            &train_y,
            dataset.schema.len(),
            DifficultyLevel::ALL.len(),
            self.config.classifier,
        )?;

        let predict = |rows: &[Vec<f64>]| -> Vec<usize> { rows.iter().map(|row| model.predict(row)).collect() };
        let evaluation = ClassificationMetrics {
            train_accuracy: metrics::accuracy(&train_y, &predict(&train_x)),
            test_accuracy: metrics::accuracy(&test_y, &predict(&test_x)),
        };
        tracing::info!(
            predictor = %dataset.predictor,
            train_rows = train_x.len(),
            test_rows = test_x.len(),
            train_accuracy = format_args!("{:.4}", evaluation.train_accuracy),
            test_accuracy = format_args!("{:.4}", evaluation.test_accuracy),
            "trained classifier"
        );

        let metrics = TrainingMetrics {
            train_rows: train_x.len(),
            test_rows: test_x.len(),
            evaluation: EvaluationMetrics::Classification(evaluation),
            top_features: self.top_features(dataset, &model.importances()),
        };
        Ok(TrainedModelBundle {
            predictor: dataset.predictor,
            schema: dataset.schema.clone(),
            model: ModelArtifact::Softmax(model),
            metrics,
        })
    }

    fn top_features(&self, dataset: &Dataset, importances: &[f64]) -> Vec<metrics::FeatureImportance> {
        let top = metrics::top_features(&dataset.schema.feature_names(), importances, self.config.top_features);
        for entry in &top {
            tracing::debug!(
                predictor = %dataset.predictor,
                feature = %entry.feature,
                importance = format_args!("{:.4}", entry.importance),
                "feature importance"
            );
        }
        top
    }

    /// Train all three predictors. A failure is recorded for its predictor
    /// and does not stop the others.
    pub fn train_all(&self, datasets: &Datasets) -> TrainingOutcome {
        let mut outcome = TrainingOutcome::default();
        let results = [
            (PredictorKind::Mastery, self.train_mastery(&datasets.mastery)),
            (PredictorKind::Engagement, self.train_engagement(&datasets.engagement)),
            (
                PredictorKind::Recommendation,
                self.train_recommendation(&datasets.recommendation),
            ),
        ];
        for (predictor, result) in results {
            match result {
                Ok(bundle) => outcome.bundles.push(bundle),
                Err(err) => {
                    tracing::warn!(predictor = %predictor, error = %err, "training failed");
                    outcome.failures.push((predictor, err));
                }
            }
        }
        outcome
    }

    pub fn persist(
        &self,
        dir: &Path,
        codec: FeatureCodec,
        outcome: TrainingOutcome,
    ) -> Result<TrainingReport, BundleError> {
        let run_id = Uuid::new_v4();
        let metadata = BundleMetadata::new(run_id, self.config.clone(), codec, &outcome.bundles);
        bundle::write_run(dir, &metadata, &outcome.bundles)?;
        Ok(TrainingReport {
            run_id,
            trained: outcome
                .bundles
                .into_iter()
                .map(|bundle| (bundle.predictor, bundle.metrics))
                .collect(),
            failures: outcome.failures,
        })
    }

    /// Build datasets from `snapshot`, train, and write the run to `dir`.
    pub fn run(&self, snapshot: &TrainingSnapshot, dir: &Path) -> Result<TrainingReport, BundleError> {
        let datasets = DatasetBuilder::new(snapshot).build_all();
        let outcome = self.train_all(&datasets);
        let report = self.persist(dir, datasets.codec, outcome)?;
        tracing::info!(
            run_id = %report.run_id,
            trained = report.trained.len(),
            failed = report.failures.len(),
            "training run complete"
        );
        Ok(report)
    }
}
