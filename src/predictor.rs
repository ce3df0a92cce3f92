//! Online inference over a persisted training run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::bundle::{self, ModelArtifact, TrainedModelBundle};
use crate::codec::{FeatureCodec, FeatureInput, FeatureSchema};
use crate::dataset::synthetic_engagement_index;
use crate::error::{BundleError, InputValidationError};
use crate::metrics::round_to;
use crate::model::{Classifier, Regressor, RidgeRegressor, SoftmaxClassifier};
use crate::models::{DifficultyLevel, PredictorKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProbabilities {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
}

impl DifficultyProbabilities {
    pub fn get(&self, level: DifficultyLevel) -> f64 {
        match level {
            DifficultyLevel::Easy => self.easy,
            DifficultyLevel::Medium => self.medium,
            DifficultyLevel::Hard => self.hard,
        }
    }

    pub fn total(&self) -> f64 {
        self.easy + self.medium + self.hard
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskRecommendation {
    pub difficulty_level: DifficultyLevel,
    pub confidence: f64,
    pub probabilities: DifficultyProbabilities,
}

impl TaskRecommendation {
    /// The most probable level wins; `confidence` is its probability as is.
    pub fn from_distribution(probabilities: DifficultyProbabilities) -> Self {
        let difficulty_level = DifficultyLevel::ALL
            .into_iter()
            .fold(DifficultyLevel::Easy, |best, level| {
                if probabilities.get(level) > probabilities.get(best) {
                    level
                } else {
                    best
                }
            });
        Self {
            difficulty_level,
            confidence: probabilities.get(difficulty_level),
            probabilities,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentInsights {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mastery_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_index: Option<f64>,
    pub task_recommendation: TaskRecommendation,
}

/// Anything that can answer the three per-student questions.
pub trait InsightSource: Send + Sync {
    fn predict_mastery_score(&self, input: &FeatureInput) -> f64;
    fn predict_engagement_index(&self, input: &FeatureInput) -> f64;
    fn recommend_tasks(&self, input: &FeatureInput) -> TaskRecommendation;

    /// Mastery needs quiz data, engagement needs project data; the task
    /// recommendation is always produced.
    fn student_insights(&self, input: &FeatureInput) -> StudentInsights {
        let mastery_score = (input.contains("quiz_score") && input.contains("time_taken_seconds"))
            .then(|| self.predict_mastery_score(input));
        let engagement_index = (input.contains("tasks_completed") && input.contains("peer_review_score"))
            .then(|| self.predict_engagement_index(input));
        StudentInsights {
            mastery_score,
            engagement_index,
            task_recommendation: self.recommend_tasks(input),
        }
    }

    /// Extra checks on a parsed request before it is answered.
    fn validate(&self, _input: &FeatureInput) -> Result<(), InputValidationError> {
        Ok(())
    }

    /// Validate a raw request body and answer it.
    fn handle_request(&self, body: &Value) -> Result<StudentInsights, InputValidationError> {
        let input = FeatureInput::from_json(body)?;
        self.validate(&input)?;
        Ok(self.student_insights(&input))
    }
}

/// Clip to [0, 100] then round to 2 decimals.
pub fn bounded_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    round_to(raw.clamp(0.0, 100.0), 2)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Absent keys default to 0.
    #[default]
    Lenient,
    /// Requests must carry every numeric feature of the predictors they reach.
    Strict,
}

#[derive(Debug, Clone)]
struct LoadedRegressor {
    schema: FeatureSchema,
    model: RidgeRegressor,
}

#[derive(Debug, Clone)]
struct LoadedClassifier {
    schema: FeatureSchema,
    model: SoftmaxClassifier,
}

fn expect_regressor(bundle: TrainedModelBundle) -> Result<LoadedRegressor, BundleError> {
    match bundle.model {
        ModelArtifact::Ridge(model) => Ok(LoadedRegressor {
            schema: bundle.schema,
            model,
        }),
        other => Err(BundleError::WrongFamily {
            predictor: bundle.predictor,
            found: other.family(),
        }),
    }
}

fn expect_classifier(bundle: TrainedModelBundle) -> Result<LoadedClassifier, BundleError> {
    match bundle.model {
        ModelArtifact::Softmax(model) if model.classes() != DifficultyLevel::ALL.len() => {
            Err(BundleError::ClassCount {
                predictor: bundle.predictor,
                expected: DifficultyLevel::ALL.len(),
                found: model.classes(),
            })
        }
        ModelArtifact::Softmax(model) => Ok(LoadedClassifier {
            schema: bundle.schema,
            model,
        }),
        other => Err(BundleError::WrongFamily {
            predictor: bundle.predictor,
            found: other.family(),
        }),
    }
}

/// Immutable after construction; share it behind an `Arc` across callers.
#[derive(Debug, Clone)]
pub struct PredictorService {
    run_id: Uuid,
    codec: FeatureCodec,
    mastery: LoadedRegressor,
    engagement: LoadedRegressor,
    recommendation: LoadedClassifier,
    validation: ValidationMode,
}

impl PredictorService {
    pub fn load(dir: &Path) -> Result<Self, BundleError> {
        let metadata = bundle::read_metadata(dir)?;
        let mut bundles = Vec::with_capacity(PredictorKind::ALL.len());
        for predictor in PredictorKind::ALL {
            bundles.push(bundle::read_bundle(dir, &metadata, predictor)?);
        }
        let service = Self::from_bundles(metadata.run_id, metadata.codec, bundles)?;
        tracing::info!(run_id = %service.run_id, dir = %dir.display(), "loaded predictor bundles");
        Ok(service)
    }

    /// Assemble a service from in-memory bundles of a single training run.
    pub fn from_bundles(
        run_id: Uuid,
        codec: FeatureCodec,
        bundles: Vec<TrainedModelBundle>,
    ) -> Result<Self, BundleError> {
        let mut mastery = None;
        let mut engagement = None;
        let mut recommendation = None;
        for bundle in bundles {
            match bundle.predictor {
                PredictorKind::Mastery => mastery = Some(expect_regressor(bundle)?),
                PredictorKind::Engagement => engagement = Some(expect_regressor(bundle)?),
                PredictorKind::Recommendation => recommendation = Some(expect_classifier(bundle)?),
            }
        }
        Ok(Self {
            run_id,
            codec,
            mastery: mastery.ok_or(BundleError::MissingPredictor(PredictorKind::Mastery))?,
            engagement: engagement.ok_or(BundleError::MissingPredictor(PredictorKind::Engagement))?,
            recommendation: recommendation
                .ok_or(BundleError::MissingPredictor(PredictorKind::Recommendation))?,
            validation: ValidationMode::Lenient,
        })
    }

    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn schema(&self, predictor: PredictorKind) -> &FeatureSchema {
        match predictor {
            PredictorKind::Mastery => &self.mastery.schema,
            PredictorKind::Engagement => &self.engagement.schema,
            PredictorKind::Recommendation => &self.recommendation.schema,
        }
    }

    fn check_required(&self, predictor: PredictorKind, input: &FeatureInput) -> Result<(), InputValidationError> {
        let keys: Vec<String> = self
            .schema(predictor)
            .numeric_columns()
            .filter(|column| input.number(column).is_none())
            .map(str::to_string)
            .collect();
        if keys.is_empty() {
            Ok(())
        } else {
            Err(InputValidationError::MissingKeys { predictor, keys })
        }
    }
}

impl InsightSource for PredictorService {
    fn validate(&self, input: &FeatureInput) -> Result<(), InputValidationError> {
        if self.validation == ValidationMode::Lenient {
            return Ok(());
        }
        self.check_required(PredictorKind::Recommendation, input)?;
        if input.contains("quiz_score") && input.contains("time_taken_seconds") {
            self.check_required(PredictorKind::Mastery, input)?;
        }
        if input.contains("tasks_completed") && input.contains("peer_review_score") {
            self.check_required(PredictorKind::Engagement, input)?;
        }
        Ok(())
    }

    fn predict_mastery_score(&self, input: &FeatureInput) -> f64 {
        let features = self.mastery.schema.encode(&self.codec, input);
        bounded_score(self.mastery.model.predict(&features))
    }

    fn predict_engagement_index(&self, input: &FeatureInput) -> f64 {
        let features = self.engagement.schema.encode(&self.codec, input);
        bounded_score(self.engagement.model.predict(&features))
    }

    fn recommend_tasks(&self, input: &FeatureInput) -> TaskRecommendation {
        let features = self.recommendation.schema.encode(&self.codec, input);
        let proba = self.recommendation.model.predict_proba(&features);
        let at = |level: DifficultyLevel| proba.get(level.index()).copied().unwrap_or(0.0);
        TaskRecommendation::from_distribution(DifficultyProbabilities {
            easy: at(DifficultyLevel::Easy),
            medium: at(DifficultyLevel::Medium),
            hard: at(DifficultyLevel::Hard),
        })
    }
}

/// Rule-based estimates used when no trained bundle can be loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl InsightSource for HeuristicEstimator {
    fn predict_mastery_score(&self, input: &FeatureInput) -> f64 {
        let raw = match (input.number("quiz_score"), input.number("previous_mastery_score")) {
            (Some(quiz), Some(previous)) => 0.6 * quiz + 0.4 * previous,
            (Some(quiz), None) => quiz,
            (None, Some(previous)) => previous,
            (None, None) => input.number("baseline_proficiency").unwrap_or(0.0),
        };
        bounded_score(raw)
    }

    fn predict_engagement_index(&self, input: &FeatureInput) -> f64 {
        let value = |key| input.number(key).unwrap_or(0.0);
        bounded_score(synthetic_engagement_index(
            value("tasks_completed"),
            value("peer_review_score"),
            value("communication_score"),
            value("collaboration_score"),
        ))
    }

    fn recommend_tasks(&self, input: &FeatureInput) -> TaskRecommendation {
        let mastery = input
            .number("avg_mastery_score")
            .or_else(|| input.number("baseline_proficiency"))
            .unwrap_or(50.0);
        let level = DifficultyLevel::from_mastery(mastery);
        let one_hot = |candidate: DifficultyLevel| if candidate == level { 1.0 } else { 0.0 };
        TaskRecommendation::from_distribution(DifficultyProbabilities {
            easy: one_hot(DifficultyLevel::Easy),
            medium: one_hot(DifficultyLevel::Medium),
            hard: one_hot(DifficultyLevel::Hard),
        })
    }
}

/// Load the trained service from `dir`, or fall back to heuristics when the
/// bundle is missing or unusable.
pub fn load_or_fallback(dir: &Path, validation: ValidationMode) -> Box<dyn InsightSource> {
    match PredictorService::load(dir) {
        Ok(service) => Box::new(service.with_validation(validation)),
        Err(err) => {
            tracing::warn!(error = %err, dir = %dir.display(), "model bundle unavailable, using heuristics");
            Box::new(HeuristicEstimator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::dataset::DatasetBuilder;
    use crate::trainer::tests::cohort_snapshot;
    use crate::trainer::ModelTrainer;
    use serde_json::json;

    fn trained_service() -> PredictorService {
        let snapshot = cohort_snapshot(30);
        let datasets = DatasetBuilder::new(&snapshot).build_all();
        let outcome = ModelTrainer::new(TrainingConfig::default()).train_all(&datasets);
        PredictorService::from_bundles(Uuid::new_v4(), datasets.codec, outcome.bundles).unwrap()
    }

    fn request() -> FeatureInput {
        FeatureInput::from_json(&json!({
            "quiz_score": 85,
            "time_taken_seconds": 180,
            "number_of_attempts": 1,
            "previous_mastery_score": 70,
            "baseline_proficiency": 75,
            "subject": "Math",
            "topic": "Algebra",
            "difficulty_level": "hard",
            "grade": 10,
            "learning_pace": "fast",
            "preferred_learning_style": "visual",
            "tasks_completed": 10,
            "peer_review_score": 4.5,
            "communication_score": 4.3,
            "collaboration_score": 4.6,
            "creativity_score": 4.2,
            "project_completion_pct": 95,
            "role_in_team": "Leader",
            "avg_mastery_score": 75
        }))
        .unwrap()
    }

    #[test]
    fn predictions_are_bounded_and_rounded() {
        let service = trained_service();
        let mut input = request();
        input.insert("quiz_score", 10_000.0);
        let mastery = service.predict_mastery_score(&input);
        assert_eq!(mastery, 100.0);

        input.insert("quiz_score", -10_000.0);
        assert_eq!(service.predict_mastery_score(&input), 0.0);

        let engagement = service.predict_engagement_index(&request());
        assert!((0.0..=100.0).contains(&engagement));
        assert_eq!(engagement, round_to(engagement, 2));
    }

    #[test]
    fn recommendation_distribution_is_consistent() {
        let service = trained_service();
        let recommendation = service.recommend_tasks(&request());
        assert!((recommendation.probabilities.total() - 1.0).abs() < 1e-6);
        assert_eq!(
            recommendation.confidence,
            recommendation.probabilities.get(recommendation.difficulty_level)
        );
    }

    #[test]
    fn incomplete_and_unseen_input_never_fails() {
        let service = trained_service();
        let mut input = FeatureInput::new();
        input.insert("grade", "13");
        let insights = service.student_insights(&input);
        assert!(insights.mastery_score.is_none());
        assert!(insights.engagement_index.is_none());
        assert!((insights.task_recommendation.probabilities.total() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn insights_gate_on_available_signals() {
        let service = trained_service();
        let insights = service.student_insights(&request());
        assert!(insights.mastery_score.is_some());
        assert!(insights.engagement_index.is_some());
    }

    #[test]
    fn strict_mode_rejects_missing_fields() {
        let service = trained_service().with_validation(ValidationMode::Strict);
        let err = service
            .handle_request(&json!({"grade": 10, "avg_mastery_score": 70}))
            .unwrap_err();
        assert!(matches!(
            err,
            InputValidationError::MissingKeys { predictor: PredictorKind::Recommendation, ref keys }
                if keys.contains(&"baseline_proficiency".to_string())
        ));

        let lenient = trained_service();
        assert!(lenient
            .handle_request(&json!({"grade": 10, "avg_mastery_score": 70}))
            .is_ok());
    }

    #[test]
    fn extreme_magnitudes_keep_a_valid_distribution() {
        let service = trained_service();
        for extreme in [1.7e308, -1.7e308] {
            let insights = service
                .handle_request(&json!({
                    "quiz_score": extreme,
                    "time_taken_seconds": extreme,
                    "baseline_proficiency": extreme,
                    "avg_mastery_score": extreme,
                    "tasks_completed": extreme,
                    "peer_review_score": extreme,
                    "grade": 10
                }))
                .unwrap();
            let recommendation = insights.task_recommendation;
            assert!((recommendation.probabilities.total() - 1.0).abs() < 1e-6);
            assert_eq!(
                recommendation.confidence,
                recommendation.probabilities.get(recommendation.difficulty_level)
            );
            for score in [insights.mastery_score, insights.engagement_index].into_iter().flatten() {
                assert!((0.0..=100.0).contains(&score));
            }
        }
    }

    #[test]
    fn classifier_with_missing_classes_is_refused() {
        let snapshot = cohort_snapshot(30);
        let datasets = DatasetBuilder::new(&snapshot).build_all();
        let outcome = ModelTrainer::new(TrainingConfig::default()).train_all(&datasets);
        let bundles = outcome
            .bundles
            .into_iter()
            .map(|mut bundle| {
                if let ModelArtifact::Softmax(model) = &bundle.model {
                    let mut raw = serde_json::to_value(model).unwrap();
                    raw["weights"].as_array_mut().unwrap().pop();
                    raw["biases"].as_array_mut().unwrap().pop();
                    bundle.model = ModelArtifact::Softmax(serde_json::from_value(raw).unwrap());
                }
                bundle
            })
            .collect();
        assert!(matches!(
            PredictorService::from_bundles(Uuid::new_v4(), datasets.codec, bundles),
            Err(BundleError::ClassCount {
                predictor: PredictorKind::Recommendation,
                expected: 3,
                found: 2,
            })
        ));
    }

    #[test]
    fn malformed_requests_are_rejected() {
        let service = trained_service();
        assert!(matches!(
            service.handle_request(&json!("quiz_score=80")),
            Err(InputValidationError::NotAnObject)
        ));
    }

    #[test]
    fn missing_predictor_is_a_configuration_error() {
        let snapshot = cohort_snapshot(30);
        let datasets = DatasetBuilder::new(&snapshot).build_all();
        let mut outcome = ModelTrainer::new(TrainingConfig::default()).train_all(&datasets);
        outcome.bundles.retain(|b| b.predictor != PredictorKind::Engagement);
        assert!(matches!(
            PredictorService::from_bundles(Uuid::new_v4(), datasets.codec, outcome.bundles),
            Err(BundleError::MissingPredictor(PredictorKind::Engagement))
        ));
    }

    #[test]
    fn heuristics_follow_mastery_thresholds() {
        let estimator = HeuristicEstimator;
        let mut input = FeatureInput::new();
        input.insert("avg_mastery_score", 80.0);
        let recommendation = estimator.recommend_tasks(&input);
        assert_eq!(recommendation.difficulty_level, DifficultyLevel::Hard);
        assert_eq!(recommendation.confidence, 1.0);

        input.insert("tasks_completed", 50.0);
        input.insert("peer_review_score", 5.0);
        assert_eq!(estimator.predict_engagement_index(&input), 100.0);
    }

    #[test]
    fn fallback_when_bundle_missing() {
        let dir = tempfile::tempdir().unwrap();
        let source = load_or_fallback(dir.path(), ValidationMode::Lenient);
        let mut input = FeatureInput::new();
        input.insert("avg_mastery_score", 30.0);
        assert_eq!(
            source.recommend_tasks(&input).difficulty_level,
            DifficultyLevel::Easy
        );
    }
}
