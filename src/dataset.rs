//! Offline feature engineering: joins the raw training snapshot into one
//! labeled dataset per predictor.

use std::collections::HashMap;

use crate::codec::{CodecBuilder, FeatureCodec, FeatureColumn, FeatureInput, FeatureSchema};
use crate::models::{
    DifficultyLevel, MasteryLabel, PredictorKind, ProjectActivity, QuizAttempt, StudentProfile,
};

/// Mean mastery assumed for students without any mastery label when
/// bucketing the recommendation target.
const DEFAULT_BUCKET_MASTERY: f64 = 50.0;

#[derive(Debug, Clone, Default)]
pub struct TrainingSnapshot {
    pub students: Vec<StudentProfile>,
    pub quiz_attempts: Vec<QuizAttempt>,
    pub mastery_labels: Vec<MasteryLabel>,
    pub project_activities: Vec<ProjectActivity>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub predictor: PredictorKind,
    pub schema: FeatureSchema,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Datasets {
    pub codec: FeatureCodec,
    pub mastery: Dataset,
    pub engagement: Dataset,
    pub recommendation: Dataset,
}

pub fn mastery_schema() -> FeatureSchema {
    FeatureSchema::new(vec![
        FeatureColumn::numeric("quiz_score"),
        FeatureColumn::numeric("time_taken_seconds"),
        FeatureColumn::numeric("number_of_attempts"),
        FeatureColumn::numeric("previous_mastery_score"),
        FeatureColumn::numeric("baseline_proficiency"),
        FeatureColumn::categorical("subject"),
        FeatureColumn::categorical("topic"),
        FeatureColumn::categorical("difficulty_level"),
        FeatureColumn::categorical("grade"),
        FeatureColumn::categorical("learning_pace"),
        FeatureColumn::categorical("preferred_learning_style"),
    ])
}

pub fn engagement_schema() -> FeatureSchema {
    FeatureSchema::new(vec![
        FeatureColumn::numeric("tasks_completed"),
        FeatureColumn::numeric("peer_review_score"),
        FeatureColumn::numeric("communication_score"),
        FeatureColumn::numeric("collaboration_score"),
        FeatureColumn::numeric("creativity_score"),
        FeatureColumn::numeric("project_completion_pct"),
        FeatureColumn::numeric("baseline_proficiency"),
        FeatureColumn::categorical("role_in_team"),
        FeatureColumn::categorical("grade"),
        FeatureColumn::categorical("learning_pace"),
        FeatureColumn::categorical("preferred_learning_style"),
    ])
}

pub fn recommendation_schema(with_project_stats: bool) -> FeatureSchema {
    let mut columns = vec![
        FeatureColumn::numeric("baseline_proficiency"),
        FeatureColumn::numeric("avg_mastery_score"),
        FeatureColumn::categorical("grade"),
        FeatureColumn::categorical("learning_pace"),
        FeatureColumn::categorical("preferred_learning_style"),
    ];
    if with_project_stats {
        columns.push(FeatureColumn::numeric("avg_peer_score"));
        columns.push(FeatureColumn::numeric("total_tasks"));
    }
    FeatureSchema::new(columns)
}

/// Engagement target used when a project row carries no ground-truth label.
pub fn synthetic_engagement_index(
    tasks_completed: f64,
    peer_review_score: f64,
    communication_score: f64,
    collaboration_score: f64,
) -> f64 {
    (tasks_completed * 2.0
        + peer_review_score * 10.0
        + communication_score * 8.0
        + collaboration_score * 8.0)
        .clamp(0.0, 100.0)
}

/// Copies the profile fields every predictor shares into `input`.
pub fn insert_profile_features(input: &mut FeatureInput, profile: &StudentProfile) {
    input.insert_opt("baseline_proficiency", profile.baseline_proficiency);
    input.insert_category("grade", &profile.grade);
    input.insert_category("section", &profile.section);
    input.insert_category("learning_pace", &profile.learning_pace);
    input.insert_category("preferred_learning_style", &profile.preferred_learning_style);
}

pub struct DatasetBuilder<'a> {
    snapshot: &'a TrainingSnapshot,
    profiles: HashMap<&'a str, &'a StudentProfile>,
    codec: FeatureCodec,
}

impl<'a> DatasetBuilder<'a> {
    /// Fits the categorical codec over every table of `snapshot`.
    pub fn new(snapshot: &'a TrainingSnapshot) -> Self {
        let mut builder = CodecBuilder::new();
        builder
            .fit("subject", snapshot.quiz_attempts.iter().map(|q| &q.subject))
            .fit("topic", snapshot.quiz_attempts.iter().map(|q| &q.topic))
            .fit(
                "difficulty_level",
                snapshot.quiz_attempts.iter().map(|q| &q.difficulty_level),
            )
            .fit("grade", snapshot.students.iter().map(|s| &s.grade))
            .fit("section", snapshot.students.iter().map(|s| &s.section))
            .fit(
                "learning_pace",
                snapshot.students.iter().map(|s| &s.learning_pace),
            )
            .fit(
                "preferred_learning_style",
                snapshot.students.iter().map(|s| &s.preferred_learning_style),
            )
            .fit(
                "role_in_team",
                snapshot.project_activities.iter().map(|p| &p.role_in_team),
            );

        // First profile wins on duplicate ids, matching a left join that keeps input order.
        let mut profiles = HashMap::new();
        for student in &snapshot.students {
            profiles.entry(student.student_id.as_str()).or_insert(student);
        }

        Self {
            snapshot,
            profiles,
            codec: builder.build(),
        }
    }

    fn profile_input(&self, student_id: &str) -> FeatureInput {
        let mut input = FeatureInput::new();
        if let Some(profile) = self.profiles.get(student_id) {
            insert_profile_features(&mut input, profile);
        }
        input
    }

    fn dataset(
        &self,
        predictor: PredictorKind,
        schema: FeatureSchema,
        labeled: impl Iterator<Item = (FeatureInput, f64)>,
    ) -> Dataset {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for (input, target) in labeled {
            rows.push(schema.encode(&self.codec, &input));
            targets.push(target);
        }
        tracing::info!(
            predictor = %predictor,
            rows = rows.len(),
            columns = schema.len(),
            "prepared dataset"
        );
        Dataset {
            predictor,
            schema,
            rows,
            targets,
        }
    }

    pub fn mastery(&self) -> Dataset {
        let labels: HashMap<(&str, &str, &str), f64> = self
            .snapshot
            .mastery_labels
            .iter()
            .filter_map(|label| {
                let score = label.final_mastery_score.filter(|v| v.is_finite())?;
                Some((
                    (
                        label.student_id.as_str(),
                        label.subject.as_str(),
                        label.topic.as_str(),
                    ),
                    score,
                ))
            })
            .collect();

        let labeled = self.snapshot.quiz_attempts.iter().filter_map(|attempt| {
            let target = *labels.get(&(
                attempt.student_id.as_str(),
                attempt.subject.as_str(),
                attempt.topic.as_str(),
            ))?;

            let mut input = self.profile_input(&attempt.student_id);
            input.insert_opt("quiz_score", attempt.quiz_score);
            input.insert_opt("time_taken_seconds", attempt.time_taken_seconds);
            input.insert_opt("number_of_attempts", attempt.number_of_attempts);
            input.insert_opt("previous_mastery_score", attempt.previous_mastery_score);
            input.insert_category("subject", &attempt.subject);
            input.insert_category("topic", &attempt.topic);
            input.insert_category("difficulty_level", &attempt.difficulty_level);
            Some((input, target))
        });

        self.dataset(PredictorKind::Mastery, mastery_schema(), labeled)
    }

    pub fn engagement(&self) -> Dataset {
        let labeled = self.snapshot.project_activities.iter().map(|activity| {
            let target = activity
                .engagement_index
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 100.0))
                .unwrap_or_else(|| {
                    synthetic_engagement_index(
                        activity.tasks_completed.unwrap_or(0.0),
                        activity.peer_review_score.unwrap_or(0.0),
                        activity.communication_score.unwrap_or(0.0),
                        activity.collaboration_score.unwrap_or(0.0),
                    )
                });

            let mut input = self.profile_input(&activity.student_id);
            input.insert_opt("tasks_completed", activity.tasks_completed);
            input.insert_opt("peer_review_score", activity.peer_review_score);
            input.insert_opt("communication_score", activity.communication_score);
            input.insert_opt("collaboration_score", activity.collaboration_score);
            input.insert_opt("creativity_score", activity.creativity_score);
            input.insert_opt("project_completion_pct", activity.project_completion_pct);
            input.insert_category("role_in_team", &activity.role_in_team);
            (input, target)
        });

        self.dataset(PredictorKind::Engagement, engagement_schema(), labeled)
    }

    pub fn recommendation(&self) -> Dataset {
        let mut mastery: HashMap<&str, (f64, usize)> = HashMap::new();
        for label in &self.snapshot.mastery_labels {
            if let Some(score) = label.final_mastery_score.filter(|v| v.is_finite()) {
                let entry = mastery.entry(label.student_id.as_str()).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }

        // (peer score sum, peer score count, task total)
        let mut projects: HashMap<&str, (f64, usize, f64)> = HashMap::new();
        for activity in &self.snapshot.project_activities {
            let entry = projects
                .entry(activity.student_id.as_str())
                .or_insert((0.0, 0, 0.0));
            if let Some(score) = activity.peer_review_score.filter(|v| v.is_finite()) {
                entry.0 += score;
                entry.1 += 1;
            }
            entry.2 += activity.tasks_completed.filter(|v| v.is_finite()).unwrap_or(0.0);
        }

        let with_project_stats = !self.snapshot.project_activities.is_empty();
        let labeled = self.snapshot.students.iter().map(|student| {
            let avg_mastery = mastery
                .get(student.student_id.as_str())
                .map(|(sum, count)| sum / *count as f64);
            let target = DifficultyLevel::from_mastery(avg_mastery.unwrap_or(DEFAULT_BUCKET_MASTERY));

            let mut input = FeatureInput::new();
            insert_profile_features(&mut input, student);
            input.insert_opt("avg_mastery_score", avg_mastery);
            if let Some((peer_sum, peer_count, tasks)) = projects.get(student.student_id.as_str()) {
                if *peer_count > 0 {
                    input.insert("avg_peer_score", peer_sum / *peer_count as f64);
                }
                input.insert("total_tasks", *tasks);
            }
            (input, target.index() as f64)
        });

        self.dataset(
            PredictorKind::Recommendation,
            recommendation_schema(with_project_stats),
            labeled,
        )
    }

    pub fn build_all(self) -> Datasets {
        let mastery = self.mastery();
        let engagement = self.engagement();
        let recommendation = self.recommendation();
        Datasets {
            codec: self.codec,
            mastery,
            engagement,
            recommendation,
        }
    }
}
