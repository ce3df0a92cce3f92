use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    pub grade: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub baseline_proficiency: Option<f64>,
    #[serde(default)]
    pub learning_pace: String,
    #[serde(default)]
    pub preferred_learning_style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub student_id: String,
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub difficulty_level: String,
    #[serde(default)]
    pub quiz_score: Option<f64>,
    #[serde(default)]
    pub time_taken_seconds: Option<f64>,
    #[serde(default)]
    pub number_of_attempts: Option<f64>,
    #[serde(default)]
    pub previous_mastery_score: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryLabel {
    pub student_id: String,
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub final_mastery_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectActivity {
    pub student_id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub role_in_team: String,
    #[serde(default)]
    pub tasks_completed: Option<f64>,
    #[serde(default)]
    pub peer_review_score: Option<f64>,
    #[serde(default)]
    pub communication_score: Option<f64>,
    #[serde(default)]
    pub collaboration_score: Option<f64>,
    #[serde(default)]
    pub creativity_score: Option<f64>,
    #[serde(default)]
    pub project_completion_pct: Option<f64>,
    /// Ground-truth engagement label, when the source recorded one.
    #[serde(default)]
    pub engagement_index: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorKind {
    Mastery,
    Engagement,
    Recommendation,
}

impl PredictorKind {
    pub const ALL: [Self; 3] = [Self::Mastery, Self::Engagement, Self::Recommendation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mastery => "mastery",
            Self::Engagement => "engagement",
            Self::Recommendation => "recommendation",
        }
    }

    pub fn artifact_file(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for PredictorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// Bucket a mean mastery score: `<= 50` easy, `<= 75` medium, above that hard.
    pub fn from_mastery(avg_mastery: f64) -> Self {
        if avg_mastery <= 50.0 {
            Self::Easy
        } else if avg_mastery <= 75.0 {
            Self::Medium
        } else {
            Self::Hard
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Easy => 0,
            Self::Medium => 1,
            Self::Hard => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl MasteryLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 80.0 {
            Self::Advanced
        } else if score > 50.0 {
            Self::Intermediate
        } else {
            Self::Beginner
        }
    }
}

// Aggregate rows returned by the analytics store.

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRiskRow {
    pub student_id: String,
    pub student_name: String,
    pub grade: String,
    pub section: String,
    pub avg_mastery: f64,
    pub avg_engagement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicMastery {
    pub topic: String,
    pub avg_mastery: f64,
    pub student_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectMastery {
    pub subject: String,
    pub avg_mastery: f64,
    pub student_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMastery {
    pub month: String,
    pub avg_mastery: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectStats {
    pub project_count: i64,
    pub total_tasks: f64,
    pub avg_peer_score: f64,
    pub avg_communication: f64,
    pub avg_collaboration: f64,
    pub avg_creativity: f64,
    pub avg_completion_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngagementSummary {
    pub session_count: i64,
    pub total_seconds: f64,
    pub avg_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResult {
    pub student_name: String,
    pub subject: String,
    pub topic: String,
    pub quiz_score: f64,
    pub taken_on: NaiveDate,
}
