//! Read-only access to the aggregate rows the dashboards are built from.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::StoreError;
use crate::models::{
    EngagementSummary, MonthlyMastery, ProjectStats, QuizResult, StudentProfile, StudentRiskRow,
    SubjectMastery, TopicMastery,
};

/// Which students an aggregate covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Student(String),
}

impl Scope {
    pub fn student_id(&self) -> Option<&str> {
        match self {
            Scope::All => None,
            Scope::Student(id) => Some(id),
        }
    }
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Mean final mastery, `None` when there are no mastery rows.
    async fn mean_mastery(&self, scope: &Scope) -> Result<Option<f64>, StoreError>;

    /// Mean engagement score of sessions at or after `since`.
    async fn mean_engagement(
        &self,
        scope: &Scope,
        since: NaiveDateTime,
    ) -> Result<Option<f64>, StoreError>;

    /// Distinct calendar days with an engagement session at or after `since`.
    async fn recent_activity_dates(
        &self,
        student_id: &str,
        since: NaiveDateTime,
    ) -> Result<Vec<NaiveDate>, StoreError>;

    async fn project_stats(&self, student_id: &str) -> Result<ProjectStats, StoreError>;

    /// Per-topic mastery within `scope`, weakest first.
    async fn topic_mastery_breakdown(
        &self,
        scope: &Scope,
        limit: i64,
    ) -> Result<Vec<TopicMastery>, StoreError>;

    /// Per-subject mastery, strongest first.
    async fn subject_mastery(&self, scope: &Scope) -> Result<Vec<SubjectMastery>, StoreError>;

    async fn student_count(&self) -> Result<i64, StoreError>;

    /// Students with at least one engagement session at or after `since`.
    async fn active_student_count(&self, since: NaiveDateTime) -> Result<i64, StoreError>;

    /// One mean engagement score per student with sessions at or after `since`.
    async fn student_engagement_means(&self, since: NaiveDateTime) -> Result<Vec<f64>, StoreError>;

    /// Per-student mastery and windowed engagement, missing values as 0.
    async fn student_risk_rows(
        &self,
        since: NaiveDateTime,
    ) -> Result<Vec<StudentRiskRow>, StoreError>;

    /// Last login of every teacher account, `None` if they never logged in.
    async fn teacher_activity(&self) -> Result<Vec<Option<NaiveDateTime>>, StoreError>;

    async fn student_profile(&self, student_id: &str)
        -> Result<Option<StudentProfile>, StoreError>;

    /// Most recent quiz attempts across the cohort, newest first.
    async fn recent_quizzes(&self, limit: i64) -> Result<Vec<QuizResult>, StoreError>;

    /// Monthly mean mastery of rows updated at or after `since`, oldest first.
    async fn mastery_trend(&self, since: NaiveDateTime) -> Result<Vec<MonthlyMastery>, StoreError>;

    async fn engagement_summary(
        &self,
        student_id: &str,
        since: NaiveDateTime,
    ) -> Result<EngagementSummary, StoreError>;
}
