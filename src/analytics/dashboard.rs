//! Dashboard response objects.
//!
//! Each dashboard has a pure `build_*` function over already-fetched rows and
//! an async `fetch_*` wrapper that pulls those rows from an [`AnalyticsStore`].

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::analytics::alerts::{self, Alert, Insight};
use crate::analytics::confidence::{institutional_confidence, ConfidenceFactors, ConfidenceScore};
use crate::analytics::engagement::{engagement_distribution, EngagementDistribution, EngagementLevel};
use crate::analytics::risk::{self, AtRiskStudent, AT_RISK_LIMIT, ENGAGEMENT_WINDOW_DAYS};
use crate::analytics::streak::current_streak;
use crate::codec::FeatureInput;
use crate::dataset::insert_profile_features;
use crate::error::StoreError;
use crate::models::{
    EngagementSummary, MasteryLevel, MonthlyMastery, ProjectStats, QuizResult, StudentProfile,
    StudentRiskRow, SubjectMastery, TopicMastery,
};
use crate::predictor::{InsightSource, StudentInsights};
use crate::store::{AnalyticsStore, Scope};

pub const TOPIC_LIMIT: i64 = 10;
pub const RECENT_QUIZ_LIMIT: i64 = 10;
pub const ACTIVE_WINDOW_DAYS: i64 = 7;
pub const TREND_WINDOW_DAYS: i64 = 150;
pub const STREAK_LOOKBACK_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    High,
    Medium,
    Low,
}

impl StatusLevel {
    fn banded(value: f64, high: f64, medium: f64) -> Self {
        if value >= high {
            Self::High
        } else if value >= medium {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

pub fn topic_status(avg_mastery: f64) -> StatusLevel {
    StatusLevel::banded(avg_mastery, 75.0, 50.0)
}

pub fn subject_status(avg_mastery: f64) -> StatusLevel {
    StatusLevel::banded(avg_mastery, 75.0, 60.0)
}

/// Usage of a teacher account by how recently it logged in.
pub fn teacher_usage_level(last_login: Option<NaiveDateTime>, now: NaiveDateTime) -> StatusLevel {
    match last_login {
        Some(login) if login >= now - Duration::days(3) => StatusLevel::High,
        Some(login) if login >= now - Duration::days(ACTIVE_WINDOW_DAYS) => StatusLevel::Medium,
        _ => StatusLevel::Low,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Stable,
    Down,
}

pub fn subject_trend(score: f64) -> Trend {
    if score >= 70.0 {
        Trend::Up
    } else if score >= 50.0 {
        Trend::Stable
    } else {
        Trend::Down
    }
}

// Teacher view.

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherKpi {
    pub avg_class_mastery: i64,
    pub engagement_index: i64,
    pub students_at_risk: usize,
    pub total_students: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStatus {
    pub topic: String,
    pub mastery: i64,
    pub student_count: i64,
    pub status: StatusLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherDashboard {
    pub kpi: TeacherKpi,
    pub topic_mastery: Vec<TopicStatus>,
    pub engagement_distribution: EngagementDistribution,
    pub at_risk_students: Vec<AtRiskStudent>,
    pub recent_activity: Vec<QuizResult>,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, Default)]
pub struct TeacherInputs {
    pub total_students: i64,
    pub class_mastery: Option<f64>,
    pub class_engagement: Option<f64>,
    pub risk_rows: Vec<StudentRiskRow>,
    pub topics: Vec<TopicMastery>,
    pub engagement_means: Vec<f64>,
    pub recent_quizzes: Vec<QuizResult>,
}

pub fn build_teacher_dashboard(inputs: TeacherInputs) -> TeacherDashboard {
    let at_risk = risk::at_risk_students(&inputs.risk_rows, AT_RISK_LIMIT);
    let insights = alerts::teacher_insights(&inputs.topics, &at_risk, inputs.class_engagement);
    let cohort_size = usize::try_from(inputs.total_students).unwrap_or(0);

    TeacherDashboard {
        kpi: TeacherKpi {
            avg_class_mastery: inputs.class_mastery.unwrap_or(0.0) as i64,
            engagement_index: inputs.class_engagement.unwrap_or(0.0) as i64,
            students_at_risk: at_risk.len(),
            total_students: inputs.total_students,
        },
        topic_mastery: inputs
            .topics
            .iter()
            .map(|t| TopicStatus {
                topic: t.topic.clone(),
                mastery: t.avg_mastery as i64,
                student_count: t.student_count,
                status: topic_status(t.avg_mastery),
            })
            .collect(),
        engagement_distribution: engagement_distribution(&inputs.engagement_means, cohort_size),
        at_risk_students: at_risk,
        recent_activity: inputs.recent_quizzes,
        insights,
    }
}

pub async fn fetch_teacher_dashboard<S: AnalyticsStore + ?Sized>(
    store: &S,
    now: NaiveDateTime,
) -> Result<TeacherDashboard, StoreError> {
    let since = risk::window_start(now, ENGAGEMENT_WINDOW_DAYS);
    let (
        total_students,
        class_mastery,
        class_engagement,
        risk_rows,
        topics,
        engagement_means,
        recent_quizzes,
    ) = tokio::try_join!(
        store.student_count(),
        store.mean_mastery(&Scope::All),
        store.mean_engagement(&Scope::All, since),
        store.student_risk_rows(since),
        store.topic_mastery_breakdown(&Scope::All, TOPIC_LIMIT),
        store.student_engagement_means(since),
        store.recent_quizzes(RECENT_QUIZ_LIMIT),
    )?;

    let dashboard = build_teacher_dashboard(TeacherInputs {
        total_students,
        class_mastery,
        class_engagement,
        risk_rows,
        topics,
        engagement_means,
        recent_quizzes,
    });
    tracing::info!(
        students = dashboard.kpi.total_students,
        at_risk = dashboard.kpi.students_at_risk,
        "built teacher dashboard"
    );
    Ok(dashboard)
}

// Admin view.

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminKpi {
    pub overall_mastery: i64,
    pub avg_engagement: i64,
    pub teacher_adoption: i64,
    pub active_students: i64,
    pub total_students: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStatus {
    pub subject: String,
    pub mastery: i64,
    pub student_count: i64,
    pub status: StatusLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeacherUsage {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminDashboard {
    pub kpi: AdminKpi,
    pub mastery_trend: Vec<TrendPoint>,
    pub subject_performance: Vec<SubjectStatus>,
    pub engagement_distribution: EngagementDistribution,
    pub teacher_usage: TeacherUsage,
    pub confidence_score: ConfidenceScore,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Default)]
pub struct AdminInputs {
    pub total_students: i64,
    pub active_students: i64,
    pub overall_mastery: Option<f64>,
    pub overall_engagement: Option<f64>,
    pub teacher_logins: Vec<Option<NaiveDateTime>>,
    pub subjects: Vec<SubjectMastery>,
    pub engagement_means: Vec<f64>,
    pub mastery_trend: Vec<MonthlyMastery>,
}

pub fn build_admin_dashboard(inputs: AdminInputs, now: NaiveDateTime) -> AdminDashboard {
    let mut usage = TeacherUsage {
        total: inputs.teacher_logins.len(),
        ..TeacherUsage::default()
    };
    for login in &inputs.teacher_logins {
        match teacher_usage_level(*login, now) {
            StatusLevel::High => usage.high += 1,
            StatusLevel::Medium => usage.medium += 1,
            StatusLevel::Low => usage.low += 1,
        }
    }
    // A teacher is active when they logged in within the last week.
    let active_teachers = (usage.high + usage.medium) as i64;
    let total_teachers = usage.total as i64;

    let factors = ConfidenceFactors::from_aggregates(
        inputs.overall_mastery,
        inputs.overall_engagement,
        active_teachers,
        total_teachers,
        inputs.active_students,
        inputs.total_students,
    );
    let alerts = alerts::system_alerts(
        &inputs.subjects,
        total_teachers - active_teachers,
        inputs.overall_engagement,
    );
    let cohort_size = usize::try_from(inputs.total_students).unwrap_or(0);

    AdminDashboard {
        kpi: AdminKpi {
            overall_mastery: inputs.overall_mastery.unwrap_or(0.0) as i64,
            avg_engagement: inputs.overall_engagement.unwrap_or(0.0) as i64,
            teacher_adoption: (factors.teacher_adoption * 100.0) as i64,
            active_students: inputs.active_students,
            total_students: inputs.total_students,
        },
        mastery_trend: inputs
            .mastery_trend
            .iter()
            .map(|point| TrendPoint {
                month: point.month.clone(),
                value: point.avg_mastery as i64,
            })
            .collect(),
        subject_performance: inputs
            .subjects
            .iter()
            .map(|s| SubjectStatus {
                subject: s.subject.clone(),
                mastery: s.avg_mastery as i64,
                student_count: s.student_count,
                status: subject_status(s.avg_mastery),
            })
            .collect(),
        engagement_distribution: engagement_distribution(&inputs.engagement_means, cohort_size),
        teacher_usage: usage,
        confidence_score: institutional_confidence(factors),
        alerts,
    }
}

pub async fn fetch_admin_dashboard<S: AnalyticsStore + ?Sized>(
    store: &S,
    now: NaiveDateTime,
) -> Result<AdminDashboard, StoreError> {
    let engagement_since = risk::window_start(now, ENGAGEMENT_WINDOW_DAYS);
    let active_since = risk::window_start(now, ACTIVE_WINDOW_DAYS);
    let trend_since = risk::window_start(now, TREND_WINDOW_DAYS);

    let (total_students, active_students, overall_mastery, overall_engagement) = tokio::try_join!(
        store.student_count(),
        store.active_student_count(active_since),
        store.mean_mastery(&Scope::All),
        store.mean_engagement(&Scope::All, engagement_since),
    )?;
    let (teacher_logins, subjects, engagement_means, mastery_trend) = tokio::try_join!(
        store.teacher_activity(),
        store.subject_mastery(&Scope::All),
        store.student_engagement_means(engagement_since),
        store.mastery_trend(trend_since),
    )?;

    let dashboard = build_admin_dashboard(
        AdminInputs {
            total_students,
            active_students,
            overall_mastery,
            overall_engagement,
            teacher_logins,
            subjects,
            engagement_means,
            mastery_trend,
        },
        now,
    );
    tracing::info!(
        confidence = dashboard.confidence_score.score,
        alerts = dashboard.alerts.len(),
        "built admin dashboard"
    );
    Ok(dashboard)
}

// Student view.

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectProgress {
    pub subject: String,
    pub score: i64,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentMastery {
    pub overall: i64,
    pub level: MasteryLevel,
    pub by_subject: Vec<SubjectProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentEngagement {
    pub streak_days: u32,
    pub session_count: i64,
    pub total_hours: f64,
    pub score: i64,
    pub level: EngagementLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAnalytics {
    pub profile: StudentProfile,
    pub mastery: StudentMastery,
    pub engagement: StudentEngagement,
    pub projects: ProjectStats,
    pub predictions: StudentInsights,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone)]
pub struct StudentInputs {
    pub profile: StudentProfile,
    pub overall_mastery: Option<f64>,
    pub subjects: Vec<SubjectMastery>,
    pub activity_dates: Vec<chrono::NaiveDate>,
    pub engagement: EngagementSummary,
    pub projects: ProjectStats,
}

/// Feature input for the per-student predictors from profile and aggregates.
pub fn prediction_input(inputs: &StudentInputs) -> FeatureInput {
    let mut input = FeatureInput::new();
    insert_profile_features(&mut input, &inputs.profile);
    input.insert_opt("avg_mastery_score", inputs.overall_mastery);
    let projects = &inputs.projects;
    if projects.project_count > 0 {
        input.insert("tasks_completed", projects.total_tasks);
        input.insert("total_tasks", projects.total_tasks);
        input.insert("peer_review_score", projects.avg_peer_score);
        input.insert("avg_peer_score", projects.avg_peer_score);
        input.insert("communication_score", projects.avg_communication);
        input.insert("collaboration_score", projects.avg_collaboration);
        input.insert("creativity_score", projects.avg_creativity);
        input.insert("project_completion_pct", projects.avg_completion_pct);
    }
    input
}

pub fn build_student_analytics(
    inputs: StudentInputs,
    today: chrono::NaiveDate,
    source: &dyn InsightSource,
) -> StudentAnalytics {
    let overall = inputs.overall_mastery.unwrap_or(0.0);
    let engagement_score = inputs.engagement.avg_score.unwrap_or(0.0);
    let streak_days = current_streak(&inputs.activity_dates, today);
    let predictions = source.student_insights(&prediction_input(&inputs));
    let insights = alerts::student_insights(
        &inputs.profile.preferred_learning_style,
        &inputs.subjects,
        streak_days,
    );

    StudentAnalytics {
        mastery: StudentMastery {
            overall: overall as i64,
            level: MasteryLevel::from_score(overall),
            by_subject: inputs
                .subjects
                .iter()
                .map(|s| SubjectProgress {
                    subject: s.subject.clone(),
                    score: s.avg_mastery as i64,
                    trend: subject_trend(s.avg_mastery),
                })
                .collect(),
        },
        engagement: StudentEngagement {
            streak_days,
            session_count: inputs.engagement.session_count,
            total_hours: crate::metrics::round_to(inputs.engagement.total_seconds / 3600.0, 1),
            score: engagement_score as i64,
            level: EngagementLevel::from_score(engagement_score),
        },
        profile: inputs.profile,
        projects: inputs.projects,
        predictions,
        insights,
    }
}

/// `Ok(None)` when the student does not exist.
pub async fn fetch_student_analytics<S: AnalyticsStore + ?Sized>(
    store: &S,
    student_id: &str,
    now: NaiveDateTime,
    source: &dyn InsightSource,
) -> Result<Option<StudentAnalytics>, StoreError> {
    let Some(profile) = store.student_profile(student_id).await? else {
        tracing::warn!(student_id, "student not found");
        return Ok(None);
    };
    let scope = Scope::Student(student_id.to_string());
    let (overall_mastery, subjects, activity_dates, engagement, projects) = tokio::try_join!(
        store.mean_mastery(&scope),
        store.subject_mastery(&scope),
        store.recent_activity_dates(student_id, risk::window_start(now, STREAK_LOOKBACK_DAYS)),
        store.engagement_summary(student_id, risk::window_start(now, ENGAGEMENT_WINDOW_DAYS)),
        store.project_stats(student_id),
    )?;

    Ok(Some(build_student_analytics(
        StudentInputs {
            profile,
            overall_mastery,
            subjects,
            activity_dates,
            engagement,
            projects,
        },
        now.date(),
        source,
    )))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::analytics::alerts::AlertKind;
    use crate::analytics::confidence::ConfidenceBand;
    use crate::analytics::risk::RiskSeverity;
    use crate::models::DifficultyLevel;
    use crate::predictor::HeuristicEstimator;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn days_ago(days: i64) -> NaiveDateTime {
        now() - Duration::days(days)
    }

    struct Session {
        student_id: &'static str,
        at: NaiveDateTime,
        score: f64,
        seconds: f64,
    }

    /// Mastery rows are (student, subject, topic, score).
    #[derive(Default)]
    struct MemoryStore {
        students: Vec<StudentProfile>,
        mastery: Vec<(&'static str, &'static str, &'static str, f64)>,
        sessions: Vec<Session>,
        teacher_logins: Vec<Option<NaiveDateTime>>,
        quizzes: Vec<QuizResult>,
        trend: Vec<MonthlyMastery>,
        projects: HashMap<&'static str, ProjectStats>,
    }

    fn mean(values: &[f64]) -> Option<f64> {
        (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
    }

    impl MemoryStore {
        fn mastery_scores(&self, scope: &Scope) -> Vec<f64> {
            self.mastery
                .iter()
                .filter(|row| scope.student_id().map_or(true, |id| id == row.0))
                .map(|row| row.3)
                .collect()
        }

        fn session_scores(&self, student: Option<&str>, since: NaiveDateTime) -> Vec<f64> {
            self.sessions
                .iter()
                .filter(|s| s.at >= since && student.map_or(true, |id| id == s.student_id))
                .map(|s| s.score)
                .collect()
        }
    }

    #[async_trait]
    impl AnalyticsStore for MemoryStore {
        async fn mean_mastery(&self, scope: &Scope) -> Result<Option<f64>, StoreError> {
            Ok(mean(&self.mastery_scores(scope)))
        }

        async fn mean_engagement(
            &self,
            scope: &Scope,
            since: NaiveDateTime,
        ) -> Result<Option<f64>, StoreError> {
            Ok(mean(&self.session_scores(scope.student_id(), since)))
        }

        async fn recent_activity_dates(
            &self,
            student_id: &str,
            since: NaiveDateTime,
        ) -> Result<Vec<NaiveDate>, StoreError> {
            Ok(self
                .sessions
                .iter()
                .filter(|s| s.student_id == student_id && s.at >= since)
                .map(|s| s.at.date())
                .collect())
        }

        async fn project_stats(&self, student_id: &str) -> Result<ProjectStats, StoreError> {
            Ok(self.projects.get(student_id).cloned().unwrap_or_default())
        }

        async fn topic_mastery_breakdown(
            &self,
            scope: &Scope,
            limit: i64,
        ) -> Result<Vec<TopicMastery>, StoreError> {
            let mut by_topic: HashMap<&str, Vec<f64>> = HashMap::new();
            for row in &self.mastery {
                if scope.student_id().map_or(true, |id| id == row.0) {
                    by_topic.entry(row.2).or_default().push(row.3);
                }
            }
            let mut topics: Vec<TopicMastery> = by_topic
                .into_iter()
                .map(|(topic, scores)| TopicMastery {
                    topic: topic.to_string(),
                    avg_mastery: mean(&scores).unwrap_or(0.0),
                    student_count: scores.len() as i64,
                })
                .collect();
            topics.sort_by(|a, b| a.avg_mastery.total_cmp(&b.avg_mastery));
            topics.truncate(limit as usize);
            Ok(topics)
        }

        async fn subject_mastery(&self, scope: &Scope) -> Result<Vec<SubjectMastery>, StoreError> {
            let mut by_subject: HashMap<&str, Vec<f64>> = HashMap::new();
            for row in &self.mastery {
                if scope.student_id().map_or(true, |id| id == row.0) {
                    by_subject.entry(row.1).or_default().push(row.3);
                }
            }
            let mut subjects: Vec<SubjectMastery> = by_subject
                .into_iter()
                .map(|(subject, scores)| SubjectMastery {
                    subject: subject.to_string(),
                    avg_mastery: mean(&scores).unwrap_or(0.0),
                    student_count: scores.len() as i64,
                })
                .collect();
            subjects.sort_by(|a, b| b.avg_mastery.total_cmp(&a.avg_mastery));
            Ok(subjects)
        }

        async fn student_count(&self) -> Result<i64, StoreError> {
            Ok(self.students.len() as i64)
        }

        async fn active_student_count(&self, since: NaiveDateTime) -> Result<i64, StoreError> {
            Ok(self
                .students
                .iter()
                .filter(|p| !self.session_scores(Some(p.student_id.as_str()), since).is_empty())
                .count() as i64)
        }

        async fn student_engagement_means(
            &self,
            since: NaiveDateTime,
        ) -> Result<Vec<f64>, StoreError> {
            Ok(self
                .students
                .iter()
                .filter_map(|p| mean(&self.session_scores(Some(p.student_id.as_str()), since)))
                .collect())
        }

        async fn student_risk_rows(
            &self,
            since: NaiveDateTime,
        ) -> Result<Vec<StudentRiskRow>, StoreError> {
            Ok(self
                .students
                .iter()
                .map(|p| {
                    let scope = Scope::Student(p.student_id.clone());
                    StudentRiskRow {
                        student_id: p.student_id.clone(),
                        student_name: p.student_name.clone(),
                        grade: p.grade.clone(),
                        section: p.section.clone(),
                        avg_mastery: mean(&self.mastery_scores(&scope)).unwrap_or(0.0),
                        avg_engagement: mean(&self.session_scores(Some(p.student_id.as_str()), since))
                            .unwrap_or(0.0),
                    }
                })
                .collect())
        }

        async fn teacher_activity(&self) -> Result<Vec<Option<NaiveDateTime>>, StoreError> {
            Ok(self.teacher_logins.clone())
        }

        async fn student_profile(
            &self,
            student_id: &str,
        ) -> Result<Option<StudentProfile>, StoreError> {
            Ok(self
                .students
                .iter()
                .find(|p| p.student_id == student_id)
                .cloned())
        }

        async fn recent_quizzes(&self, limit: i64) -> Result<Vec<QuizResult>, StoreError> {
            Ok(self.quizzes.iter().take(limit as usize).cloned().collect())
        }

        async fn mastery_trend(
            &self,
            _since: NaiveDateTime,
        ) -> Result<Vec<MonthlyMastery>, StoreError> {
            Ok(self.trend.clone())
        }

        async fn engagement_summary(
            &self,
            student_id: &str,
            since: NaiveDateTime,
        ) -> Result<EngagementSummary, StoreError> {
            let sessions: Vec<&Session> = self
                .sessions
                .iter()
                .filter(|s| s.student_id == student_id && s.at >= since)
                .collect();
            let scores: Vec<f64> = sessions.iter().map(|s| s.score).collect();
            Ok(EngagementSummary {
                session_count: sessions.len() as i64,
                total_seconds: sessions.iter().map(|s| s.seconds).sum(),
                avg_score: mean(&scores),
            })
        }
    }

    fn profile(id: &str, name: &str, style: &str) -> StudentProfile {
        StudentProfile {
            student_id: id.to_string(),
            student_name: name.to_string(),
            grade: "10".to_string(),
            section: "A".to_string(),
            baseline_proficiency: Some(70.0),
            learning_pace: "medium".to_string(),
            preferred_learning_style: style.to_string(),
        }
    }

    fn session(student_id: &'static str, days: i64, score: f64) -> Session {
        Session {
            student_id,
            at: days_ago(days),
            score,
            seconds: 1800.0,
        }
    }

    fn cohort() -> MemoryStore {
        let mut projects = HashMap::new();
        projects.insert(
            "s1",
            ProjectStats {
                project_count: 2,
                total_tasks: 14.0,
                avg_peer_score: 4.2,
                avg_communication: 4.0,
                avg_collaboration: 4.5,
                avg_creativity: 3.8,
                avg_completion_pct: 92.0,
            },
        );
        MemoryStore {
            students: vec![
                profile("s1", "Avery Lee", "visual"),
                profile("s2", "Jules Moreno", "textual"),
                profile("s3", "Kiara Patel", "mixed"),
            ],
            mastery: vec![
                ("s1", "Math", "Algebra", 88.0),
                ("s1", "Science", "Cells", 82.0),
                ("s2", "Math", "Algebra", 45.0),
                ("s2", "Science", "Cells", 41.0),
                ("s3", "Math", "Fractions", 70.0),
            ],
            sessions: vec![
                session("s1", 0, 90.0),
                session("s1", 1, 85.0),
                session("s1", 2, 80.0),
                session("s2", 3, 40.0),
                session("s2", 45, 95.0),
                session("s3", 10, 55.0),
            ],
            teacher_logins: vec![Some(days_ago(1)), Some(days_ago(5)), Some(days_ago(20)), None],
            quizzes: vec![QuizResult {
                student_name: "Avery Lee".to_string(),
                subject: "Math".to_string(),
                topic: "Algebra".to_string(),
                quiz_score: 91.0,
                taken_on: now().date(),
            }],
            trend: vec![
                MonthlyMastery {
                    month: "2026-02".to_string(),
                    avg_mastery: 61.5,
                },
                MonthlyMastery {
                    month: "2026-03".to_string(),
                    avg_mastery: 66.2,
                },
            ],
            projects,
        }
    }

    #[test]
    fn status_bands() {
        assert_eq!(topic_status(75.0), StatusLevel::High);
        assert_eq!(topic_status(50.0), StatusLevel::Medium);
        assert_eq!(topic_status(49.0), StatusLevel::Low);
        assert_eq!(subject_status(60.0), StatusLevel::Medium);
        assert_eq!(subject_status(59.9), StatusLevel::Low);
        assert_eq!(subject_trend(70.0), Trend::Up);
        assert_eq!(subject_trend(50.0), Trend::Stable);
        assert_eq!(subject_trend(49.0), Trend::Down);
    }

    #[test]
    fn teacher_usage_by_last_login() {
        assert_eq!(teacher_usage_level(Some(days_ago(3)), now()), StatusLevel::High);
        assert_eq!(teacher_usage_level(Some(days_ago(7)), now()), StatusLevel::Medium);
        assert_eq!(teacher_usage_level(Some(days_ago(8)), now()), StatusLevel::Low);
        assert_eq!(teacher_usage_level(None, now()), StatusLevel::Low);
    }

    #[test]
    fn empty_teacher_inputs_build_a_quiet_dashboard() {
        let dashboard = build_teacher_dashboard(TeacherInputs::default());
        assert_eq!(dashboard.kpi.avg_class_mastery, 0);
        assert!(dashboard.at_risk_students.is_empty());
        assert!(dashboard.insights.is_empty());
        assert_eq!(dashboard.engagement_distribution, EngagementDistribution::default());
    }

    #[tokio::test]
    async fn teacher_dashboard_from_store() {
        let store = cohort();
        let dashboard = fetch_teacher_dashboard(&store, now()).await.unwrap();

        assert_eq!(dashboard.kpi.total_students, 3);
        assert_eq!(dashboard.kpi.avg_class_mastery, 65);
        // s2 has mastery 43 and only one in-window session at 40.
        assert_eq!(dashboard.kpi.students_at_risk, 2);
        assert_eq!(dashboard.at_risk_students[0].student_id, "s2");
        assert_eq!(dashboard.at_risk_students[0].priority, RiskSeverity::Critical);
        assert_eq!(dashboard.at_risk_students[1].student_id, "s3");
        assert_eq!(dashboard.at_risk_students[1].priority, RiskSeverity::High);

        assert_eq!(dashboard.topic_mastery[0].topic, "Cells");
        assert_eq!(dashboard.topic_mastery[0].status, StatusLevel::Medium);
        assert_eq!(dashboard.engagement_distribution.high, 33.3);
        assert_eq!(dashboard.engagement_distribution.medium, 33.3);
        assert_eq!(dashboard.engagement_distribution.low, 33.3);
        assert_eq!(dashboard.insights[0].kind, AlertKind::Warning);
        assert_eq!(dashboard.insights[1].kind, AlertKind::Alert);
    }

    #[tokio::test]
    async fn admin_dashboard_from_store() {
        let store = cohort();
        let dashboard = fetch_admin_dashboard(&store, now()).await.unwrap();

        assert_eq!(
            dashboard.teacher_usage,
            TeacherUsage {
                high: 1,
                medium: 1,
                low: 2,
                total: 4
            }
        );
        assert_eq!(dashboard.kpi.teacher_adoption, 50);
        assert_eq!(dashboard.kpi.active_students, 2);
        assert_eq!(dashboard.subject_performance[0].subject, "Math");
        assert_eq!(dashboard.mastery_trend.len(), 2);
        assert_eq!(dashboard.mastery_trend[1].value, 66);

        // Science averages 61.5 and Math 67.67, so neither is below target.
        let kinds: Vec<AlertKind> = dashboard.alerts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::Info]);
        assert_eq!(dashboard.alerts[0].message, "2 teachers pending onboarding completion");

        // 0.652*0.35 + 0.70*0.25 + 0.5*0.25 + (2/3)*0.15 = 0.6282
        assert_eq!(dashboard.confidence_score.score, 63);
        assert_eq!(dashboard.confidence_score.level, ConfidenceBand::Medium);
    }

    #[tokio::test]
    async fn student_analytics_from_store() {
        let store = cohort();
        let analytics = fetch_student_analytics(&store, "s1", now(), &HeuristicEstimator)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(analytics.engagement.streak_days, 3);
        assert_eq!(analytics.engagement.session_count, 3);
        assert_eq!(analytics.engagement.total_hours, 1.5);
        assert_eq!(analytics.engagement.level, EngagementLevel::High);
        assert_eq!(analytics.mastery.overall, 85);
        assert_eq!(analytics.mastery.level, MasteryLevel::Advanced);
        assert!(analytics.mastery.by_subject.iter().all(|s| s.trend == Trend::Up));
        assert!(analytics.predictions.engagement_index.is_some());
        assert!(analytics.predictions.mastery_score.is_none());
        assert_eq!(
            analytics.predictions.task_recommendation.difficulty_level,
            DifficultyLevel::Hard
        );
        assert_eq!(analytics.insights.len(), 3);
        assert_eq!(analytics.insights[1].message, "Focus on Science to boost overall mastery.");
    }

    #[tokio::test]
    async fn unknown_student_is_none() {
        let store = cohort();
        let analytics = fetch_student_analytics(&store, "nobody", now(), &HeuristicEstimator)
            .await
            .unwrap();
        assert!(analytics.is_none());
    }
}
