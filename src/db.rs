use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::error::StoreError;
use crate::models::{
    EngagementSummary, MonthlyMastery, ProjectStats, QuizResult, StudentProfile, StudentRiskRow,
    SubjectMastery, TopicMastery,
};
use crate::store::{AnalyticsStore, Scope};

/// [`AnalyticsStore`] over the `learning_insights` Postgres schema.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

/// Appends a student filter when `scope` names one; the caller binds it
/// as the next parameter.
fn push_scope(query: &mut String, scope: &Scope, column: &str, param: usize) {
    if scope.student_id().is_some() {
        query.push_str(&format!(" AND {column} = ${param}"));
    }
}

fn topic_breakdown_query(scope: &Scope) -> String {
    let mut query = String::from(
        "SELECT topic, COALESCE(AVG(final_mastery_score), 0)::float8 AS avg_mastery, \
         COUNT(DISTINCT student_id)::bigint AS student_count \
         FROM learning_insights.mastery_scores WHERE TRUE",
    );
    push_scope(&mut query, scope, "student_id", 1);
    let limit_param = if scope.student_id().is_some() { 2 } else { 1 };
    query.push_str(&format!(" GROUP BY topic ORDER BY avg_mastery ASC LIMIT ${limit_param}"));
    query
}

#[async_trait]
impl AnalyticsStore for PgStore {
    async fn mean_mastery(&self, scope: &Scope) -> Result<Option<f64>, StoreError> {
        let mut query = String::from(
            "SELECT AVG(final_mastery_score)::float8 AS avg_mastery \
             FROM learning_insights.mastery_scores WHERE TRUE",
        );
        push_scope(&mut query, scope, "student_id", 1);

        let mut rows = sqlx::query(&query);
        if let Some(student_id) = scope.student_id() {
            rows = rows.bind(student_id);
        }
        let row = rows.fetch_one(&self.pool).await?;
        Ok(row.get("avg_mastery"))
    }

    async fn mean_engagement(
        &self,
        scope: &Scope,
        since: NaiveDateTime,
    ) -> Result<Option<f64>, StoreError> {
        let mut query = String::from(
            "SELECT AVG(engagement_score)::float8 AS avg_engagement \
             FROM learning_insights.engagement_logs WHERE timestamp >= $1",
        );
        push_scope(&mut query, scope, "student_id", 2);

        let mut rows = sqlx::query(&query).bind(since);
        if let Some(student_id) = scope.student_id() {
            rows = rows.bind(student_id);
        }
        let row = rows.fetch_one(&self.pool).await?;
        Ok(row.get("avg_engagement"))
    }

    async fn recent_activity_dates(
        &self,
        student_id: &str,
        since: NaiveDateTime,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let records = sqlx::query(
            r#"
            SELECT DISTINCT timestamp::date AS day
            FROM learning_insights.engagement_logs
            WHERE student_id = $1 AND timestamp >= $2
            ORDER BY day DESC
            "#,
        )
        .bind(student_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.iter().map(|row| row.get("day")).collect())
    }

    async fn project_stats(&self, student_id: &str) -> Result<ProjectStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(DISTINCT project_id)::bigint AS project_count,
                COALESCE(SUM(tasks_completed), 0)::float8 AS total_tasks,
                COALESCE(AVG(peer_review_score), 0)::float8 AS avg_peer_score,
                COALESCE(AVG(communication_score), 0)::float8 AS avg_communication,
                COALESCE(AVG(collaboration_score), 0)::float8 AS avg_collaboration,
                COALESCE(AVG(creativity_score), 0)::float8 AS avg_creativity,
                COALESCE(AVG(project_completion_pct), 0)::float8 AS avg_completion_pct
            FROM learning_insights.project_activity
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProjectStats {
            project_count: row.get("project_count"),
            total_tasks: row.get("total_tasks"),
            avg_peer_score: row.get("avg_peer_score"),
            avg_communication: row.get("avg_communication"),
            avg_collaboration: row.get("avg_collaboration"),
            avg_creativity: row.get("avg_creativity"),
            avg_completion_pct: row.get("avg_completion_pct"),
        })
    }

    async fn topic_mastery_breakdown(
        &self,
        scope: &Scope,
        limit: i64,
    ) -> Result<Vec<TopicMastery>, StoreError> {
        let query = topic_breakdown_query(scope);
        let mut rows = sqlx::query(&query);
        if let Some(student_id) = scope.student_id() {
            rows = rows.bind(student_id);
        }
        let records = rows.bind(limit).fetch_all(&self.pool).await?;

        let mut topics = Vec::new();
        for row in records {
            topics.push(TopicMastery {
                topic: row.get("topic"),
                avg_mastery: row.get("avg_mastery"),
                student_count: row.get("student_count"),
            });
        }
        Ok(topics)
    }

    async fn subject_mastery(&self, scope: &Scope) -> Result<Vec<SubjectMastery>, StoreError> {
        let mut query = String::from(
            "SELECT subject, COALESCE(AVG(final_mastery_score), 0)::float8 AS avg_mastery, \
             COUNT(DISTINCT student_id)::bigint AS student_count \
             FROM learning_insights.mastery_scores WHERE TRUE",
        );
        push_scope(&mut query, scope, "student_id", 1);
        query.push_str(" GROUP BY subject ORDER BY avg_mastery DESC");

        let mut rows = sqlx::query(&query);
        if let Some(student_id) = scope.student_id() {
            rows = rows.bind(student_id);
        }
        let records = rows.fetch_all(&self.pool).await?;

        let mut subjects = Vec::new();
        for row in records {
            subjects.push(SubjectMastery {
                subject: row.get("subject"),
                avg_mastery: row.get("avg_mastery"),
                student_count: row.get("student_count"),
            });
        }
        Ok(subjects)
    }

    async fn student_count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*)::bigint AS total FROM learning_insights.students")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }

    async fn active_student_count(&self, since: NaiveDateTime) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(DISTINCT student_id)::bigint AS active
            FROM learning_insights.engagement_logs
            WHERE timestamp >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("active"))
    }

    async fn student_engagement_means(&self, since: NaiveDateTime) -> Result<Vec<f64>, StoreError> {
        let records = sqlx::query(
            r#"
            SELECT AVG(engagement_score)::float8 AS avg_engagement
            FROM learning_insights.engagement_logs
            WHERE timestamp >= $1
            GROUP BY student_id
            HAVING AVG(engagement_score) IS NOT NULL
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.iter().map(|row| row.get("avg_engagement")).collect())
    }

    async fn student_risk_rows(
        &self,
        since: NaiveDateTime,
    ) -> Result<Vec<StudentRiskRow>, StoreError> {
        // Aggregate each side separately so mastery rows don't multiply
        // engagement rows in the average.
        let records = sqlx::query(
            r#"
            SELECT s.student_id, s.student_name, s.grade::text AS grade, s.section,
                   COALESCE(m.avg_mastery, 0)::float8 AS avg_mastery,
                   COALESCE(e.avg_engagement, 0)::float8 AS avg_engagement
            FROM learning_insights.students s
            LEFT JOIN (
                SELECT student_id, AVG(final_mastery_score) AS avg_mastery
                FROM learning_insights.mastery_scores
                GROUP BY student_id
            ) m ON m.student_id = s.student_id
            LEFT JOIN (
                SELECT student_id, AVG(engagement_score) AS avg_engagement
                FROM learning_insights.engagement_logs
                WHERE timestamp >= $1
                GROUP BY student_id
            ) e ON e.student_id = s.student_id
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut rows = Vec::new();
        for row in records {
            rows.push(StudentRiskRow {
                student_id: row.get("student_id"),
                student_name: row.get("student_name"),
                grade: row.get("grade"),
                section: row.get("section"),
                avg_mastery: row.get("avg_mastery"),
                avg_engagement: row.get("avg_engagement"),
            });
        }
        Ok(rows)
    }

    async fn teacher_activity(&self) -> Result<Vec<Option<NaiveDateTime>>, StoreError> {
        let records = sqlx::query(
            "SELECT last_login FROM learning_insights.users WHERE role = 'teacher'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.iter().map(|row| row.get("last_login")).collect())
    }

    async fn student_profile(
        &self,
        student_id: &str,
    ) -> Result<Option<StudentProfile>, StoreError> {
        let record = sqlx::query(
            r#"
            SELECT student_id, student_name, grade::text AS grade, section,
                   baseline_proficiency::float8 AS baseline_proficiency,
                   learning_pace, preferred_learning_style
            FROM learning_insights.students
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|row| StudentProfile {
            student_id: row.get("student_id"),
            student_name: row.get("student_name"),
            grade: row.get("grade"),
            section: row.get("section"),
            baseline_proficiency: row.get("baseline_proficiency"),
            learning_pace: row.get("learning_pace"),
            preferred_learning_style: row.get("preferred_learning_style"),
        }))
    }

    async fn recent_quizzes(&self, limit: i64) -> Result<Vec<QuizResult>, StoreError> {
        let records = sqlx::query(
            r#"
            SELECT s.student_name, q.subject, q.topic,
                   COALESCE(q.quiz_score, 0)::float8 AS quiz_score,
                   q.timestamp::date AS taken_on
            FROM learning_insights.quiz_attempts q
            JOIN learning_insights.students s ON s.student_id = q.student_id
            ORDER BY q.timestamp DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut quizzes = Vec::new();
        for row in records {
            quizzes.push(QuizResult {
                student_name: row.get("student_name"),
                subject: row.get("subject"),
                topic: row.get("topic"),
                quiz_score: row.get("quiz_score"),
                taken_on: row.get("taken_on"),
            });
        }
        Ok(quizzes)
    }

    async fn mastery_trend(&self, since: NaiveDateTime) -> Result<Vec<MonthlyMastery>, StoreError> {
        let records = sqlx::query(
            r#"
            SELECT to_char(updated_at, 'YYYY-MM') AS month,
                   AVG(final_mastery_score)::float8 AS avg_mastery
            FROM learning_insights.mastery_scores
            WHERE updated_at >= $1
            GROUP BY month
            ORDER BY month ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut trend = Vec::new();
        for row in records {
            trend.push(MonthlyMastery {
                month: row.get("month"),
                avg_mastery: row.get("avg_mastery"),
            });
        }
        Ok(trend)
    }

    async fn engagement_summary(
        &self,
        student_id: &str,
        since: NaiveDateTime,
    ) -> Result<EngagementSummary, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*)::bigint AS session_count,
                   COALESCE(SUM(duration_seconds), 0)::float8 AS total_seconds,
                   AVG(engagement_score)::float8 AS avg_score
            FROM learning_insights.engagement_logs
            WHERE student_id = $1 AND timestamp >= $2
            "#,
        )
        .bind(student_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(EngagementSummary {
            session_count: row.get("session_count"),
            total_seconds: row.get("total_seconds"),
            avg_score: row.get("avg_score"),
        })
    }
}
