use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::models::StudentRiskRow;

pub const MASTERY_RISK_THRESHOLD: f64 = 65.0;
pub const ENGAGEMENT_RISK_THRESHOLD: f64 = 60.0;
pub const CRITICAL_MASTERY_THRESHOLD: f64 = 50.0;
pub const AT_RISK_LIMIT: usize = 10;

/// Engagement is averaged over this many trailing days for risk scoring.
pub const ENGAGEMENT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    Critical,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskStudent {
    pub student_id: String,
    pub name: String,
    pub grade: String,
    pub section: String,
    pub mastery: i64,
    pub engagement: i64,
    pub priority: RiskSeverity,
}

/// `None` when the student is not at risk.
pub fn classify_risk(avg_mastery: f64, avg_engagement: f64) -> Option<RiskSeverity> {
    if avg_mastery >= MASTERY_RISK_THRESHOLD && avg_engagement >= ENGAGEMENT_RISK_THRESHOLD {
        return None;
    }
    if avg_mastery < CRITICAL_MASTERY_THRESHOLD {
        Some(RiskSeverity::Critical)
    } else {
        Some(RiskSeverity::High)
    }
}

/// At-risk students, lowest mastery first, at most `limit` of them.
pub fn at_risk_students(rows: &[StudentRiskRow], limit: usize) -> Vec<AtRiskStudent> {
    let mut flagged: Vec<(&StudentRiskRow, RiskSeverity)> = rows
        .iter()
        .filter_map(|row| classify_risk(row.avg_mastery, row.avg_engagement).map(|s| (row, s)))
        .collect();
    flagged.sort_by(|a, b| a.0.avg_mastery.total_cmp(&b.0.avg_mastery));

    flagged
        .into_iter()
        .take(limit)
        .map(|(row, priority)| AtRiskStudent {
            student_id: row.student_id.clone(),
            name: row.student_name.clone(),
            grade: row.grade.clone(),
            section: row.section.clone(),
            mastery: row.avg_mastery as i64,
            engagement: row.avg_engagement as i64,
            priority,
        })
        .collect()
}

/// Start of a trailing window of `days` ending at `now`.
pub fn window_start(now: NaiveDateTime, days: i64) -> NaiveDateTime {
    now - Duration::days(days.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(id: &str, mastery: f64, engagement: f64) -> StudentRiskRow {
        StudentRiskRow {
            student_id: id.to_string(),
            student_name: format!("Student {id}"),
            grade: "10".to_string(),
            section: "A".to_string(),
            avg_mastery: mastery,
            avg_engagement: engagement,
        }
    }

    #[test]
    fn low_mastery_is_critical() {
        assert_eq!(classify_risk(40.0, 80.0), Some(RiskSeverity::Critical));
    }

    #[test]
    fn low_engagement_alone_is_high() {
        assert_eq!(classify_risk(70.0, 40.0), Some(RiskSeverity::High));
    }

    #[test]
    fn healthy_student_is_not_at_risk() {
        assert_eq!(classify_risk(80.0, 80.0), None);
        assert_eq!(classify_risk(65.0, 60.0), None);
    }

    #[test]
    fn moderate_mastery_dip_is_high() {
        assert_eq!(classify_risk(60.0, 90.0), Some(RiskSeverity::High));
    }

    #[test]
    fn at_risk_list_is_sorted_and_limited() {
        let rows = vec![
            row("a", 62.0, 70.0),
            row("b", 90.0, 90.0),
            row("c", 30.5, 20.0),
            row("d", 85.0, 10.0),
        ];
        let flagged = at_risk_students(&rows, 2);
        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged[0].student_id, "c");
        assert_eq!(flagged[0].priority, RiskSeverity::Critical);
        assert_eq!(flagged[0].mastery, 30);
        assert_eq!(flagged[1].student_id, "a");
        assert_eq!(flagged[1].priority, RiskSeverity::High);
    }

    #[test]
    fn window_start_clamps_to_one_day() {
        let now = NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(window_start(now, 0), now - Duration::days(1));
        assert_eq!(window_start(now, 30), now - Duration::days(30));
    }
}
