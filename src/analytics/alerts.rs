use serde::Serialize;

use crate::analytics::risk::AtRiskStudent;
use crate::models::{SubjectMastery, TopicMastery};

pub const SUBJECT_MASTERY_TARGET: f64 = 60.0;
pub const STRONG_ENGAGEMENT: f64 = 70.0;
pub const STREAK_PATTERN_DAYS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Info,
    Success,
    Alert,
    Strength,
    Opportunity,
    Pattern,
}

/// Institution-wide alert shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub action: String,
}

/// Titled insight card for the teacher and student views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub recommendation: String,
}

impl Insight {
    fn new(kind: AlertKind, title: &str, message: String, recommendation: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message,
            recommendation,
        }
    }
}

/// Every applicable rule fires, in order: one warning per subject below
/// target, then pending onboarding, then strong engagement.
pub fn system_alerts(
    subjects: &[SubjectMastery],
    pending_teachers: i64,
    overall_engagement: Option<f64>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for subject in subjects {
        if subject.avg_mastery < SUBJECT_MASTERY_TARGET {
            alerts.push(Alert {
                kind: AlertKind::Warning,
                message: format!(
                    "{} department mastery below target ({}%)",
                    subject.subject, subject.avg_mastery as i64
                ),
                action: "Review curriculum and teaching strategies".to_string(),
            });
        }
    }

    if pending_teachers > 0 {
        alerts.push(Alert {
            kind: AlertKind::Info,
            message: format!("{pending_teachers} teachers pending onboarding completion"),
            action: "Send reminder and provide support".to_string(),
        });
    }

    if let Some(engagement) = overall_engagement.filter(|e| *e > STRONG_ENGAGEMENT) {
        alerts.push(Alert {
            kind: AlertKind::Success,
            message: format!("Overall engagement strong at {}%", engagement as i64),
            action: "Share best practices with faculty".to_string(),
        });
    }

    alerts
}

/// `topics` is expected weakest first.
pub fn teacher_insights(
    topics: &[TopicMastery],
    at_risk: &[AtRiskStudent],
    class_engagement: Option<f64>,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(worst) = topics.first() {
        insights.push(Insight::new(
            AlertKind::Warning,
            "Topic Needs Attention",
            format!(
                "{} has class average of {}%",
                worst.topic, worst.avg_mastery as i64
            ),
            format!(
                "Consider review session or alternative teaching approach for {}",
                worst.topic
            ),
        ));
    }

    if !at_risk.is_empty() {
        insights.push(Insight::new(
            AlertKind::Alert,
            "Students Need Support",
            format!(
                "{} students showing low mastery or engagement",
                at_risk.len()
            ),
            "Schedule one-on-one check-ins or provide targeted interventions".to_string(),
        ));
    }

    if let Some(engagement) = class_engagement.filter(|e| *e > STRONG_ENGAGEMENT) {
        insights.push(Insight::new(
            AlertKind::Success,
            "Strong Class Engagement",
            format!("Class engagement at {}%", engagement as i64),
            "Maintain current teaching strategies and interactive activities".to_string(),
        ));
    }

    insights
}

pub fn student_insights(
    learning_style: &str,
    subjects: &[SubjectMastery],
    streak_days: u32,
) -> Vec<Insight> {
    let style = match learning_style {
        "visual" => "You learn best through visual content. Use diagrams and charts more often!",
        "textual" => "Reading and writing reinforce your learning. Take detailed notes!",
        _ => "Mixed learning works for you. Combine videos, reading, and practice!",
    };

    let weakest = subjects
        .iter()
        .min_by(|a, b| a.avg_mastery.total_cmp(&b.avg_mastery));
    let growth = match weakest {
        Some(subject) => format!("Focus on {} to boost overall mastery.", subject.subject),
        None => "Keep practicing across all subjects for balanced growth.".to_string(),
    };

    let pattern = if streak_days > STREAK_PATTERN_DAYS {
        format!("{streak_days} day streak! Consistency is your superpower.")
    } else {
        "Build a daily study habit. Even 15 minutes helps maintain momentum!".to_string()
    };

    vec![
        Insight::new(
            AlertKind::Strength,
            "Your Learning Style",
            style.to_string(),
            String::new(),
        ),
        Insight::new(AlertKind::Opportunity, "Growth Area", growth, String::new()),
        Insight::new(AlertKind::Pattern, "Study Pattern", pattern, String::new()),
    ]
}
