use serde::Serialize;

use crate::metrics::round_to;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    High,
    Medium,
    Low,
}

impl EngagementLevel {
    pub fn from_score(avg_engagement: f64) -> Self {
        if avg_engagement >= 75.0 {
            Self::High
        } else if avg_engagement >= 50.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Share of the cohort in each engagement band, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EngagementDistribution {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

/// Bucket per-student mean engagement. Percentages are relative to
/// `cohort_size`, so students without any engagement rows count toward no
/// band and the shares may sum to less than 100.
pub fn engagement_distribution(student_means: &[f64], cohort_size: usize) -> EngagementDistribution {
    if cohort_size == 0 {
        return EngagementDistribution::default();
    }
    let (mut high, mut medium, mut low) = (0usize, 0usize, 0usize);
    for mean in student_means {
        match EngagementLevel::from_score(*mean) {
            EngagementLevel::High => high += 1,
            EngagementLevel::Medium => medium += 1,
            EngagementLevel::Low => low += 1,
        }
    }
    let share = |count: usize| round_to(count as f64 / cohort_size as f64 * 100.0, 1);
    EngagementDistribution {
        high: share(high),
        medium: share(medium),
        low: share(low),
    }
}
