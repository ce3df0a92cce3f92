use serde::Serialize;

const MASTERY_WEIGHT: f64 = 0.35;
const ENGAGEMENT_WEIGHT: f64 = 0.25;
const ADOPTION_WEIGHT: f64 = 0.25;
const COVERAGE_WEIGHT: f64 = 0.15;

/// Inputs of the institutional confidence score, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfidenceFactors {
    pub mastery: f64,
    pub engagement: f64,
    pub teacher_adoption: f64,
    pub data_coverage: f64,
}

fn ratio(part: i64, whole: i64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64
    } else {
        0.0
    }
}

impl ConfidenceFactors {
    /// Normalize raw aggregates. Missing averages and empty populations
    /// contribute 0.
    pub fn from_aggregates(
        avg_mastery: Option<f64>,
        avg_engagement: Option<f64>,
        active_teachers: i64,
        total_teachers: i64,
        active_students: i64,
        total_students: i64,
    ) -> Self {
        Self {
            mastery: avg_mastery.unwrap_or(0.0) / 100.0,
            engagement: avg_engagement.unwrap_or(0.0) / 100.0,
            teacher_adoption: ratio(active_teachers, total_teachers),
            data_coverage: ratio(active_students, total_students),
        }
        .clamped()
    }

    fn clamped(self) -> Self {
        Self {
            mastery: self.mastery.clamp(0.0, 1.0),
            engagement: self.engagement.clamp(0.0, 1.0),
            teacher_adoption: self.teacher_adoption.clamp(0.0, 1.0),
            data_coverage: self.data_coverage.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn from_score(score: u32) -> Self {
        if score >= 75 {
            Self::High
        } else if score >= 50 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorScore {
    pub name: &'static str,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceScore {
    pub score: u32,
    pub level: ConfidenceBand,
    pub factors: Vec<FactorScore>,
}

fn percent(factor: f64) -> u32 {
    (factor.clamp(0.0, 1.0) * 100.0).round() as u32
}

pub fn institutional_confidence(factors: ConfidenceFactors) -> ConfidenceScore {
    let factors = factors.clamped();
    let weighted = factors.mastery * MASTERY_WEIGHT
        + factors.engagement * ENGAGEMENT_WEIGHT
        + factors.teacher_adoption * ADOPTION_WEIGHT
        + factors.data_coverage * COVERAGE_WEIGHT;
    let score = percent(weighted);
    ConfidenceScore {
        score,
        level: ConfidenceBand::from_score(score),
        factors: vec![
            FactorScore {
                name: "Mastery Trends",
                score: percent(factors.mastery),
            },
            FactorScore {
                name: "Engagement Consistency",
                score: percent(factors.engagement),
            },
            FactorScore {
                name: "Teacher Adoption",
                score: percent(factors.teacher_adoption),
            },
            FactorScore {
                name: "Data Coverage",
                score: percent(factors.data_coverage),
            },
        ],
    }
}
