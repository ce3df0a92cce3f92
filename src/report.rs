use std::fmt::Write;

use chrono::NaiveDate;

use crate::analytics::dashboard::{AdminDashboard, TeacherDashboard};
use crate::analytics::risk::{AtRiskStudent, RiskSeverity};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrioritySummary {
    pub critical: usize,
    pub high: usize,
}

pub fn summarize_by_priority(students: &[AtRiskStudent]) -> PrioritySummary {
    let mut summary = PrioritySummary::default();
    for student in students {
        match student.priority {
            RiskSeverity::Critical => summary.critical += 1,
            RiskSeverity::High => summary.high += 1,
        }
    }
    summary
}

pub fn build_report(
    generated_on: NaiveDate,
    teacher: &TeacherDashboard,
    admin: Option<&AdminDashboard>,
) -> String {
    let mut output = String::new();
    let kpi = &teacher.kpi;

    let _ = writeln!(output, "# Cohort Learning Report");
    let _ = writeln!(output, "Generated on {}", generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Overview");
    let _ = writeln!(output, "- Students: {}", kpi.total_students);
    let _ = writeln!(output, "- Average mastery: {}%", kpi.avg_class_mastery);
    let _ = writeln!(output, "- Engagement index: {}%", kpi.engagement_index);
    let dist = &teacher.engagement_distribution;
    let _ = writeln!(
        output,
        "- Engagement mix: {:.1}% high, {:.1}% medium, {:.1}% low",
        dist.high, dist.medium, dist.low
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Needing Support");

    if teacher.at_risk_students.is_empty() {
        let _ = writeln!(output, "No students flagged in this window.");
    } else {
        let summary = summarize_by_priority(&teacher.at_risk_students);
        let _ = writeln!(
            output,
            "{} critical, {} high priority",
            summary.critical, summary.high
        );
        for student in &teacher.at_risk_students {
            let _ = writeln!(
                output,
                "- {} (grade {}{}) mastery {}%, engagement {}% [{:?}]",
                student.name,
                student.grade,
                student.section,
                student.mastery,
                student.engagement,
                student.priority
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weakest Topics");

    if teacher.topic_mastery.is_empty() {
        let _ = writeln!(output, "No mastery data recorded.");
    } else {
        for topic in teacher.topic_mastery.iter().take(5) {
            let _ = writeln!(
                output,
                "- {}: {}% across {} students ({:?})",
                topic.topic, topic.mastery, topic.student_count, topic.status
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insights");

    if teacher.insights.is_empty() {
        let _ = writeln!(output, "Nothing notable this period.");
    } else {
        for insight in &teacher.insights {
            let _ = writeln!(
                output,
                "- **{}**: {}. {}",
                insight.title, insight.message, insight.recommendation
            );
        }
    }

    if let Some(admin) = admin {
        let confidence = &admin.confidence_score;
        let _ = writeln!(output);
        let _ = writeln!(output, "## Institution");
        let _ = writeln!(
            output,
            "Confidence score {} ({:?})",
            confidence.score, confidence.level
        );
        for factor in &confidence.factors {
            let _ = writeln!(output, "- {}: {}", factor.name, factor.score);
        }
        for alert in &admin.alerts {
            let _ = writeln!(output, "- {:?}: {} ({})", alert.kind, alert.message, alert.action);
        }
    }

    output
}
