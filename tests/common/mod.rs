use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Write a CSV snapshot of `students` students in three proficiency tiers,
/// so every difficulty class is represented.
pub fn write_snapshot(dir: &Path, students: usize) {
    let paces = ["slow", "average", "fast"];
    let styles = ["visual", "textual", "mixed"];

    let mut profiles = String::from(
        "student_id,student_name,grade,section,baseline_proficiency,learning_pace,preferred_learning_style\n",
    );
    let mut quizzes = String::from(
        "student_id,subject,topic,difficulty_level,quiz_score,time_taken_seconds,number_of_attempts,previous_mastery_score,timestamp\n",
    );
    let mut labels = String::from("student_id,subject,topic,final_mastery_score\n");
    let mut projects = String::from(
        "student_id,project_id,role_in_team,tasks_completed,peer_review_score,communication_score,collaboration_score,creativity_score,project_completion_pct\n",
    );

    for i in 0..students {
        let tier = i % 3;
        let baseline = 35.0 + 25.0 * tier as f64;
        let grade = if i % 2 == 0 { 10 } else { 9 };
        let _ = writeln!(
            profiles,
            "S{i:03},Student {i},{grade},A,{baseline},{},{}",
            paces[tier], styles[i % 3]
        );
        for (subject, topic) in [("Math", "Algebra"), ("Science", "Physics")] {
            let score = baseline + (i % 5) as f64;
            let _ = writeln!(
                quizzes,
                "S{i:03},{subject},{topic},medium,{score},{},1,{},2026-02-0{}T10:00:00",
                900 - 200 * tier,
                score - 4.0,
                1 + i % 9
            );
            let _ = writeln!(labels, "S{i:03},{subject},{topic},{}", score + 2.0);
        }
        let tasks = 4 + 3 * tier;
        let _ = writeln!(
            projects,
            "S{i:03},PROJ_{},Coder,{tasks},{},4,4,3.5,{}",
            i % 4,
            3.0 + tier as f64 * 0.8,
            60 + 15 * tier
        );
    }

    fs::write(dir.join("students.csv"), profiles).unwrap();
    fs::write(dir.join("quiz_attempts.csv"), quizzes).unwrap();
    fs::write(dir.join("mastery_labels.csv"), labels).unwrap();
    fs::write(dir.join("project_activities.csv"), projects).unwrap();
}
