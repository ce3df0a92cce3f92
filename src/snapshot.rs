use std::path::Path;

use serde::de::DeserializeOwned;

use crate::dataset::TrainingSnapshot;
use crate::error::SnapshotError;

pub const STUDENTS_FILE: &str = "students.csv";
pub const QUIZ_ATTEMPTS_FILE: &str = "quiz_attempts.csv";
pub const MASTERY_LABELS_FILE: &str = "mastery_labels.csv";
pub const PROJECT_ACTIVITIES_FILE: &str = "project_activities.csv";

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SnapshotError> {
    let wrap = |source| SnapshotError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(wrap)?;
    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        rows.push(result.map_err(wrap)?);
    }
    Ok(rows)
}

/// Read a training snapshot from a directory of CSV exports. Project
/// activities are optional; every other table is required.
pub fn load_snapshot(dir: &Path) -> Result<TrainingSnapshot, SnapshotError> {
    let students = read_table(&dir.join(STUDENTS_FILE))?;
    let quiz_attempts = read_table(&dir.join(QUIZ_ATTEMPTS_FILE))?;
    let mastery_labels = read_table(&dir.join(MASTERY_LABELS_FILE))?;

    let projects_path = dir.join(PROJECT_ACTIVITIES_FILE);
    let project_activities = if projects_path.exists() {
        read_table(&projects_path)?
    } else {
        tracing::warn!(path = %projects_path.display(), "no project activity export, skipping");
        Vec::new()
    };

    let snapshot = TrainingSnapshot {
        students,
        quiz_attempts,
        mastery_labels,
        project_activities,
    };
    tracing::info!(
        students = snapshot.students.len(),
        quiz_attempts = snapshot.quiz_attempts.len(),
        mastery_labels = snapshot.mastery_labels.len(),
        project_activities = snapshot.project_activities.len(),
        "loaded training snapshot"
    );
    Ok(snapshot)
}
