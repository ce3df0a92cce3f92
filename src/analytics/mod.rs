//! Composite metrics for the teacher, admin and student dashboards.

pub mod alerts;
pub mod confidence;
pub mod dashboard;
pub mod engagement;
pub mod risk;
pub mod streak;
