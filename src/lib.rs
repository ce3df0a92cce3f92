pub mod analytics;
pub mod bundle;
pub mod codec;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod models;
pub mod predictor;
pub mod report;
pub mod snapshot;
pub mod split;
pub mod store;
pub mod trainer;
