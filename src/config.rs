use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::SoftmaxParams;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub models_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_level: String,
    pub strict_input: bool,
    pub training: TrainingConfig,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.is_empty());

        let models_dir = std::env::var("MODELS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./models"));

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let mut training = TrainingConfig::default();
        if let Some(seed) = std::env::var("TRAINING_SEED")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
        {
            training.seed = seed;
        }

        Self {
            database_url,
            models_dir,
            data_dir,
            log_level,
            strict_input: env_flag("STRICT_INPUT"),
            training,
        }
    }
}

/// Hyper-parameters of one training run. Recorded in the bundle metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub test_ratio: f64,
    pub seed: u64,
    pub ridge_lambda: f64,
    pub classifier: SoftmaxParams,
    pub top_features: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            ridge_lambda: 1e-2,
            classifier: SoftmaxParams {
                learning_rate: 0.1,
                epochs: 500,
                l2: 1e-3,
            },
            top_features: 5,
        }
    }
}
