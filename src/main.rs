use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;

use learning_insights::analytics::dashboard;
use learning_insights::config::Config;
use learning_insights::db::PgStore;
use learning_insights::logging::init_tracing;
use learning_insights::metrics::EvaluationMetrics;
use learning_insights::predictor::{load_or_fallback, InsightSource, ValidationMode};
use learning_insights::report;
use learning_insights::snapshot::load_snapshot;
use learning_insights::trainer::ModelTrainer;

#[derive(Parser)]
#[command(name = "learning-insights")]
#[command(about = "Student mastery, engagement and task-difficulty insights", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train all predictors from a CSV snapshot and write the model bundle
    Train {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        models_dir: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Answer one inference request read from a JSON file or stdin
    Predict {
        #[arg(long, default_value = "-")]
        input: String,
        #[arg(long)]
        models_dir: Option<PathBuf>,
        /// Reject requests missing a predictor's numeric features
        #[arg(long)]
        strict: bool,
    },
    /// Print the teacher dashboard as JSON
    TeacherDashboard,
    /// Print the admin dashboard as JSON
    AdminDashboard,
    /// Print one student's analytics as JSON
    Student {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },
    /// Generate a markdown cohort report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Include institution-wide confidence and alerts
        #[arg(long)]
        admin: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<PgStore> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to a production Postgres instance")?;
    PgStore::connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

fn read_request(input: &str) -> anyhow::Result<serde_json::Value> {
    let raw = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read request from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?
    };
    serde_json::from_str(&raw).context("request is not valid JSON")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Train {
            data_dir,
            models_dir,
            seed,
        } => {
            let data_dir = data_dir.unwrap_or(config.data_dir);
            let models_dir = models_dir.unwrap_or(config.models_dir);
            if let Some(seed) = seed {
                config.training.seed = seed;
            }

            let snapshot = load_snapshot(&data_dir)
                .with_context(|| format!("failed to load snapshot from {}", data_dir.display()))?;
            let trainer = ModelTrainer::new(config.training);
            let report = trainer
                .run(&snapshot, &models_dir)
                .context("failed to write model bundle")?;

            println!("Training run {} written to {}.", report.run_id, models_dir.display());
            for (predictor, metrics) in &report.trained {
                match &metrics.evaluation {
                    EvaluationMetrics::Regression(m) => println!(
                        "- {predictor}: test RMSE {:.2}, test R2 {:.3} ({} train / {} test rows)",
                        m.test_rmse, m.test_r2, metrics.train_rows, metrics.test_rows
                    ),
                    EvaluationMetrics::Classification(m) => println!(
                        "- {predictor}: test accuracy {:.3} ({} train / {} test rows)",
                        m.test_accuracy, metrics.train_rows, metrics.test_rows
                    ),
                }
            }
            for (predictor, err) in &report.failures {
                println!("- {predictor}: not trained ({err})");
            }
        }
        Commands::Predict {
            input,
            models_dir,
            strict,
        } => {
            let models_dir = models_dir.unwrap_or(config.models_dir);
            let validation = if strict || config.strict_input {
                ValidationMode::Strict
            } else {
                ValidationMode::Lenient
            };
            let body = read_request(&input)?;
            let source = load_or_fallback(&models_dir, validation);
            let insights = source.handle_request(&body)?;
            print_json(&insights)?;
        }
        Commands::TeacherDashboard => {
            let store = connect(&config).await?;
            let view = dashboard::fetch_teacher_dashboard(&store, Utc::now().naive_utc()).await?;
            print_json(&view)?;
        }
        Commands::AdminDashboard => {
            let store = connect(&config).await?;
            let view = dashboard::fetch_admin_dashboard(&store, Utc::now().naive_utc()).await?;
            print_json(&view)?;
        }
        Commands::Student {
            student_id,
            models_dir,
        } => {
            let models_dir = models_dir.unwrap_or_else(|| config.models_dir.clone());
            let validation = if config.strict_input {
                ValidationMode::Strict
            } else {
                ValidationMode::Lenient
            };
            let source = load_or_fallback(&models_dir, validation);
            let store = connect(&config).await?;
            let view = dashboard::fetch_student_analytics(
                &store,
                &student_id,
                Utc::now().naive_utc(),
                source.as_ref(),
            )
            .await?;

            match view {
                Some(view) => print_json(&view)?,
                None => anyhow::bail!("no student with id {student_id}"),
            }
        }
        Commands::Report { out, admin } => {
            let store = connect(&config).await?;
            let now = Utc::now().naive_utc();
            let teacher = dashboard::fetch_teacher_dashboard(&store, now).await?;
            let admin = if admin {
                Some(dashboard::fetch_admin_dashboard(&store, now).await?)
            } else {
                None
            };
            let report = report::build_report(now.date(), &teacher, admin.as_ref());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
