use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod assessment;
mod config;
mod content;
mod db;
mod feedback;
mod grading;
mod models;
mod report;
mod scoring;

use config::{DatabaseArgs, ModelArgs, ModelConfig};

#[derive(Parser)]
#[command(name = "eduassist")]
#[command(about = "Student performance tracking and grading for EduAssist", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    database: DatabaseArgs,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo students
    Seed,
    /// Import students from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List students ranked by performance
    Roster {
        /// Filter by name or email
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Grade submission files named <student-id>_<title>.txt
    Grade {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Compute updates without writing them
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Compute a performance update without touching the database
    Score {
        #[arg(long, allow_negative_numbers = true)]
        current: i32,
        #[arg(long, allow_negative_numbers = true)]
        quality: f64,
        /// RFC 3339 timestamp of the previous submission
        #[arg(long)]
        last_submission: Option<DateTime<Utc>>,
        /// Reference time, defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Show automated feedback messages for students
    Messages {
        #[arg(long)]
        student: Option<String>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Generate teaching content with the model
    Generate {
        #[arg(long, value_enum)]
        kind: content::ContentKind,
        #[arg(long)]
        topic: String,
        /// Print only, do not store the template
        #[arg(long)]
        no_save: bool,
        #[command(flatten)]
        model: ModelArgs,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "eduassist=debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::InitDb => {
            let pool = db::connect(&cli.database).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = db::connect(&cli.database).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = db::connect(&cli.database).await?;
            let stored = db::import_csv(&pool, &csv).await?;
            println!("Stored {stored} students from {}.", csv.display());
        }
        Commands::Roster { search, limit } => {
            let pool = db::connect(&cli.database).await?;
            let students = report::rank_students(&db::fetch_students(&pool).await?);
            let matches = report::filter_students(&students, search.as_deref().unwrap_or(""));

            if matches.is_empty() {
                println!("No students found.");
                return Ok(());
            }

            let summary = report::summarize_standing(matches.iter().copied());
            println!(
                "{} students: {} top performers, {} on track, {} need support",
                summary.total, summary.top_performers, summary.on_track, summary.needs_support
            );
            for (rank, student) in matches
                .iter()
                .enumerate()
                .take(limit.unwrap_or(usize::MAX))
            {
                println!(
                    "{:>3}. {} ({}, {}) {}% - {}",
                    rank + 1,
                    student.name,
                    student.email,
                    student.grade,
                    student.performance,
                    student.last_feedback.as_deref().unwrap_or("No feedback yet")
                );
            }
        }
        Commands::Grade {
            files,
            dry_run,
            model,
        } => {
            let pool = db::connect(&cli.database).await?;
            let client = assessment::GenerativeClient::new(ModelConfig::try_from(model)?)
                .context("failed to build model client")?;
            let summary = grading::grade_files(&pool, &client, &files, dry_run).await?;

            let verb = if dry_run { "Would update" } else { "Updated" };
            for update in &summary.updates {
                println!(
                    "{verb} {}: {} -> {} ({:+}), quality {:.0}, consistency {:.3}",
                    update.student_id,
                    update.previous,
                    update.performance,
                    update.delta(),
                    update.quality_score,
                    update.consistency_factor
                );
            }
            for skipped in &summary.skipped {
                println!("Skipped {}: {}", skipped.path.display(), skipped.reason);
            }
            println!(
                "Graded {} of {} submissions.",
                summary.updates.len(),
                files.len()
            );
        }
        Commands::Score {
            current,
            quality,
            last_submission,
            now,
        } => {
            let now = now.unwrap_or_else(Utc::now);
            let consistency = scoring::consistency_factor(current, last_submission, now);
            let performance = scoring::new_performance(current, quality, consistency);
            println!("Consistency factor: {consistency:.4}");
            println!("New performance: {performance}");
        }
        Commands::Messages { student } => {
            let pool = db::connect(&cli.database).await?;
            let students = match student {
                Some(id) => db::fetch_student(&pool, &id)
                    .await?
                    .map(|record| vec![record])
                    .with_context(|| format!("no student with id {id}"))?,
                None => db::fetch_students(&pool).await?,
            };

            for student in &students {
                println!("To {} <{}>", student.name, student.email);
                println!(
                    "{}",
                    feedback::automated_feedback(&student.name, student.performance)
                );
                println!();
            }
        }
        Commands::Report { out } => {
            let pool = db::connect(&cli.database).await?;
            let students = db::fetch_students(&pool).await?;
            let report = report::build_report(&students, Utc::now());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Generate {
            kind,
            topic,
            no_save,
            model,
        } => {
            let client = assessment::GenerativeClient::new(ModelConfig::try_from(model)?)
                .context("failed to build model client")?;
            let template = content::generate(&client, kind, &topic).await?;

            println!("# {}", template.title);
            println!();
            println!("{}", template.content);

            if !no_save {
                let pool = db::connect(&cli.database).await?;
                db::insert_content_template(&pool, &template).await?;
                println!();
                println!("Saved template {}.", template.id);
            }
        }
    }

    Ok(())
}
