//! Teamwork utility - look up and record name decisions without running an evaluation
//!
//! Usage:
//!   cargo run --bin teamwork -- search "김지원"
//!   cargo run --bin teamwork -- evaluations "John Smith"
//!   cargo run --bin teamwork -- verify "김지원"
//!   cargo run --bin teamwork -- task 12345
//!   cargo run --bin teamwork -- post "김지원" --project-id 12345 --score 90 --compliant
//!
//! Required environment variables:
//! - TEAMWORK_API_KEY
//!
//! Optional:
//! - TEAMWORK_DOMAIN (defaults to cultureflipper)
//! - TEAMWORK_BASE_URL (overrides the domain)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use name_eval::config::Config;
use name_eval::direction::detect_direction;
use name_eval::models::{NameEvaluationResult, TaskRecord};
use name_eval::teamwork::{PostTarget, TeamworkClient};

#[derive(Parser)]
#[command(name = "teamwork")]
#[command(about = "Search and record name decisions in Teamwork", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find tasks mentioning a name in active projects
    Search { name: String },
    /// List previous name evaluations
    Evaluations { name: String },
    /// Split prior matches into evaluations and translations
    Verify { name: String },
    /// Show one task by id
    Task { id: String },
    /// Record an evaluation as a new task in a project
    Post {
        name: String,
        /// Project that receives the task
        #[arg(long)]
        project_id: String,
        /// Overall score to record
        #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(0..=100))]
        score: u8,
        /// Mark the name as compliant
        #[arg(long)]
        compliant: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn client_from_env() -> Result<TeamworkClient> {
    let config = Config::from_env()?;
    let key = config
        .teamwork_api_key
        .as_deref()
        .context("TEAMWORK_API_KEY not set")?;
    Ok(TeamworkClient::new(
        reqwest::Client::new(),
        key,
        &config.teamwork_base_url,
    ))
}

fn print_records(records: &[TaskRecord]) {
    for record in records {
        println!("- {} ({})", record.title, record.created_at);
        println!("  URL: {}", record.url);
    }
}

async fn run(command: Command) -> Result<()> {
    let client = client_from_env()?;

    match command {
        Command::Search { name } => {
            println!("Searching for '{}' in Teamwork ({})...", name, client.base_url());
            let tasks = client.search_tasks(&name).await?;
            println!("Found {} matching tasks", tasks.len());
            for task in &tasks {
                println!("- {} (Task ID: {})", task.title, task.id);
                println!("  Project: {}", task.project_name);
                println!("  URL: {}", task.url);
            }
        }
        Command::Evaluations { name } => {
            println!("Finding previous evaluations for '{}'...", name);
            let evaluations = client.previous_evaluations(&name).await?;
            println!("Found {} previous evaluations", evaluations.len());
            print_records(&evaluations);
        }
        Command::Verify { name } => {
            println!("Verifying name '{}' in Teamwork...", name);
            let verification = client.verify_name(&name).await?;
            println!("Verification status: {}", verification.status);

            if !verification.previous_evaluations.is_empty() {
                println!(
                    "\nFound {} previous evaluations:",
                    verification.previous_evaluations.len()
                );
                print_records(&verification.previous_evaluations);
            }
            if !verification.previous_translations.is_empty() {
                println!(
                    "\nFound {} previous translations:",
                    verification.previous_translations.len()
                );
                print_records(&verification.previous_translations);
            }
        }
        Command::Task { id } => {
            let task = client.get_task(&id).await?;
            println!("{} (Task ID: {})", task.content, task.id);
            if !task.project_name.is_empty() {
                println!("  Project: {}", task.project_name);
            }
            if !task.created_on.is_empty() {
                println!("  Created: {}", task.created_on);
            }
            if !task.description.is_empty() {
                println!("  Description: {}", task.description);
            }
            println!("  URL: {}", client.task_url(&task.id));
        }
        Command::Post {
            name,
            project_id,
            score,
            compliant,
        } => {
            println!("Posting evaluation for '{}' to Teamwork...", name);
            let mut result = NameEvaluationResult::new(name.as_str(), detect_direction(&name));
            result.overall_score = score;
            result.compliant = compliant;

            let message = client
                .post_evaluation(&result, &PostTarget::Project(project_id))
                .await?;
            println!("Status: Success");
            println!("Message: {}", message);
        }
    }

    Ok(())
}
