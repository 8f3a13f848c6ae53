use anyhow::{bail, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use name_eval::cli::Cli;
use name_eval::config::Config;
use name_eval::direction::Direction;
use name_eval::orchestrator::{write_reports, BatchOptions, Orchestrator, ReportPaths};
use name_eval::report::{describe_real_person_rules, render_text_summary};
use name_eval::resources::{
    format_resources_text, local_resources_text, verification_process_text, ResourceRegistry,
};
use name_eval::teamwork::{PostTarget, Tracker};

/// Usage or I/O problem before any evaluation ran
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (ignored when the variables come from the environment)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if cli.show_resources {
        let data_dir = Path::new(&config.data_dir);
        return match &cli.resource_category {
            Some(category) => match ResourceRegistry::get().by_category_name(category) {
                Ok(resources) => {
                    println!("{}", format_resources_text(&resources));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{:#}", e);
                    ExitCode::from(EXIT_USAGE)
                }
            },
            None => {
                print_resources(cli.direction, data_dir);
                ExitCode::SUCCESS
            }
        };
    }
    if cli.show_local_resources {
        println!("{}", local_resources_text(Path::new(&config.data_dir)));
        return ExitCode::SUCCESS;
    }

    match run(&cli, &config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = format!("name_eval={}", level).parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Verification process for the requested direction (both when unset)
fn print_resources(direction: Option<Direction>, data_dir: &Path) {
    let directions = match direction {
        Some(direction) => vec![direction],
        None => Direction::ALL.to_vec(),
    };
    for direction in directions {
        println!("{}", verification_process_text(direction));
    }
    println!("{}", local_resources_text(data_dir));
}

/// Run a batch. `Ok(true)` when every name is compliant.
async fn run(cli: &Cli, config: &Config) -> Result<bool> {
    let names = cli.collect_names()?;

    let post_target = if cli.post_to_teamwork() {
        match &cli.teamwork_project_id {
            Some(id) => Some(PostTarget::Project(id.clone())),
            None => bail!("--post-to-teamwork requires --teamwork-project-id"),
        }
    } else {
        None
    };

    let http = reqwest::Client::new();
    let tracker = if cli.no_teamwork {
        Tracker::Disabled
    } else {
        Tracker::from_config(http.clone(), config)
    };
    if (cli.verify_in_teamwork() || post_target.is_some()) && !config.teamwork_enabled() {
        warn!("Teamwork requested but TEAMWORK_API_KEY is not set; continuing without it");
    }

    let mut orchestrator = Orchestrator::new(http, config, tracker, cli.verify_in_teamwork())?;
    if let Some(concurrency) = cli.concurrency {
        orchestrator = orchestrator.with_concurrency(concurrency);
    }

    let options = BatchOptions {
        routing: cli.routing(),
        real_person: cli.real_person,
        post_target: post_target.clone(),
    };

    info!("Processing {} name(s)", names.len());
    let outcome = orchestrator.process_names(&names, &options).await;

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.reports_dir));
    let paths = ReportPaths::new(output_dir)
        .with_overrides(cli.output.clone(), cli.json_output.clone());
    write_reports(&outcome, &paths)?;

    println!("{}", render_text_summary(&outcome.summary));

    if cli.real_person {
        for result in &outcome.results {
            if let Some(rules) = &result.real_person_rules {
                println!("  {}: {}", result.name, describe_real_person_rules(rules));
            }
        }
    }

    println!("Reports saved to: {}", paths.output_dir.display());
    println!("Combined report: {}", paths.combined_html.display());

    if let Some(PostTarget::Project(project_id)) = &post_target {
        println!(
            "Teamwork tasks: {}",
            config.teamwork_project_url(project_id)
        );
    }

    Ok(outcome.all_compliant())
}
