use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::direction::Direction;
use crate::orchestrator::Routing;

#[derive(Parser, Debug)]
#[command(name = "name-eval")]
#[command(about = "Evaluate Korean/English proper-name notation against the CF terminology guidelines", long_about = None)]
pub struct Cli {
    /// Names to evaluate (comma-separated values are split)
    #[arg(long, num_args = 1.., conflicts_with = "file")]
    pub names: Vec<String>,

    /// File with one name per line
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Evaluate every name in one direction (KO-EN or EN-KO)
    #[arg(long, conflicts_with = "auto_detect")]
    pub direction: Option<Direction>,

    /// Detect the direction per name (default when --direction is absent)
    #[arg(long)]
    pub auto_detect: bool,

    /// Report directory (defaults to REPORTS_DIR)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Combined HTML report path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Combined JSON results path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Look up prior decisions in Teamwork before evaluating
    #[arg(long)]
    pub verify_in_teamwork: bool,

    /// Record results in Teamwork (needs --teamwork-project-id)
    #[arg(long)]
    pub post_to_teamwork: bool,

    /// Teamwork project that receives new evaluation tasks
    #[arg(long)]
    pub teamwork_project_id: Option<String>,

    /// Disable all Teamwork calls
    #[arg(long)]
    pub no_teamwork: bool,

    /// Apply the stricter real-person rules
    #[arg(long)]
    pub real_person: bool,

    /// Names evaluated at once (defaults to EVAL_CONCURRENCY)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Print the verification resources and exit
    #[arg(long, conflicts_with_all = ["names", "file"])]
    pub show_resources: bool,

    /// Limit --show-resources to one category (internal, netflix, external, all)
    #[arg(long, requires = "show_resources")]
    pub resource_category: Option<String>,

    /// Print which local resource files are available and exit
    #[arg(long, conflicts_with_all = ["names", "file", "show_resources"])]
    pub show_local_resources: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn routing(&self) -> Routing {
        match self.direction {
            Some(direction) if !self.auto_detect => Routing::Fixed(direction),
            _ => Routing::Auto,
        }
    }

    pub fn verify_in_teamwork(&self) -> bool {
        self.verify_in_teamwork && !self.no_teamwork
    }

    pub fn post_to_teamwork(&self) -> bool {
        self.post_to_teamwork && !self.no_teamwork
    }

    /// Names from `--names` or `--file`, blanks dropped.
    pub fn collect_names(&self) -> Result<Vec<String>> {
        let names = match &self.file {
            Some(path) => read_names_file(path)?,
            None => split_names(&self.names),
        };

        if names.is_empty() {
            bail!("No names provided. Use --names or --file");
        }
        Ok(names)
    }
}

/// Split each value on commas, trim, and drop empties.
pub fn split_names<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.as_ref().split(','))
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_names_file(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read names file {}", path.display()))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("name-eval").chain(args.iter().copied())).unwrap()
    }

    // ==================== Names ====================

    #[test]
    fn test_split_names() {
        let names = split_names(&["John Smith, 김지원", " ,Emma Watson,", ""]);
        assert_eq!(names, vec!["John Smith", "김지원", "Emma Watson"]);
    }

    #[test]
    fn test_names_flag_accepts_multiple_values() {
        let cli = parse(&["--names", "John Smith,김지원", "박서준"]);
        assert_eq!(cli.collect_names().unwrap(), vec!["John Smith", "김지원", "박서준"]);
    }

    #[test]
    fn test_names_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("names.txt");
        std::fs::write(&path, "김지원\n\n  John Smith  \n").unwrap();

        let cli = parse(&["--file", path.to_str().unwrap()]);
        assert_eq!(cli.collect_names().unwrap(), vec!["김지원", "John Smith"]);
    }

    #[test]
    fn test_missing_names_file_is_an_error() {
        let cli = parse(&["--file", "/definitely/not/here.txt"]);
        let err = cli.collect_names().unwrap_err();
        assert!(err.to_string().contains("Failed to read names file"));
    }

    #[test]
    fn test_no_names_is_an_error() {
        let cli = parse(&[]);
        assert!(cli.collect_names().is_err());
    }

    // ==================== Flags ====================

    #[test]
    fn test_routing_defaults_to_auto() {
        assert_eq!(parse(&["--names", "x"]).routing(), Routing::Auto);
        assert_eq!(
            parse(&["--names", "x", "--direction", "ko-en"]).routing(),
            Routing::Fixed(Direction::KoEn)
        );
    }

    #[test]
    fn test_conflicting_flags_are_rejected() {
        assert!(Cli::try_parse_from(["name-eval", "--names", "x", "--file", "y"]).is_err());
        assert!(Cli::try_parse_from(["name-eval", "--direction", "KO-EN", "--auto-detect"]).is_err());
        assert!(Cli::try_parse_from(["name-eval", "--names", "x", "--show-resources"]).is_err());
        assert!(Cli::try_parse_from(["name-eval", "--direction", "FR-EN"]).is_err());
        assert!(Cli::try_parse_from(["name-eval", "--resource-category", "netflix"]).is_err());
        assert!(
            Cli::try_parse_from(["name-eval", "--show-resources", "--resource-category", "netflix"])
                .is_ok()
        );
    }

    #[test]
    fn test_no_teamwork_overrides_toggles() {
        let cli = parse(&[
            "--names",
            "x",
            "--verify-in-teamwork",
            "--post-to-teamwork",
            "--no-teamwork",
        ]);
        assert!(!cli.verify_in_teamwork());
        assert!(!cli.post_to_teamwork());

        let cli = parse(&["--names", "x", "--verify-in-teamwork"]);
        assert!(cli.verify_in_teamwork());
    }
}
