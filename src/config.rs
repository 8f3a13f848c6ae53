use anyhow::{Context, Result};

pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_TEAMWORK_DOMAIN: &str = "cultureflipper";

#[derive(Debug, Clone)]
pub struct Config {
    // OpenAI
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,
    pub openai_temperature: f32,
    pub openai_max_tokens: u32,

    // Teamwork
    pub teamwork_api_key: Option<String>,
    pub teamwork_domain: String,
    pub teamwork_base_url: String,

    // Evaluation
    pub compliance_threshold: u8,
    pub concurrency: usize,

    // Paths
    pub reports_dir: String,
    pub data_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let teamwork_domain = std::env::var("TEAMWORK_DOMAIN")
            .map(|d| d.trim().trim_end_matches('%').to_string())
            .unwrap_or_else(|_| DEFAULT_TEAMWORK_DOMAIN.to_string());

        let openai_temperature = match std::env::var("OPENAI_TEMPERATURE") {
            Ok(v) => v
                .trim()
                .parse()
                .with_context(|| format!("OPENAI_TEMPERATURE is not a number: '{}'", v))?,
            Err(_) => 0.0,
        };

        Ok(Self {
            // OpenAI - key is only needed once an evaluation actually runs
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_model: non_empty_var("OPENAI_MODEL_NAME")
                .or_else(|| non_empty_var("OPENAI_MODEL"))
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_API_URL.to_string()),
            openai_temperature,
            openai_max_tokens: std::env::var("OPENAI_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),

            // Teamwork
            teamwork_api_key: non_empty_var("TEAMWORK_API_KEY"),
            teamwork_base_url: non_empty_var("TEAMWORK_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("https://{}.teamwork.com", teamwork_domain)),
            teamwork_domain,

            // Evaluation
            compliance_threshold: std::env::var("COMPLIANCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse::<u8>().ok())
                .map(|v| v.min(100))
                .unwrap_or(80),
            concurrency: std::env::var("EVAL_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1)
                .max(1),

            // Paths
            reports_dir: std::env::var("REPORTS_DIR").unwrap_or_else(|_| "reports".to_string()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        })
    }

    /// OpenAI key, or an error naming the missing variable
    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY not set")
    }

    pub fn teamwork_enabled(&self) -> bool {
        self.teamwork_api_key.is_some()
    }

    /// Web URL of a project's task list, for console hints
    pub fn teamwork_project_url(&self, project_id: &str) -> String {
        format!(
            "{}/app/projects/{}/tasks",
            self.teamwork_base_url, project_id
        )
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) fn test_config(openai_url: &str, teamwork_url: Option<&str>) -> Config {
    Config {
        openai_api_key: Some("test-openai-key".to_string()),
        openai_model: "gpt-4o-mini".to_string(),
        openai_api_url: openai_url.to_string(),
        openai_temperature: 0.0,
        openai_max_tokens: 2000,
        teamwork_api_key: teamwork_url.map(|_| "tw-test-key".to_string()),
        teamwork_domain: "example".to_string(),
        teamwork_base_url: teamwork_url
            .unwrap_or("https://example.teamwork.com")
            .to_string(),
        compliance_threshold: 80,
        concurrency: 1,
        reports_dir: "reports".to_string(),
        data_dir: "data".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "OPENAI_API_KEY",
        "OPENAI_MODEL_NAME",
        "OPENAI_MODEL",
        "OPENAI_API_URL",
        "OPENAI_TEMPERATURE",
        "OPENAI_MAX_TOKENS",
        "TEAMWORK_API_KEY",
        "TEAMWORK_DOMAIN",
        "TEAMWORK_BASE_URL",
        "COMPLIANCE_THRESHOLD",
        "EVAL_CONCURRENCY",
        "REPORTS_DIR",
        "DATA_DIR",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    // ==================== Defaults ====================

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        let config = Config::from_env().expect("defaults should load");

        assert!(config.openai_api_key.is_none());
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.openai_api_url, DEFAULT_OPENAI_API_URL);
        assert_eq!(config.openai_temperature, 0.0);
        assert_eq!(config.openai_max_tokens, 2000);
        assert!(!config.teamwork_enabled());
        assert_eq!(config.teamwork_base_url, "https://cultureflipper.teamwork.com");
        assert_eq!(config.compliance_threshold, 80);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.reports_dir, "reports");
    }

    #[test]
    #[serial]
    fn test_require_openai_key_errors_when_missing() {
        clear_env();
        let config = Config::from_env().unwrap();
        let err = config.require_openai_key().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    // ==================== Overrides ====================

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("OPENAI_MODEL_NAME", "gpt-4o");
        std::env::set_var("OPENAI_TEMPERATURE", "0.2");
        std::env::set_var("TEAMWORK_API_KEY", "tw-key");
        std::env::set_var("TEAMWORK_DOMAIN", "acme%");
        std::env::set_var("EVAL_CONCURRENCY", "0");
        std::env::set_var("COMPLIANCE_THRESHOLD", "250");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.require_openai_key().unwrap(), "sk-test");
        assert_eq!(config.openai_model, "gpt-4o");
        assert!((config.openai_temperature - 0.2).abs() < f32::EPSILON);
        assert!(config.teamwork_enabled());
        assert_eq!(config.teamwork_domain, "acme");
        assert_eq!(config.teamwork_base_url, "https://acme.teamwork.com");
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.compliance_threshold, 100);
    }

    #[test]
    #[serial]
    fn test_legacy_model_variable_is_honoured() {
        clear_env();
        std::env::set_var("OPENAI_MODEL", "gpt-4-turbo");
        let config = Config::from_env().unwrap();
        clear_env();
        assert_eq!(config.openai_model, "gpt-4-turbo");
    }

    #[test]
    #[serial]
    fn test_base_url_override_strips_trailing_slash() {
        clear_env();
        std::env::set_var("TEAMWORK_BASE_URL", "http://127.0.0.1:9999/");
        let config = Config::from_env().unwrap();
        clear_env();
        assert_eq!(config.teamwork_base_url, "http://127.0.0.1:9999");
        assert_eq!(
            config.teamwork_project_url("42"),
            "http://127.0.0.1:9999/app/projects/42/tasks"
        );
    }

    #[test]
    #[serial]
    fn test_invalid_temperature_is_an_error() {
        clear_env();
        std::env::set_var("OPENAI_TEMPERATURE", "warm");
        let result = Config::from_env();
        clear_env();
        assert!(result.is_err());
    }
}
