//! Teamwork (project tracker) client and the capability wrapper the rest of
//! the crate talks to.
//!
//! Every lookup fetches all active projects and scans their tasks. There is no
//! index, cache or pagination.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{NameEvaluationResult, TaskRecord, TeamworkVerification};

#[derive(Debug, Error)]
pub enum TeamworkError {
    #[error("Teamwork request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Teamwork API error ({status}): {body}")]
    Status { status: u16, body: String },
}

pub type TeamworkResult<T> = std::result::Result<T, TeamworkError>;

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(
        default,
        rename = "project-id",
        alias = "projectId",
        deserialize_with = "flexible_id_or_empty"
    )]
    pub project_id: String,
    #[serde(default, rename = "project-name", alias = "projectName")]
    pub project_name: String,
    #[serde(default, rename = "created-on", alias = "created-date")]
    pub created_on: String,
}

#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    #[serde(default, rename = "todo-items")]
    todo_items: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(rename = "todo-item")]
    todo_item: Task,
}

#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    #[serde(default, rename = "taskId", alias = "id", deserialize_with = "flexible_id_or_empty")]
    task_id: String,
}

#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    comment: CommentBody<'a>,
}

#[derive(Debug, Serialize)]
struct CommentBody<'a> {
    body: &'a str,
    notify: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    #[serde(rename = "todo-item")]
    todo_item: NewTask<'a>,
}

#[derive(Debug, Serialize)]
struct NewTask<'a> {
    content: &'a str,
    description: &'a str,
    #[serde(rename = "responsible-party-id", skip_serializing_if = "Option::is_none")]
    responsible_party_id: Option<&'a str>,
}

/// Where an evaluation gets recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostTarget {
    /// Comment on an existing task
    Task(String),
    /// New task inside a project
    Project(String),
}

#[derive(Debug, Clone)]
pub struct TeamworkClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TeamworkClient {
    pub fn new(http: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        let api_key = api_key.trim();
        let api_key = api_key
            .strip_prefix('"')
            .and_then(|k| k.strip_suffix('"'))
            .unwrap_or(api_key);

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn task_url(&self, task_id: &str) -> String {
        format!("{}/tasks/{}", self.base_url, task_id)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> TeamworkResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_key, Some("X"))
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> TeamworkResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.api_key, Some("X"))
            .json(body)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> TeamworkResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(TeamworkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    pub async fn get_projects(&self, status: &str) -> TeamworkResult<Vec<Project>> {
        let response: ProjectsResponse = self
            .get_json(&format!("/projects.json?status={}", status))
            .await?;
        Ok(response.projects)
    }

    pub async fn get_tasks_by_project(&self, project_id: &str) -> TeamworkResult<Vec<Task>> {
        let response: TasksResponse = self
            .get_json(&format!("/projects/{}/tasks.json", project_id))
            .await?;
        Ok(response.todo_items)
    }

    pub async fn get_task(&self, task_id: &str) -> TeamworkResult<Task> {
        let response: TaskResponse = self.get_json(&format!("/tasks/{}.json", task_id)).await?;
        Ok(response.todo_item)
    }

    /// Case-insensitive substring search over every active project's tasks.
    ///
    /// A project whose task list fails to load is logged and skipped.
    pub async fn search_tasks(&self, query: &str) -> TeamworkResult<Vec<TaskRecord>> {
        let projects = self.get_projects("active").await?;
        let query_lower = query.to_lowercase();
        let mut matches = Vec::new();

        for project in &projects {
            let tasks = match self.get_tasks_by_project(&project.id).await {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!("Error searching tasks in project {}: {}", project.id, e);
                    continue;
                }
            };

            matches.extend(
                tasks
                    .into_iter()
                    .filter(|t| {
                        t.content.to_lowercase().contains(&query_lower)
                            || t.description.to_lowercase().contains(&query_lower)
                    })
                    .map(|t| self.to_record(t, project)),
            );
        }

        debug!(
            "Teamwork search for '{}' scanned {} projects, {} matches",
            query,
            projects.len(),
            matches.len()
        );
        Ok(matches)
    }

    fn to_record(&self, task: Task, project: &Project) -> TaskRecord {
        TaskRecord {
            url: self.task_url(&task.id),
            id: task.id,
            title: task.content,
            project_id: if task.project_id.is_empty() {
                project.id.clone()
            } else {
                task.project_id
            },
            project_name: project.name.clone(),
            created_at: task.created_on,
        }
    }

    /// Search hits whose title marks them as a name evaluation
    pub async fn previous_evaluations(&self, name: &str) -> TeamworkResult<Vec<TaskRecord>> {
        let (evaluations, _) = split_evaluations(self.search_tasks(name).await?);
        Ok(evaluations)
    }

    pub async fn verify_name(&self, name: &str) -> TeamworkResult<TeamworkVerification> {
        let (evaluations, translations) = split_evaluations(self.search_tasks(name).await?);
        Ok(TeamworkVerification::from_matches(evaluations, translations))
    }

    pub async fn add_comment_to_task(&self, task_id: &str, body: &str) -> TeamworkResult<()> {
        let request = CommentRequest {
            comment: CommentBody { body, notify: "" },
        };
        let _: Value = self
            .post_json(&format!("/tasks/{}/comments.json", task_id), &request)
            .await?;
        Ok(())
    }

    /// Create a task and return its id.
    pub async fn create_task(
        &self,
        project_id: &str,
        title: &str,
        description: &str,
        assignee_id: Option<&str>,
    ) -> TeamworkResult<String> {
        let request = CreateTaskRequest {
            todo_item: NewTask {
                content: title,
                description,
                responsible_party_id: assignee_id,
            },
        };
        let response: CreateTaskResponse = self
            .post_json(&format!("/projects/{}/tasks.json", project_id), &request)
            .await?;
        Ok(response.task_id)
    }

    /// Record an evaluation and return a human-readable confirmation.
    pub async fn post_evaluation(
        &self,
        result: &NameEvaluationResult,
        target: &PostTarget,
    ) -> TeamworkResult<String> {
        let comment = format_evaluation_comment(result);
        match target {
            PostTarget::Task(task_id) => {
                self.add_comment_to_task(task_id, &comment).await?;
                Ok(format!("Evaluation posted as comment to task {}", task_id))
            }
            PostTarget::Project(project_id) => {
                let title = format!("Name Evaluation: {}", result.name);
                let task_id = self.create_task(project_id, &title, &comment, None).await?;
                Ok(format!(
                    "Created new task {} in project {}",
                    task_id, project_id
                ))
            }
        }
    }
}

fn split_evaluations(matches: Vec<TaskRecord>) -> (Vec<TaskRecord>, Vec<TaskRecord>) {
    matches
        .into_iter()
        .partition(|t| t.title.to_lowercase().contains("name evaluation"))
}

/// Markdown comment body used when posting an evaluation
pub fn format_evaluation_comment(result: &NameEvaluationResult) -> String {
    let mut comment = format!("### Name Evaluation: {}\n\n", result.name);
    comment.push_str(&format!("**Direction:** {}\n", result.direction));
    if !result.notation.is_empty() {
        comment.push_str(&format!("**Notation:** {}\n", result.notation));
    }
    comment.push_str(&format!(
        "**Compliance Status:** {}\n",
        if result.compliant {
            "✅ Compliant"
        } else {
            "❌ Non-compliant"
        }
    ));
    comment.push_str(&format!("**Score:** {}/100\n", result.overall_score));

    if !result.rule_scores.is_empty() {
        comment.push_str("\n**Rule Scores:**\n");
        for (rule, score) in &result.rule_scores {
            comment.push_str(&format!("- {}: {}/100\n", rule, score));
        }
    }

    if !result.recommendations.is_empty() {
        comment.push_str("\n**Recommendations:**\n");
        for rec in &result.recommendations {
            comment.push_str(&format!("- {}\n", rec));
        }
    }

    comment
}

/// Result of trying to record an evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOutcome {
    pub success: bool,
    pub message: String,
}

/// Tracker capability, chosen once from config.
#[derive(Debug, Clone)]
pub enum Tracker {
    Teamwork(TeamworkClient),
    Disabled,
}

impl Tracker {
    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        match &config.teamwork_api_key {
            Some(key) => {
                info!("Teamwork integration enabled ({})", config.teamwork_base_url);
                Tracker::Teamwork(TeamworkClient::new(http, key, &config.teamwork_base_url))
            }
            None => {
                debug!("TEAMWORK_API_KEY not set, Teamwork integration disabled");
                Tracker::Disabled
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Tracker::Teamwork(_))
    }

    /// Look up prior decisions. Failures are folded into the returned status.
    pub async fn verify(&self, name: &str) -> Option<TeamworkVerification> {
        let client = match self {
            Tracker::Teamwork(client) => client,
            Tracker::Disabled => return None,
        };

        match client.verify_name(name).await {
            Ok(verification) => {
                if verification.found {
                    info!("✓ Found previous entries for '{}' in Teamwork", name);
                } else {
                    info!("✗ No previous entries for '{}' in Teamwork", name);
                }
                Some(verification)
            }
            Err(e) => {
                warn!("Teamwork verification failed for '{}': {}", name, e);
                Some(TeamworkVerification::errored(e.to_string()))
            }
        }
    }

    pub async fn post(&self, result: &NameEvaluationResult, target: &PostTarget) -> PostOutcome {
        let client = match self {
            Tracker::Teamwork(client) => client,
            Tracker::Disabled => {
                return PostOutcome {
                    success: false,
                    message: "Teamwork integration is disabled".to_string(),
                }
            }
        };

        match client.post_evaluation(result, target).await {
            Ok(message) => PostOutcome {
                success: true,
                message,
            },
            Err(e) => PostOutcome {
                success: false,
                message: format!("Error posting to Teamwork: {}", e),
            },
        }
    }
}

fn id_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Teamwork returns ids as strings on some endpoints and numbers on others.
fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(value.clone())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid id: {}", value)))
}

fn flexible_id_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_from_value(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
