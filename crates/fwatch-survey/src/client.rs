//! Blocking client for the task server's JSON API.
//!
//! Endpoints used (relative to the server address):
//! - `GET /api/app?short_name=<name>`
//! - `GET /api/task?app_id=<id>[&state=completed]&limit=<n>`
//! - `GET /api/taskrun?task_id=<id>&limit=<n>`
//!
//! Requests are issued one at a time; there is no retry.

use crate::answer::{TaskRunRecord, VoteRecord};
use crate::task::{AppRecord, Task, TaskRecord};
use crate::{Result, SurveyError};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Which tasks to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskQuery {
    /// Only tasks the server marks completed.
    pub completed_only: bool,
    /// Maximum number of tasks to download.
    pub limit: u32,
}

/// Client for one task server.
pub struct SurveyClient {
    /// Server address without a trailing slash.
    base_url: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for SurveyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurveyClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SurveyClient {
    /// Create a client for `base_url`.
    ///
    /// With `timeout` set to `None` a stalled request blocks indefinitely.
    pub fn new<S: Into<String>>(base_url: S, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    /// Resolve an application's numeric id from its short name.
    pub fn app_id(&self, short_name: &str) -> Result<u64> {
        let apps: Vec<AppRecord> = self.get_json("/api/app", &[("short_name", short_name.to_string())])?;
        apps.first()
            .map(|app| app.id)
            .ok_or_else(|| SurveyError::UnknownApp(short_name.to_string()))
    }

    /// List the tasks of an application.
    pub fn tasks(&self, app_id: u64, query: TaskQuery) -> Result<Vec<Task>> {
        let mut params = vec![("app_id", app_id.to_string())];
        if query.completed_only {
            params.push(("state", "completed".to_string()));
        }
        params.push(("limit", query.limit.to_string()));

        let records: Vec<TaskRecord> = self.get_json("/api/task", &params)?;
        let tasks: Vec<Task> = records.into_iter().map(Task::from).collect();
        info!(
            app_id,
            completed_only = query.completed_only,
            count = tasks.len(),
            "fetched tasks"
        );
        Ok(tasks)
    }

    /// List the answers for one task, reading the payload from `info.<answer_key>`.
    pub fn task_answers(&self, task_id: u64, limit: u32, answer_key: &str) -> Result<Vec<VoteRecord>> {
        let params = [("task_id", task_id.to_string()), ("limit", limit.to_string())];
        let records: Vec<TaskRunRecord> = self.get_json("/api/taskrun", &params)?;
        Ok(records
            .into_iter()
            .map(|record| record.into_vote(answer_key))
            .collect())
    }

    /// Fetch answers for every task, in task order.
    pub fn answers_for(&self, tasks: &[Task], limit: u32, answer_key: &str) -> Result<Vec<Vec<VoteRecord>>> {
        let answers = tasks
            .iter()
            .map(|task| self.task_answers(task.id, limit, answer_key))
            .collect::<Result<Vec<_>>>()?;
        info!(
            tasks = tasks.len(),
            answers = answers.iter().map(Vec::len).sum::<usize>(),
            "fetched answers"
        );
        Ok(answers)
    }

    /// GET a JSON document.
    fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(params).send()?;
        debug!(url = %response.url(), status = %response.status(), "GET");

        if !response.status().is_success() {
            return Err(SurveyError::Status {
                url: response.url().to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}
