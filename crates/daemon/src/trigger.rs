use reqwest::{Client, StatusCode};
use slog::{debug, info, Logger};
use std::time::Duration;

/// Maintenance actions the registry exposes on its registration endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Append one history sample per station type
    GetCounts,
    /// Rebuild `index.html` and `stations.json`
    GenerateHtml,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GetCounts => "getcounts",
            Action::GenerateHtml => "genhtml",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TriggerError {
    #[error("request for {action} failed: {source}")]
    Request {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("registry rejected {action} ({status}): {message}")]
    Rejected {
        action: &'static str,
        status: u16,
        message: String,
    },
    #[error("registry sent an unrecognized reply to {action} ({status}): {first_line}")]
    Unrecognized {
        action: &'static str,
        status: u16,
        first_line: String,
    },
}

pub struct RegistryClient {
    logger: Logger,
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(
        logger: Logger,
        base_url: String,
        user_agent: String,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            logger,
            client,
            base_url,
        })
    }

    pub fn action_url(&self, action: Action) -> String {
        format!("{}/register?action={}", self.base_url, action.as_str())
    }

    /// Ask the registry to run `action` once. Returns the detail lines that
    /// follow the `OK` status line.
    pub async fn trigger(&self, action: Action) -> Result<Vec<String>, TriggerError> {
        let url = self.action_url(action);
        debug!(self.logger, "requesting {}", url);

        let request_err = |source| TriggerError::Request {
            action: action.as_str(),
            source,
        };
        let response = self.client.get(&url).send().await.map_err(request_err)?;
        let status = response.status();
        let body = response.text().await.map_err(request_err)?;

        let details = check_reply(action, status, &body)?;
        info!(self.logger, "{} finished", action.as_str(); "status" => status.as_u16());
        Ok(details)
    }

    /// Record counts first so the listing and history agree on the same run.
    pub async fn run_once(&self) -> Result<(), TriggerError> {
        for line in self.trigger(Action::GetCounts).await? {
            info!(self.logger, "counts {}", line);
        }
        self.trigger(Action::GenerateHtml).await?;
        Ok(())
    }
}

/// Interpret a registry reply. The first body line starts with `OK` or `FAIL`.
pub fn check_reply(
    action: Action,
    status: StatusCode,
    body: &str,
) -> Result<Vec<String>, TriggerError> {
    let mut lines = body.lines();
    let first_line = lines.next().unwrap_or_default().trim();
    let details = lines.map(str::to_string).collect();

    match first_line.split_once(' ').map_or(first_line, |(word, _)| word) {
        "OK" if status.is_success() => Ok(details),
        "FAIL" => Err(TriggerError::Rejected {
            action: action.as_str(),
            status: status.as_u16(),
            message: first_line.trim_start_matches("FAIL").trim().to_string(),
        }),
        _ => Err(TriggerError::Unrecognized {
            action: action.as_str(),
            status: status.as_u16(),
            first_line: first_line.to_string(),
        }),
    }
}
