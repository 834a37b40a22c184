use super::{
    err::ConfigErr,
    model::{HistoryScope, SubmissionId},
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host (and port) of the judge backend, without scheme
    pub host: String,
    pub ssl: bool,
    /// Value of the `JSESSIONID` cookie, if logged in
    pub session: Option<String>,
    pub poll: PollConfig,
    pub render: RenderConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "localhost:8080".into(),
            ssl: false,
            session: None,
            poll: Default::default(),
            render: Default::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Interval between two poll cycles, in milliseconds.
    pub interval_ms: u64,
    /// How long newly appended result rows stay highlighted, in milliseconds.
    pub highlight_ms: u64,
    /// Give up polling a submission that is still not finished after this
    /// many seconds. `0` polls forever.
    pub max_wait_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval_ms: 500,
            highlight_ms: 2000,
            max_wait_secs: 30 * 60,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Payloads with at least this many characters are laid out in the
    /// background instead of inline.
    pub defer_threshold: usize,
    /// Delay between showing the loading indicator and starting the layout
    /// of a large payload, in milliseconds.
    pub settle_delay_ms: u64,
    pub tab_width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            defer_threshold: 20_000,
            settle_delay_ms: 50,
            tab_width: 4,
        }
    }
}

impl RenderConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl ClientConfig {
    /// Default location of the configuration file, `<config dir>/ssoj/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigErr> {
        let mut path = dirs::config_dir().ok_or(ConfigErr::NoConfigDir)?;
        path.push("ssoj");
        path.push(CONFIG_FILE_NAME);
        Ok(path)
    }

    /// Read config from `path`. A missing file yields the default config.
    pub async fn load(path: &Path) -> Result<ClientConfig, ConfigErr> {
        match tokio::fs::read(path).await {
            Ok(data) => {
                tracing::debug!("Reading config from {}", path.display());
                Ok(toml::from_slice(&data)?)
            }
            Err(e) => match e.kind() {
                std::io::ErrorKind::NotFound => {
                    tracing::debug!("No config at {}, using defaults", path.display());
                    Ok(ClientConfig::default())
                }
                _ => Err(e.into()),
            },
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), ConfigErr> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let serialized = toml::to_string_pretty(self)?;
        tokio::fs::write(path, serialized).await?;
        Ok(())
    }

    fn base(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}", scheme, self.host.trim_end_matches('/'))
    }

    /// `base` joined with `segments`, each escaped as a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ConfigErr> {
        let base = self.base();
        let bad_host = |reason: String| ConfigErr::BadHost {
            host: self.host.clone(),
            reason,
        };
        let mut url = Url::parse(&base).map_err(|e| bad_host(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| bad_host("cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn submission_endpoint(&self, id: &SubmissionId) -> Result<Url, ConfigErr> {
        self.endpoint(&["api", "submission", id.as_str()])
    }

    pub fn result_endpoint(&self, id: &SubmissionId) -> Result<Url, ConfigErr> {
        self.endpoint(&["api", "result", "submission", id.as_str()])
    }

    pub fn submit_endpoint(&self) -> Result<Url, ConfigErr> {
        self.endpoint(&["api", "submission", "submit"])
    }

    pub fn latest_endpoint(&self) -> Result<Url, ConfigErr> {
        self.endpoint(&["api", "submission", "latest"])
    }

    /// Submission history: the most recent overall, or those of one user or
    /// problem.
    pub fn history_endpoint(&self, scope: &HistoryScope) -> Result<Url, ConfigErr> {
        match scope {
            HistoryScope::Recent => self.endpoint(&["api", "submission", "recent"]),
            HistoryScope::User(id) => self.endpoint(&["api", "submission", "user", &id.to_string()]),
            HistoryScope::Problem(id) => {
                self.endpoint(&["api", "submission", "problem", &id.to_string()])
            }
        }
    }

    pub fn problem_list_endpoint(&self) -> Result<Url, ConfigErr> {
        self.endpoint(&["api", "problem", "list"])
    }

    pub fn problem_search_endpoint(&self) -> Result<Url, ConfigErr> {
        self.endpoint(&["api", "problem", "search"])
    }

    pub fn solved_endpoint(&self) -> Result<Url, ConfigErr> {
        self.endpoint(&["api", "user", "solved-problems"])
    }

    pub fn login_endpoint(&self) -> Result<Url, ConfigErr> {
        self.endpoint(&["api", "user", "login"])
    }
}
