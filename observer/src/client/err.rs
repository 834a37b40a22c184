use err_derive::Error;
use std::fmt::Debug;

/// Message shown when a request fails without a usable error body.
pub const GENERIC_FAILURE: &str = "Failed to load";

#[derive(Debug, Error)]
pub enum ApiErr {
    #[error(display = "Web request error: {}", _0)]
    Request(#[error(source)] reqwest::Error),

    #[error(display = "JSON error: {}", _0)]
    Json(#[error(source)] serde_json::Error),

    #[error(display = "Server responded {}: {}", status, message)]
    Status {
        status: u16,
        message: String,
    },

    #[error(display = "Submission {} does not exist", _0)]
    NotFound(String),

    #[error(display = "Not logged in")]
    NotLoggedIn,

    #[error(display = "Configuration error: {}", _0)]
    Config(#[error(source)] ConfigErr),

    #[error(display = "Refusing to submit empty code")]
    EmptyCode,

    #[error(display = "{:#}", _0)]
    Any(anyhow::Error),
}

impl ApiErr {
    /// The message a user should see for this error. Backend-provided messages
    /// are passed through as-is.
    pub fn user_message(&self) -> String {
        match self {
            ApiErr::Status { message, .. } if !message.is_empty() => message.clone(),
            ApiErr::NotFound(id) => format!("Submission {} does not exist", id),
            ApiErr::NotLoggedIn => "Not logged in".into(),
            ApiErr::EmptyCode => "Please enter some code".into(),
            _ => GENERIC_FAILURE.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiErr::NotFound(_))
    }
}

impl From<anyhow::Error> for ApiErr {
    fn from(e: anyhow::Error) -> Self {
        if e.chain().count() > 1 {
            tracing::warn!(
                "Context may be stripped during downcast. Logging error here:\n{:#}",
                e
            );
        }
        match e.downcast::<reqwest::Error>() {
            Ok(e) => ApiErr::Request(e),
            Err(e) => ApiErr::Any(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigErr {
    #[error(display = "IO error: {}", _0)]
    Io(#[error(source)] std::io::Error),

    #[error(display = "TOML deserialization error: {}", _0)]
    TomlDes(#[error(source)] toml::de::Error),

    #[error(display = "TOML serialization error: {}", _0)]
    TomlSer(#[error(source)] toml::ser::Error),

    #[error(display = "Cannot determine the configuration directory")]
    NoConfigDir,

    #[error(display = "Invalid backend host `{}`: {}", host, reason)]
    BadHost { host: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ClipboardErr {
    #[error(display = "IO error: {}", _0)]
    Io(#[error(source)] std::io::Error),

    #[error(display = "No clipboard tool available")]
    NoTool,

    #[error(display = "Clipboard tool failed: {}", _0)]
    Failed(String),
}
