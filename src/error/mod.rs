use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{tool} not found at '{path}'")]
    ToolUnavailable {
        tool: String,
        path: String,
    },

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Install error: {0}")]
    Install(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("'{command}' timed out after {seconds}s")]
    Timeout {
        command: String,
        seconds: u64,
    },

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn error_code(&self) -> &'static str {
        match self {
            HarnessError::Configuration(_) | HarnessError::ManifestNotFound(_) => "CONFIGURATION",
            HarnessError::ToolUnavailable { .. } => "TOOL_UNAVAILABLE",
            HarnessError::Resolution(_) => "RESOLUTION",
            HarnessError::Install(_) => "INSTALL",
            HarnessError::Execution(_) => "EXECUTION",
            HarnessError::Timeout { .. } => "TIMEOUT",
            HarnessError::Corpus(_) => "CORPUS",
            HarnessError::Io(_) | HarnessError::Yaml(_) | HarnessError::Json(_) => "IO",
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            HarnessError::ToolUnavailable { tool, .. } if tool == "git" => {
                Some("Try specifying its location using --git <path>.".to_string())
            }
            HarnessError::ToolUnavailable { tool, .. } => {
                Some(format!("Try specifying its location using --tool {}=<path>.", tool))
            }
            HarnessError::Timeout { .. } => {
                Some("Raise the limit with --timeout or the manifest's timeouts section.".to_string())
            }
            HarnessError::Configuration(msg) if msg.contains("No installer") => {
                Some("Run with --list to see the implementations that can be built.".to_string())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
