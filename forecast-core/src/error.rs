use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a failed run, mirroring where in the pipeline it
/// went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Transport,
    Payload,
    Emission,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid {parameter}: {reason}")]
    Input {
        parameter: &'static str,
        reason: String,
    },

    #[error("request to {endpoint} failed")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} responded with status {status}: {body}")]
    UpstreamStatus {
        endpoint: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed {endpoint} payload: {reason}")]
    Payload { endpoint: String, reason: String },

    #[error("failed to write {}", path.display())]
    Emission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render {what}: {reason}")]
    Template { what: &'static str, reason: String },
}

impl SnapshotError {
    pub fn input(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::Input {
            parameter,
            reason: reason.into(),
        }
    }

    pub fn payload(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Payload {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn emission(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Emission {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapshotError::Input { .. } => ErrorKind::Input,
            SnapshotError::Transport { .. } | SnapshotError::UpstreamStatus { .. } => {
                ErrorKind::Transport
            }
            SnapshotError::Payload { .. } => ErrorKind::Payload,
            SnapshotError::Emission { .. } | SnapshotError::Template { .. } => {
                ErrorKind::Emission
            }
        }
    }
}

pub type Result<T, E = SnapshotError> = std::result::Result<T, E>;
