#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TodotuiError {
    #[error("not signed in - run 'todotui login' first")]
    NotSignedIn,

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },

    #[error("no task with id {0}")]
    TaskNotFound(i64),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Closed error taxonomy for the transport boundary. UI and tests branch on
/// the kind; the raw response body is preserved in `ApiError::message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    Validation,
    NotFound,
    Conflict,
    Transport,
    Unknown,
}

impl ApiErrorKind {
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            400 | 422 => Self::Validation,
            404 => Self::NotFound,
            409 => Self::Conflict,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Validation => "invalid request",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::Transport => "network error",
            Self::Unknown => "server error",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{}: {message}", kind.label())]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn from_response(status: u16, body: String) -> Self {
        Self {
            kind: ApiErrorKind::from_status(status),
            status: Some(status),
            message: body,
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Transport,
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Validation,
            status: None,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping_covers_the_taxonomy() {
        assert_eq!(ApiErrorKind::from_status(401), ApiErrorKind::Unauthorized);
        assert_eq!(ApiErrorKind::from_status(403), ApiErrorKind::Unauthorized);
        assert_eq!(ApiErrorKind::from_status(400), ApiErrorKind::Validation);
        assert_eq!(ApiErrorKind::from_status(422), ApiErrorKind::Validation);
        assert_eq!(ApiErrorKind::from_status(404), ApiErrorKind::NotFound);
        assert_eq!(ApiErrorKind::from_status(409), ApiErrorKind::Conflict);
        assert_eq!(ApiErrorKind::from_status(500), ApiErrorKind::Unknown);
        assert_eq!(ApiErrorKind::from_status(502), ApiErrorKind::Unknown);
    }

    #[test]
    fn response_error_keeps_raw_body() {
        let err = ApiError::from_response(404, "Task not found".to_owned());
        assert_eq!(err.kind, ApiErrorKind::NotFound);
        assert_eq!(err.status, Some(404));
        assert_eq!(err.message, "Task not found");
        assert_eq!(err.to_string(), "not found: Task not found");
    }
}
