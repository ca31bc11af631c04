//! Domain error types.

/// Top-level error type for tradebook.
///
/// Validation and authorization failures carry the entity and field/id they
/// refer to so callers can render an actionable message.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("invalid {entity} {field}: {reason}")]
    Validation {
        entity: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} {id} belongs to another user")]
    Authorization { entity: &'static str, id: i64 },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl JournalError {
    pub fn validation(
        entity: &'static str,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        JournalError::Validation {
            entity,
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        JournalError::NotFound { entity, id }
    }

    pub fn storage(reason: impl std::fmt::Display) -> Self {
        JournalError::Storage {
            reason: reason.to_string(),
        }
    }
}

impl From<&JournalError> for std::process::ExitCode {
    fn from(err: &JournalError) -> Self {
        let code: u8 = match err {
            JournalError::Io(_) | JournalError::Json(_) => 1,
            JournalError::ConfigParse { .. }
            | JournalError::ConfigMissing { .. }
            | JournalError::ConfigInvalid { .. } => 2,
            JournalError::Storage { .. } => 3,
            JournalError::Validation { .. } => 4,
            JournalError::NotFound { .. } | JournalError::Authorization { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
