use crate::calendar::CalendarError;
use crate::recurrence::RecurrenceError;
use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("category not found: {0}")]
    UnknownCategory(i64),
    #[error("category already exists: {0}")]
    DuplicateCategory(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),
    #[error("corrupt row for {field}: {value:?}")]
    CorruptRow { field: &'static str, value: String },
}

/// Errors a tool handler hands back to the JSON-RPC layer.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidParams(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ToolError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        ToolError::InvalidParams(message.into())
    }

    pub fn code(&self) -> i64 {
        match self {
            ToolError::InvalidParams(_) | ToolError::Validation(_) | ToolError::Calendar(_) => -32602,
            ToolError::Store(StoreError::NotFound(_))
            | ToolError::Store(StoreError::UnknownCategory(_))
            | ToolError::Store(StoreError::DuplicateCategory(_))
            | ToolError::Store(StoreError::InvalidInput(_))
            | ToolError::Store(StoreError::Recurrence(_)) => -32602,
            ToolError::Store(_) => -32603,
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::InvalidParams(err.to_string())
    }
}
