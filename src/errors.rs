/// Stackdiff error types
///
/// The taxonomy matters to callers: `User` means the command line itself was
/// wrong and nothing was mutated; `Operation` means a mutating sequence
/// failed partway (the orchestrator restores state before propagating it);
/// `Tool` means an external binary was missing or a read-only query failed;
/// `Invariant` signals a logic/data inconsistency and is never retried.
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    /// Bad indicator, wrong branch, missing arguments
    #[error("{0}")]
    User(String),

    /// A mutating sequence failed (conflict, rejected push or PR)
    #[error("operation failed: {0}")]
    Operation(String),

    /// Missing binary or failed read-only query, with captured output
    #[error("external tool failure: {0}")]
    Tool(String),

    /// Duplicate branch name, rebase plan inconsistency
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StackError {
    pub fn user<S: Into<String>>(msg: S) -> Self {
        StackError::User(msg.into())
    }

    pub fn operation<S: Into<String>>(msg: S) -> Self {
        StackError::Operation(msg.into())
    }

    pub fn tool<S: Into<String>>(msg: S) -> Self {
        StackError::Tool(msg.into())
    }

    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        StackError::Invariant(msg.into())
    }

    /// Process exit code for this error class
    pub fn exit_code(&self) -> i32 {
        match self {
            StackError::User(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, StackError>;
