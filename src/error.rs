use thiserror::Error;

pub type ChartResult<T> = Result<T, BindingError>;

#[derive(Debug, Error)]
pub enum BindingError {
    /// A script-bound field could not be turned into a live column.
    #[error("script field '{field}' could not be resolved from '{script}': {reason}")]
    ScriptField {
        field: String,
        script: String,
        reason: String,
    },

    #[error("undefined parameter '${0}'")]
    UndefinedParameter(String),

    #[error("failed to parse binding: {0}")]
    Parse(String),

    #[error("invalid schema for '{query}': {reason}")]
    Schema { query: String, reason: String },

    #[error("binding lock poisoned")]
    LockPoisoned,
}
