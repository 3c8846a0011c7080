use thiserror::Error;

/// Errors raised while turning a patient bundle into a displayable grid
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Invalid resource data: {message}")]
    InvalidResource { message: String },

    #[error("Invalid {field}: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("Search needs a name or a birth date")]
    EmptySearch,

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("No row matches {0}")]
    RowNotFound(String),
}

impl ViewError {
    /// Create a new InvalidResource error
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }

    /// Create a new InvalidField error
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewError>;
