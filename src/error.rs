use thiserror::Error;

#[derive(Error, Debug)]
pub enum DnupError {
    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Process execution failed: {0}")]
    ProcessExecution(String),

    #[error("XML parsing failed: {0}")]
    XmlParsing(String),

    #[error("Package resolution failed: {0}")]
    PackageResolution(String),

    #[error("Git operation failed: {0}")]
    GitOperation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DnupError>;
