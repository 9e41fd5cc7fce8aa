use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurriculumError>;

#[derive(Error, Debug)]
pub enum CurriculumError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    ConfigFormat(String),

    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("curriculum run failed: {0}")]
    Runtime(String),
}

impl CurriculumError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    pub fn validation(messages: Vec<String>) -> Self {
        Self::Validation(messages)
    }
}

impl From<toml::de::Error> for CurriculumError {
    fn from(value: toml::de::Error) -> Self {
        CurriculumError::ConfigFormat(value.to_string())
    }
}

impl From<serde_json::Error> for CurriculumError {
    fn from(value: serde_json::Error) -> Self {
        CurriculumError::ConfigFormat(value.to_string())
    }
}
