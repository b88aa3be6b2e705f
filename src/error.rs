use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration file not found in '{0}'")]
    NotFound(PathBuf),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("unable to reach the collection store: {0}")]
    Store(#[from] StoreError),
}

/// Failures of the persistence layer. These are never shown to clients verbatim.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    BsonSerialization(#[from] bson::ser::Error),
    #[error(transparent)]
    BsonDeserialization(#[from] bson::de::Error),
    #[error(transparent)]
    BsonAccess(#[from] bson::document::ValueAccessError),
}

/// Domain errors produced by the collection service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid value for field {field}: {detail}")]
    InvalidField { field: &'static str, detail: String },
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Collection not found")]
    CollectionNotFound(String),
    #[error("Submission not found")]
    SubmissionNotFound(String),
    #[error("Collection with this username already exists. Please try different details.")]
    DuplicateCollection(String),
    #[error("A submission for team serial {0} already exists")]
    DuplicateTeamSerial(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Short machine readable reason, stable across message wording changes.
    pub fn reason(&self) -> &'static str {
        match self {
            ServiceError::MissingField(_) => "missing_field",
            ServiceError::InvalidField { .. } => "invalid_field",
            ServiceError::InvalidPassword => "invalid_password",
            ServiceError::CollectionNotFound(_) => "collection_not_found",
            ServiceError::SubmissionNotFound(_) => "submission_not_found",
            ServiceError::DuplicateCollection(_) => "duplicate_collection",
            ServiceError::DuplicateTeamSerial(_) => "duplicate_team_serial",
            ServiceError::Store(_) => "internal",
        }
    }
}
