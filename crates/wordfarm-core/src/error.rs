use thiserror::Error;

pub type WallResult<T> = anyhow::Result<T>;

#[derive(Error, Debug)]
pub enum WallError {
    /// An append, extend or delete call was rejected by the store.
    #[error("Write failed: {msg}")]
    WriteFailure { msg: String },
    /// The attached image could not be uploaded; nothing was written.
    #[error("Upload failed: {msg}")]
    UploadFailure { msg: String },
    /// The live feed stopped delivering snapshots.
    #[error("Subscription failed: {msg}")]
    SubscriptionFailure { msg: String },
    /// Only the author of a post may delete it.
    #[error("Post can only be deleted by its author")]
    NotAuthor,
    /// The requested/specified ID does not exist.
    #[error("Post does not exist with the given ID")]
    InvalidId,
    /// A record delivered by the store lacks a required field.
    #[error("Post record is missing the '{field}' field")]
    MissingField { field: &'static str },
    /// A post needs text, an image, or both.
    #[error("Post cannot be empty")]
    EmptyPost,
    /// A previous submission has not resolved yet.
    #[error("A write is already in progress")]
    WriteInProgress,
    /// No caller identity is available yet.
    #[error("Submissions are disabled until an identity is available")]
    SubmissionsDisabled,
    #[error("Config error: {msg}")]
    ConfigError { msg: String },
    /// Custom Error type for errors not covered by the above errors.
    #[error("{msg}")]
    CustomError { msg: String },
}

impl WallError {
    pub fn write_failure(msg: impl Into<String>) -> Self {
        Self::WriteFailure { msg: msg.into() }
    }

    pub fn upload_failure(msg: impl Into<String>) -> Self {
        Self::UploadFailure { msg: msg.into() }
    }

    pub fn subscription_failure(msg: impl Into<String>) -> Self {
        Self::SubscriptionFailure { msg: msg.into() }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError { msg: msg.into() }
    }

    pub fn custom_error(msg: String) -> Self {
        Self::CustomError { msg }
    }
}
