use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access storage slot '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Stored value under '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize value for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("An account with email '{0}' already exists")]
    EmailTaken(String),
    #[error("{0}")]
    Invalid(String),
    #[error("Failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please select a file to upload.")]
    MissingFile,
    #[error("File size exceeds {} limit.", crate::upload::human_size(*limit))]
    FileTooLarge { size: u64, limit: u64 },
    #[error("{0} is required.")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("You must be logged in to do that")]
    NotLoggedIn,
    #[error("User '{0}' no longer exists")]
    UnknownUser(String),
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Summary API key is missing")]
    MissingApiKey,
    #[error("Summary request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Summary service returned HTTP {0}: {1}")]
    HttpStatus(reqwest::StatusCode, String),
    #[error("Malformed summary response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
