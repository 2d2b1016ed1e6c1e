//! Error taxonomy shared by the gateways and synchronizers.
use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::AuthErrorKind;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The request never reached the remote or no response came back.
    #[error("network error: {0}")]
    Network(String),
    /// The provider or the document store answered with a non-success status.
    #[error("upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },
    /// The document store rejected the call because of its access rules.
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("genres have not been loaded yet")]
    GenresNotLoaded,
    #[error("no signed-in user")]
    NotSignedIn,
    #[error("{}", .0.user_message())]
    Auth(AuthErrorKind),
}

impl SyncError {
    /// Short machine-friendly discriminator used on the error channel.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Network(_) => "network",
            SyncError::Upstream { .. } => "upstream",
            SyncError::Permission(_) => "permission",
            SyncError::NotFound(_) => "not_found",
            SyncError::Decode(_) => "decode",
            SyncError::GenresNotLoaded => "genres_not_loaded",
            SyncError::NotSignedIn => "not_signed_in",
            SyncError::Auth(_) => "auth",
        }
    }

    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::FORBIDDEN => SyncError::Permission(body.to_string()),
            StatusCode::NOT_FOUND => SyncError::NotFound(body.to_string()),
            _ => SyncError::Upstream {
                status: status.as_u16(),
                message: body.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for SyncError {
    /// Drops the request URL: every client passes its key in the query string.
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        match err.status() {
            Some(status) => SyncError::Upstream {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None if err.is_decode() => SyncError::Decode(err.to_string()),
            None => SyncError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}
