use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("Please enter a video URL")]
    MissingUrl,
    #[error("End time must be after start time.")]
    InvalidDuration,
    #[error("Download failed: {0}")]
    Download(String),
    #[error("Failed to create clip: {0}")]
    Clip(String),
    #[error("Working directory error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Clip task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ClipError {
    pub fn status(&self) -> StatusCode {
        match self {
            ClipError::MissingUrl | ClipError::InvalidDuration => StatusCode::BAD_REQUEST,
            ClipError::Download(_) | ClipError::Clip(_) => StatusCode::BAD_GATEWAY,
            ClipError::Io(_) | ClipError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ClipError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
