use thiserror::Error;

use crate::models::Phase;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Message(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image decode/encode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("svg error: {0}")]
    Svg(#[from] usvg::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    /// The remote service answered but carried no usable payload.
    #[error("{0}")]
    Generation(String),
    /// No access credential is available and none can be obtained.
    #[error("{0}")]
    Credential(String),
    #[error("{0}")]
    Validation(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("cannot {action} while {phase}")]
    InvalidTransition { action: &'static str, phase: Phase },
    #[error("operation cancelled")]
    Cancelled,
}

impl AppError {
    pub fn msg<T: Into<String>>(message: T) -> Self {
        Self::Message(message.into())
    }

    pub fn generation<T: Into<String>>(message: T) -> Self {
        Self::Generation(message.into())
    }

    pub fn credential<T: Into<String>>(message: T) -> Self {
        Self::Credential(message.into())
    }

    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    pub fn render<T: Into<String>>(message: T) -> Self {
        Self::Render(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
