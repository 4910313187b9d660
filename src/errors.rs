use std::fmt;

use reqwest::StatusCode;

use crate::transport::TransportError;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Http(reqwest::Error),
    Transport(TransportError),
    Config(String),
    Credentials(String),
    InvalidParams(String),
    MissingRefreshToken,
    RefreshAborted,
}

impl Error {
    /// Status code of the response behind this error, when the transport got one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Transport(TransportError::Status(resp)) => Some(resp.status),
            Error::Http(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::Http(err) => write!(f, "http error: {err}"),
            Error::Transport(err) => write!(f, "transport error: {err}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Credentials(msg) => write!(f, "credential store error: {msg}"),
            Error::InvalidParams(msg) => write!(f, "invalid authentication params: {msg}"),
            Error::MissingRefreshToken => write!(f, "no refresh token available"),
            Error::RefreshAborted => write!(f, "token refresh aborted before completion"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Http(err) => Some(err),
            Error::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Transport(err)
    }
}
