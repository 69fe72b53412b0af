use hyper::http;
use std::{fmt::Display, io, sync};

#[derive(Debug)]
pub enum Error {
    AlreadyDispatched(String),
    DuplicateHook(String),
    RunNotComplete(usize),
    InvalidMethod(String),
    InvalidHeaderName,
    InvalidHeaderValue,
    InvalidUri(String),
    InvalidConfiguration(String),
    PoisonedLock,
    IoError(io::Error),
    HyperError(hyper::Error),
    HttpError(http::Error),
}

impl Error {
    /// Whether the error comes from a wrongly declared chain rather than from the target.
    pub fn is_protocol_misuse(&self) -> bool {
        matches!(
            self,
            Error::AlreadyDispatched(_)
                | Error::DuplicateHook(_)
                | Error::RunNotComplete(_)
                | Error::InvalidMethod(_)
                | Error::InvalidHeaderName
                | Error::InvalidHeaderValue
                | Error::InvalidUri(_)
        )
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::AlreadyDispatched(name) => {
                write!(f, "Request '{}' has already been dispatched", name)
            }
            Error::DuplicateHook(name) => {
                write!(f, "Request '{}' has more than one continuation hook", name)
            }
            Error::RunNotComplete(outstanding) => write!(
                f,
                "The run is not complete: {} request(s) still outstanding",
                outstanding
            ),
            Error::InvalidMethod(method) => write!(f, "Invalid HTTP method: {}", method),
            Error::InvalidHeaderName => write!(f, "Invalid header name"),
            Error::InvalidHeaderValue => write!(f, "Invalid header value"),
            Error::InvalidUri(uri) => write!(f, "Invalid URI: {}", uri),
            Error::InvalidConfiguration(reason) => write!(f, "Invalid configuration: {}", reason),
            Error::PoisonedLock => write!(f, "The lock was poisoned"),
            Error::IoError(e) => write!(f, "IoError: {}", e),
            Error::HyperError(e) => write!(f, "Hyper error: {}", e),
            Error::HttpError(e) => write!(f, "Http Error: {}", e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e)
    }
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(_: sync::PoisonError<T>) -> Self {
        Error::PoisonedLock
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Error::HyperError(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::HttpError(e)
    }
}
