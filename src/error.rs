//! Crate error type.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum DispatchError {
    Io(io::Error),
    Http(reqwest::Error),
    /// An external solver executable could not be found or did not answer.
    SolverUnavailable(String),
    InvalidConfig(String),
    ProcessFailure(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Io(err) => write!(f, "i/o error: {}", err),
            DispatchError::Http(err) => write!(f, "http error: {}", err),
            DispatchError::SolverUnavailable(name) => write!(f, "solver unavailable: {}", name),
            DispatchError::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            DispatchError::ProcessFailure(reason) => write!(f, "process failure: {}", reason),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Io(err) => Some(err),
            DispatchError::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DispatchError {
    fn from(err: io::Error) -> Self {
        DispatchError::Io(err)
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        DispatchError::Http(err)
    }
}
