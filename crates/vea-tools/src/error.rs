//! Error Types for Tools
//!
//! Failures a tool reports back to the model instead of aborting the request.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolFailure>;

#[derive(Error, Debug)]
pub enum ToolFailure {
    #[error("Cannot divide by zero.")]
    DivideByZero,

    #[error("Cannot perform modulo by zero.")]
    ModuloByZero,

    #[error("{0} environment variable not set")]
    MissingApiKey(&'static str),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}
