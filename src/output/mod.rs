//! Output module
//!
//! Turns a [`RouteTarget`](crate::routing::RouteTarget) into a response:
//! raw files (with minified variants in live deployments), cached templates,
//! structure pages and handler functions.

pub mod file;
mod resolver;

use hyper::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::template::TemplateError;

pub use resolver::{
    complete, render_handler_output, render_structure, render_structure_list, render_template,
    STRUCTURE_KEY,
};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read '{}': {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timed out loading '{}'", .0.display())]
    Timeout(PathBuf),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl OutputError {
    /// Status code sent to the client for this failure
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ReadFailure { .. } | Self::Timeout(_) | Self::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
