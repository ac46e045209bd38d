use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::driver::SessionId;

/// Failure reported by a [`crate::driver::NavigationDriver`] implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("unknown driver session: {0}")]
    UnknownSession(SessionId),

    #[error("could not open driver session: {message}")]
    SessionStart { message: String },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{operation} failed: {message}")]
    Protocol {
        operation: &'static str,
        message: String,
    },

    #[error("page script returned an unexpected value: {message}")]
    ScriptResult { message: String },

    #[error("element #{index} matching {selector:?} is no longer in the document")]
    StaleElement { selector: String, index: usize },

    #[error("render to {} failed: {message}", .path.display())]
    Render { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal pipeline outcomes. Anything not listed here is absorbed at the
/// component that observed it and only changes the shape of the output.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("site profile {profile:?} is malformed: selector `{key}` must be a non-empty string")]
    MalformedProfile { profile: String, key: &'static str },

    #[error(
        "chapter link selector {selector:?} matched no links on {url}; \
         profile {profile:?} does not fit this site"
    )]
    NoChapters {
        profile: String,
        selector: String,
        url: String,
    },

    #[error(
        "content container {selector:?} is missing on the landing page {url}; \
         there is nowhere to assemble chapters"
    )]
    MissingContentContainer { selector: String, url: String },

    #[error("navigation to {url} failed")]
    Navigation {
        url: String,
        #[source]
        source: DriverError,
    },

    #[error("{operation} failed")]
    Driver {
        operation: &'static str,
        #[source]
        source: DriverError,
    },

    #[error("write output {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Configuration errors mean the selected profile does not describe the
    /// target site; they surface before any chapter is fetched or rendered.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MalformedProfile { .. }
                | Self::NoChapters { .. }
                | Self::MissingContentContainer { .. }
        )
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::Navigation { .. })
    }

    pub(crate) fn driver(operation: &'static str) -> impl FnOnce(DriverError) -> Self {
        move |source| Self::Driver { operation, source }
    }

    pub(crate) fn navigation(url: &str) -> impl FnOnce(DriverError) -> Self + '_ {
        move |source| Self::Navigation {
            url: url.to_owned(),
            source,
        }
    }
}
