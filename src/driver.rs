//! Narrow capability interface over a browser automation endpoint.
//!
//! The pipeline only ever talks to [`NavigationDriver`]; the Chrome-backed
//! implementation lives in [`crate::chrome`] and tests substitute an
//! in-memory double serving canned documents.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use crate::error::DriverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A matched element, addressed by selector and position among the matches.
///
/// `href` and `text` are snapshots taken when the query ran: `href` is the
/// resolved link target when the element exposes one, `text` is its raw
/// text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub session: SessionId,
    pub selector: String,
    pub index: usize,
    pub href: Option<String>,
    pub text: String,
}

/// Document reads and mutations the pipeline may ask a driver to run.
///
/// Every script evaluates to a JSON boolean telling whether its target
/// element was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageScript {
    /// Set a CSS custom property on the root element.
    SetRootProperty { name: String, value: String },
    /// Remove the first element matching `selector`.
    RemoveElement { selector: String },
    /// Set an inline style property on the first match.
    SetStyle {
        selector: String,
        property: String,
        value: String,
    },
    /// Drop every child of the first match.
    ClearChildren { selector: String },
    /// Insert `html` into `container` before the first element matching
    /// `before`, or at the end of `container` when there is no such element.
    InsertHtml {
        container: String,
        before: String,
        html: String,
    },
    /// Insert `html` at the start of `container`.
    PrependHtml { container: String, html: String },
    /// Insert `html` at the end of `container`.
    AppendHtml { container: String, html: String },
}

impl PageScript {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetRootProperty { .. } => "set_root_property",
            Self::RemoveElement { .. } => "remove_element",
            Self::SetStyle { .. } => "set_style",
            Self::ClearChildren { .. } => "clear_children",
            Self::InsertHtml { .. } => "insert_html",
            Self::PrependHtml { .. } => "prepend_html",
            Self::AppendHtml { .. } => "append_html",
        }
    }
}

/// Reads the "target found" flag every [`PageScript`] returns.
pub fn script_applied(value: &serde_json::Value) -> Result<bool, DriverError> {
    value.as_bool().ok_or_else(|| DriverError::ScriptResult {
        message: format!("expected boolean, got {value}"),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
}

impl PageFormat {
    /// Paper width and height in inches.
    pub fn paper_size_inches(self) -> (f64, f64) {
        match self {
            Self::A4 => (8.27, 11.69),
            Self::Letter => (8.5, 11.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::Letter => "Letter",
        }
    }
}

/// Browser automation capability consumed by the pipeline.
///
/// Implementations must complete each call before returning; the pipeline
/// never issues two calls concurrently.
#[async_trait]
pub trait NavigationDriver: Send + Sync {
    async fn new_session(&self) -> Result<SessionId, DriverError>;

    async fn close_session(&self, session: SessionId) -> Result<(), DriverError>;

    /// Loads `url` and returns once the document is ready for queries.
    async fn navigate(&self, session: SessionId, url: &str) -> Result<(), DriverError>;

    /// All elements matching `selector`, in document order.
    async fn query(
        &self,
        session: SessionId,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, DriverError>;

    async fn evaluate(
        &self,
        session: SessionId,
        script: &PageScript,
    ) -> Result<serde_json::Value, DriverError>;

    /// Full outer markup of `element`, including its own tag.
    async fn serialize(&self, element: &ElementHandle) -> Result<String, DriverError>;

    async fn render_to_file(
        &self,
        session: SessionId,
        path: &Path,
        format: PageFormat,
    ) -> Result<(), DriverError>;
}
