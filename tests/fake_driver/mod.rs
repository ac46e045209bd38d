#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sitepdf::driver::{ElementHandle, NavigationDriver, PageFormat, PageScript, SessionId};
use sitepdf::error::DriverError;

pub const LANDING_URL: &str = "https://docs.example.com/book/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeLink {
    pub href: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeElement {
    pub outer_html: String,
    pub children: Vec<String>,
    pub styles: BTreeMap<String, String>,
}

/// Document model keyed by selector string. A selector either names a link
/// list or a single element; descendants are keyed as `"<parent> <child>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeDocument {
    pub links: BTreeMap<String, Vec<FakeLink>>,
    pub elements: BTreeMap<String, FakeElement>,
    pub root_properties: BTreeMap<String, String>,
}

impl FakeDocument {
    pub fn with_element(mut self, selector: &str, outer_html: &str) -> Self {
        self.elements.insert(
            selector.to_owned(),
            FakeElement {
                outer_html: outer_html.to_owned(),
                ..FakeElement::default()
            },
        );
        self
    }

    pub fn with_children(mut self, selector: &str, children: &[&str]) -> Self {
        let element = self.elements.entry(selector.to_owned()).or_default();
        element.children = children.iter().map(|c| (*c).to_owned()).collect();
        self
    }

    pub fn with_links(mut self, selector: &str, links: Vec<FakeLink>) -> Self {
        self.links.insert(selector.to_owned(), links);
        self
    }

    pub fn children(&self, selector: &str) -> Vec<String> {
        self.elements
            .get(selector)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    pub fn has(&self, selector: &str) -> bool {
        self.elements.contains_key(selector)
    }

    fn apply(&mut self, script: &PageScript) -> bool {
        match script {
            PageScript::SetRootProperty { name, value } => {
                self.root_properties.insert(name.clone(), value.clone());
                true
            }
            PageScript::RemoveElement { selector } => {
                let descendant_prefix = format!("{selector} ");
                self.elements
                    .retain(|key, _| !key.starts_with(&descendant_prefix));
                self.elements.remove(selector).is_some()
            }
            PageScript::SetStyle {
                selector,
                property,
                value,
            } => match self.elements.get_mut(selector) {
                Some(element) => {
                    element.styles.insert(property.clone(), value.clone());
                    true
                }
                None => false,
            },
            PageScript::ClearChildren { selector } => {
                if !self.elements.contains_key(selector) {
                    return false;
                }
                let descendant_prefix = format!("{selector} ");
                self.elements
                    .retain(|key, _| !key.starts_with(&descendant_prefix));
                if let Some(element) = self.elements.get_mut(selector) {
                    element.children.clear();
                }
                true
            }
            PageScript::InsertHtml {
                container,
                before,
                html,
            } => {
                let reference_present = before != container && self.elements.contains_key(before);
                match self.elements.get_mut(container) {
                    Some(element) if reference_present => {
                        element.children.insert(0, html.clone());
                        true
                    }
                    Some(element) => {
                        element.children.push(html.clone());
                        true
                    }
                    None => false,
                }
            }
            PageScript::PrependHtml { container, html } => match self.elements.get_mut(container) {
                Some(element) => {
                    element.children.insert(0, html.clone());
                    true
                }
                None => false,
            },
            PageScript::AppendHtml { container, html } => match self.elements.get_mut(container) {
                Some(element) => {
                    element.children.push(html.clone());
                    true
                }
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    NewSession(SessionId),
    CloseSession(SessionId),
    Navigate(SessionId, String),
    Query(SessionId, String),
    Evaluate(SessionId, PageScript),
    Serialize(SessionId, String, usize),
    Render(SessionId, PathBuf, PageFormat),
}

#[derive(Debug, Default)]
struct SessionState {
    url: Option<String>,
    document: FakeDocument,
    closed: bool,
}

#[derive(Debug, Default)]
struct State {
    sessions: BTreeMap<SessionId, SessionState>,
    next_session: u64,
    calls: Vec<Call>,
}

/// In-memory [`NavigationDriver`] serving canned documents by URL.
#[derive(Debug, Default)]
pub struct FakeDriver {
    pages: BTreeMap<String, FakeDocument>,
    timeouts: BTreeSet<String>,
    fail_render: bool,
    state: Mutex<State>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, document: FakeDocument) -> Self {
        self.pages.insert(url.to_owned(), document);
        self
    }

    /// Navigation to `url` times out.
    pub fn with_timeout(mut self, url: &str) -> Self {
        self.timeouts.insert(url.to_owned());
        self
    }

    pub fn with_render_failure(mut self) -> Self {
        self.fail_render = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Document of a session, including sessions that were closed since.
    pub fn document(&self, session: SessionId) -> FakeDocument {
        self.state.lock().unwrap().sessions[&session].document.clone()
    }

    pub fn is_closed(&self, session: SessionId) -> bool {
        self.state.lock().unwrap().sessions[&session].closed
    }

    pub fn sessions_opened(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::NewSession(_)))
            .count()
    }

    pub fn navigations(&self, session: SessionId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Navigate(s, url) if s == session => Some(url),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn with_session<T>(
        &self,
        session: SessionId,
        f: impl FnOnce(&mut SessionState) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let mut state = self.state.lock().unwrap();
        match state.sessions.get_mut(&session) {
            Some(s) if !s.closed => f(s),
            _ => Err(DriverError::UnknownSession(session)),
        }
    }
}

#[async_trait]
impl NavigationDriver for FakeDriver {
    async fn new_session(&self) -> Result<SessionId, DriverError> {
        let session = {
            let mut state = self.state.lock().unwrap();
            state.next_session += 1;
            let session = SessionId(state.next_session);
            state.sessions.insert(session, SessionState::default());
            session
        };
        self.record(Call::NewSession(session));
        Ok(session)
    }

    async fn close_session(&self, session: SessionId) -> Result<(), DriverError> {
        self.record(Call::CloseSession(session));
        self.with_session(session, |s| {
            s.closed = true;
            Ok(())
        })
    }

    async fn navigate(&self, session: SessionId, url: &str) -> Result<(), DriverError> {
        self.record(Call::Navigate(session, url.to_owned()));
        if self.timeouts.contains(url) {
            return Err(DriverError::Timeout {
                operation: "navigate",
                after: Duration::from_secs(60),
            });
        }
        let Some(page) = self.pages.get(url) else {
            return Err(DriverError::Navigation {
                url: url.to_owned(),
                message: "404 not found".to_owned(),
            });
        };
        self.with_session(session, |s| {
            s.url = Some(url.to_owned());
            s.document = page.clone();
            Ok(())
        })
    }

    async fn query(
        &self,
        session: SessionId,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        self.record(Call::Query(session, selector.to_owned()));
        self.with_session(session, |s| {
            if let Some(links) = s.document.links.get(selector) {
                return Ok(links
                    .iter()
                    .enumerate()
                    .map(|(index, link)| ElementHandle {
                        session,
                        selector: selector.to_owned(),
                        index,
                        href: link.href.clone(),
                        text: link.text.clone(),
                    })
                    .collect());
            }
            Ok(s.document
                .elements
                .get(selector)
                .map(|_| ElementHandle {
                    session,
                    selector: selector.to_owned(),
                    index: 0,
                    href: None,
                    text: String::new(),
                })
                .into_iter()
                .collect())
        })
    }

    async fn evaluate(
        &self,
        session: SessionId,
        script: &PageScript,
    ) -> Result<serde_json::Value, DriverError> {
        self.record(Call::Evaluate(session, script.clone()));
        self.with_session(session, |s| {
            Ok(serde_json::Value::Bool(s.document.apply(script)))
        })
    }

    async fn serialize(&self, element: &ElementHandle) -> Result<String, DriverError> {
        self.record(Call::Serialize(
            element.session,
            element.selector.clone(),
            element.index,
        ));
        self.with_session(element.session, |s| {
            s.document
                .elements
                .get(&element.selector)
                .map(|e| e.outer_html.clone())
                .ok_or_else(|| DriverError::StaleElement {
                    selector: element.selector.clone(),
                    index: element.index,
                })
        })
    }

    async fn render_to_file(
        &self,
        session: SessionId,
        path: &Path,
        format: PageFormat,
    ) -> Result<(), DriverError> {
        self.record(Call::Render(session, path.to_path_buf(), format));
        if self.fail_render {
            return Err(DriverError::Render {
                path: path.to_path_buf(),
                message: "printer on fire".to_owned(),
            });
        }
        let rendered = self.with_session(session, |s| {
            Ok(s.document
                .elements
                .values()
                .flat_map(|e| e.children.iter().cloned())
                .collect::<Vec<_>>()
                .join("\n"))
        })?;
        std::fs::write(path, rendered)?;
        Ok(())
    }
}

pub fn link(href: &str, text: &str) -> FakeLink {
    FakeLink {
        href: Some(href.to_owned()),
        text: text.to_owned(),
    }
}

pub fn chapter_url(slug: &str) -> String {
    format!("{LANDING_URL}{slug}.html")
}

/// mdBook-style landing page listing `links` in its sidebar.
pub fn mdbook_landing(links: Vec<FakeLink>) -> FakeDocument {
    FakeDocument::default()
        .with_links("#sidebar .chapter-item a:not(.active)", links)
        .with_element("#content", r#"<div id="content"><main><h1>Welcome</h1></main></div>"#)
        .with_children("#content", &["<main><h1>Welcome</h1></main>"])
        .with_element("#content main", "<main><h1>Welcome</h1></main>")
        .with_element("#sidebar", r#"<nav id="sidebar"></nav>"#)
        .with_element("#menu-bar", r#"<div id="menu-bar"></div>"#)
        .with_element(".nav-wrapper", r#"<nav class="nav-wrapper"></nav>"#)
        .with_element(".page", r#"<div class="page"></div>"#)
}

pub fn chapter_content(title: &str) -> String {
    format!(r#"<div id="content"><main><h1>{title}</h1><p>{title} body.</p></main></div>"#)
}

/// mdBook-style chapter page whose content container holds `title`.
pub fn mdbook_chapter(title: &str) -> FakeDocument {
    FakeDocument::default()
        .with_element("#content", &chapter_content(title))
        .with_element(".page", r#"<div class="page"></div>"#)
}

/// Chapter page built by a theme the profile does not fit.
pub fn chapter_without_content() -> FakeDocument {
    FakeDocument::default()
        .with_element("article", "<article>elsewhere</article>")
        .with_element(".page", r#"<div class="page"></div>"#)
}
