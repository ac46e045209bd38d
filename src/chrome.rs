//! [`NavigationDriver`] backed by a local headless Chrome over CDP.
//!
//! `headless_chrome` is a blocking client, so every call runs on the blocking
//! pool and is bounded by [`BrowserConfig::call_timeout`]. A stalled page
//! surfaces as [`DriverError::Timeout`] instead of hanging the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;

use crate::cli::BrowserArgs;
use crate::driver::{ElementHandle, NavigationDriver, PageFormat, PageScript, SessionId};
use crate::error::DriverError;

pub const CHROME_PATH_ENV: &str = "SITEPDF_CHROME";

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Chrome executable; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
    pub sandbox: bool,
    /// Upper bound for any single remote call.
    pub call_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1280, 1024),
            chrome_path: None,
            sandbox: true,
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl BrowserConfig {
    pub fn from_args(args: &BrowserArgs) -> Self {
        Self {
            headless: !args.headful,
            chrome_path: args.chrome.as_deref().map(PathBuf::from),
            sandbox: !args.no_sandbox,
            call_timeout: Duration::from_secs(args.timeout_secs.max(1)),
            ..Self::default()
        }
        .with_env_chrome_path()
    }

    /// Falls back to `SITEPDF_CHROME` when no executable was given.
    pub fn with_env_chrome_path(mut self) -> Self {
        if self.chrome_path.is_none()
            && let Some(path) = std::env::var_os(CHROME_PATH_ENV)
            && !path.is_empty()
        {
            self.chrome_path = Some(PathBuf::from(path));
        }
        self
    }

    fn launch_options(&self) -> anyhow::Result<LaunchOptions<'static>> {
        LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(self.sandbox)
            .window_size(Some(self.window_size))
            .path(self.chrome_path.clone())
            .idle_browser_timeout(self.call_timeout.max(Duration::from_secs(30)))
            .build()
            .map_err(|err| anyhow::anyhow!("build chrome launch options: {err}"))
    }
}

pub struct ChromeDriver {
    browser: Browser,
    tabs: Mutex<HashMap<SessionId, Arc<Tab>>>,
    next_session: AtomicU64,
    call_timeout: Duration,
}

impl ChromeDriver {
    /// Starts a browser process. Blocks until Chrome answers over CDP.
    pub fn launch(config: &BrowserConfig) -> anyhow::Result<Self> {
        let options = config.launch_options()?;
        tracing::debug!(
            headless = config.headless,
            sandbox = config.sandbox,
            chrome = ?config.chrome_path,
            "launch chrome"
        );
        let browser = Browser::new(options).context("launch chrome")?;

        Ok(Self {
            browser,
            tabs: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            call_timeout: config.call_timeout,
        })
    }

    fn tab(&self, session: SessionId) -> Result<Arc<Tab>, DriverError> {
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&session)
            .cloned()
            .ok_or(DriverError::UnknownSession(session))
    }

    async fn call<T, F>(&self, operation: &'static str, f: F) -> Result<T, DriverError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, DriverError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        match tokio::time::timeout(self.call_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(DriverError::Protocol {
                operation,
                message: join_err.to_string(),
            }),
            Err(_) => Err(DriverError::Timeout {
                operation,
                after: self.call_timeout,
            }),
        }
    }

    async fn eval_json(
        &self,
        session: SessionId,
        operation: &'static str,
        source: String,
    ) -> Result<serde_json::Value, DriverError> {
        let tab = self.tab(session)?;
        self.call(operation, move || {
            let remote = tab
                .evaluate(&source, false)
                .map_err(|err| protocol(operation, err))?;
            let Some(serde_json::Value::String(json)) = remote.value else {
                return Err(DriverError::ScriptResult {
                    message: format!("{operation} did not return a JSON string"),
                });
            };
            serde_json::from_str(&json).map_err(|err| DriverError::ScriptResult {
                message: format!("{operation}: {err}"),
            })
        })
        .await
    }
}

fn protocol(operation: &'static str, err: anyhow::Error) -> DriverError {
    DriverError::Protocol {
        operation,
        message: format!("{err:#}"),
    }
}

#[async_trait]
impl NavigationDriver for ChromeDriver {
    async fn new_session(&self) -> Result<SessionId, DriverError> {
        let browser = self.browser.clone();
        let timeout = self.call_timeout;
        let tab = self
            .call("new session", move || {
                let tab = browser
                    .new_tab()
                    .map_err(|err| DriverError::SessionStart {
                        message: format!("{err:#}"),
                    })?;
                tab.set_default_timeout(timeout);
                Ok(tab)
            })
            .await?;

        let session = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session, tab);
        tracing::debug!(%session, "opened session");
        Ok(session)
    }

    async fn close_session(&self, session: SessionId) -> Result<(), DriverError> {
        let tab = self
            .tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session)
            .ok_or(DriverError::UnknownSession(session))?;
        self.call("close session", move || {
            tab.close(false)
                .map(|_| ())
                .map_err(|err| protocol("close session", err))
        })
        .await?;
        tracing::debug!(%session, "closed session");
        Ok(())
    }

    async fn navigate(&self, session: SessionId, url: &str) -> Result<(), DriverError> {
        let tab = self.tab(session)?;
        let target = url.to_owned();
        tracing::debug!(%session, url, "navigate");
        self.call("navigate", move || {
            let navigation = |err: anyhow::Error| DriverError::Navigation {
                url: target.clone(),
                message: format!("{err:#}"),
            };
            tab.navigate_to(&target).map_err(navigation)?;
            tab.wait_until_navigated().map_err(navigation)?;
            Ok(())
        })
        .await
    }

    async fn query(
        &self,
        session: SessionId,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        #[derive(Deserialize)]
        struct Match {
            href: Option<String>,
            text: String,
        }

        let value = self
            .eval_json(session, "query", query_source(selector))
            .await?;
        let matches: Vec<Match> =
            serde_json::from_value(value).map_err(|err| DriverError::ScriptResult {
                message: format!("query {selector:?}: {err}"),
            })?;

        Ok(matches
            .into_iter()
            .enumerate()
            .map(|(index, m)| ElementHandle {
                session,
                selector: selector.to_owned(),
                index,
                href: m.href,
                text: m.text,
            })
            .collect())
    }

    async fn evaluate(
        &self,
        session: SessionId,
        script: &PageScript,
    ) -> Result<serde_json::Value, DriverError> {
        self.eval_json(session, script.name(), script_source(script))
            .await
    }

    async fn serialize(&self, element: &ElementHandle) -> Result<String, DriverError> {
        let value = self
            .eval_json(
                element.session,
                "serialize",
                outer_html_source(&element.selector, element.index),
            )
            .await?;
        match value {
            serde_json::Value::String(html) => Ok(html),
            _ => Err(DriverError::StaleElement {
                selector: element.selector.clone(),
                index: element.index,
            }),
        }
    }

    async fn render_to_file(
        &self,
        session: SessionId,
        path: &Path,
        format: PageFormat,
    ) -> Result<(), DriverError> {
        let tab = self.tab(session)?;
        let path = path.to_path_buf();
        let (paper_width, paper_height) = format.paper_size_inches();
        self.call("render", move || {
            let options = PrintToPdfOptions {
                print_background: Some(true),
                paper_width: Some(paper_width),
                paper_height: Some(paper_height),
                ..Default::default()
            };
            let pdf = tab
                .print_to_pdf(Some(options))
                .map_err(|err| DriverError::Render {
                    path: path.clone(),
                    message: format!("{err:#}"),
                })?;
            std::fs::write(&path, pdf)?;
            Ok(())
        })
        .await
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn query_source(selector: &str) -> String {
    format!(
        r#"(() => {{
  const found = Array.from(document.querySelectorAll({selector}), (el) => ({{
    href: typeof el.href === "string" && el.href !== "" ? el.href : null,
    text: el.textContent || "",
  }}));
  return JSON.stringify(found);
}})()"#,
        selector = js_string(selector),
    )
}

fn outer_html_source(selector: &str, index: usize) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelectorAll({selector})[{index}];
  return JSON.stringify(el ? el.outerHTML : null);
}})()"#,
        selector = js_string(selector),
    )
}

/// Wraps `body` so it runs against the first match of `selector`, yielding
/// `false` when nothing matches.
fn on_first_match(selector: &str, body: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({selector});
  if (!el) return JSON.stringify(false);
  {body}
  return JSON.stringify(true);
}})()"#,
        selector = js_string(selector),
    )
}

fn script_source(script: &PageScript) -> String {
    match script {
        PageScript::SetRootProperty { name, value } => format!(
            r#"(() => {{
  document.documentElement.style.setProperty({name}, {value});
  return JSON.stringify(true);
}})()"#,
            name = js_string(name),
            value = js_string(value),
        ),
        PageScript::RemoveElement { selector } => on_first_match(selector, "el.remove();"),
        PageScript::SetStyle {
            selector,
            property,
            value,
        } => on_first_match(
            selector,
            &format!(
                "el.style.setProperty({}, {});",
                js_string(property),
                js_string(value)
            ),
        ),
        PageScript::ClearChildren { selector } => on_first_match(selector, "el.replaceChildren();"),
        PageScript::InsertHtml {
            container,
            before,
            html,
        } => on_first_match(
            container,
            &format!(
                r#"const template = document.createElement("template");
  template.innerHTML = {html};
  const reference = document.querySelector({before});
  if (reference && reference !== el && el.contains(reference)) {{
    reference.parentNode.insertBefore(template.content, reference);
  }} else {{
    el.appendChild(template.content);
  }}"#,
                html = js_string(html),
                before = js_string(before),
            ),
        ),
        PageScript::PrependHtml { container, html } => on_first_match(
            container,
            &format!(r#"el.insertAdjacentHTML("afterbegin", {});"#, js_string(html)),
        ),
        PageScript::AppendHtml { container, html } => on_first_match(
            container,
            &format!(r#"el.insertAdjacentHTML("beforeend", {});"#, js_string(html)),
        ),
    }
}
