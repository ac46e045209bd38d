use crate::driver::{NavigationDriver, PageScript, SessionId, script_applied};
use crate::error::PipelineError;
use crate::profile::SiteProfile;

pub const SIDEBAR_WIDTH_PROPERTY: &str = "--sidebar-width";

/// What the sanitizer found on the landing page. Missing chrome is not an
/// error; it is only reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeOutcome {
    pub removed: Vec<String>,
    pub missing: Vec<String>,
}

/// Strips navigation chrome from the landing page.
///
/// Each step is independent and tolerates an absent target, so running it
/// twice leaves the document as the first run did.
pub async fn sanitize_page<D>(
    driver: &D,
    session: SessionId,
    profile: &SiteProfile,
) -> Result<SanitizeOutcome, PipelineError>
where
    D: NavigationDriver + ?Sized,
{
    run(
        driver,
        session,
        PageScript::SetRootProperty {
            name: SIDEBAR_WIDTH_PROPERTY.to_owned(),
            value: "0".to_owned(),
        },
    )
    .await?;

    let mut outcome = SanitizeOutcome::default();
    for selector in [&profile.sidebar, &profile.header, &profile.next_nav] {
        let script = PageScript::RemoveElement {
            selector: selector.clone(),
        };
        if run(driver, session, script).await? {
            outcome.removed.push(selector.clone());
        } else {
            tracing::debug!(%selector, "chrome element not present; nothing to remove");
            outcome.missing.push(selector.clone());
        }
    }

    // Lets the page grow with the inserted chapters instead of clipping them.
    if let Some(body) = &profile.body_container {
        let script = PageScript::SetStyle {
            selector: body.clone(),
            property: "position".to_owned(),
            value: "static".to_owned(),
        };
        if !run(driver, session, script).await? {
            tracing::debug!(selector = %body, "body container not present");
            outcome.missing.push(body.clone());
        }
    }

    if outcome.missing.is_empty() {
        tracing::info!(removed = outcome.removed.len(), "sanitized landing page");
    } else {
        tracing::warn!(
            removed = outcome.removed.len(),
            missing = ?outcome.missing,
            "sanitized landing page; some chrome elements were not found"
        );
    }
    Ok(outcome)
}

async fn run<D>(
    driver: &D,
    session: SessionId,
    script: PageScript,
) -> Result<bool, PipelineError>
where
    D: NavigationDriver + ?Sized,
{
    let value = driver
        .evaluate(session, &script)
        .await
        .map_err(PipelineError::driver("sanitize landing page"))?;
    script_applied(&value).map_err(PipelineError::driver("sanitize landing page"))
}
