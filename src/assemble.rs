use crate::driver::{NavigationDriver, PageScript, SessionId, script_applied};
use crate::error::PipelineError;
use crate::formats::{ChapterDescriptor, Fragment};
use crate::profile::SiteProfile;

const TOC_STYLE: &str = "font-size: 16px; padding: 2px 48px; margin-bottom: 600px;";
const TOC_ENTRY_STYLE: &str = "margin: 4px 18px;";
// Fixed spacing so each chapter starts well apart once paginated.
const CHAPTER_STYLE: &str = "margin-top: 800px; padding-top: 40px;";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyOutcome {
    pub toc_entries: usize,
    pub chapter_blocks: usize,
    /// Ids of chapters left out because their fragment is absent.
    pub dropped: Vec<String>,
}

/// Table of contents listing every descriptor as plain `"<order>. <title>"`
/// lines. Entries are not links: the output is a flat printable document.
pub fn render_toc(descriptors: &[ChapterDescriptor]) -> String {
    let mut html = format!(r#"<div class="sitepdf-toc" style="{TOC_STYLE}">"#);
    for descriptor in descriptors {
        html.push_str(&format!(
            r#"<div style="{TOC_ENTRY_STYLE}">{}. {}</div>"#,
            descriptor.order,
            html_escape(&descriptor.title)
        ));
    }
    html.push_str("</div>");
    html
}

pub fn wrap_chapter(chapter_id: &str, fragment_html: &str) -> String {
    format!(
        r#"<div class="sitepdf-chapter" data-chapter-id="{}" style="{CHAPTER_STYLE}">{fragment_html}</div>"#,
        html_escape(chapter_id)
    )
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Replaces the landing page's content with the table of contents followed
/// by every present fragment, in ascending chapter order.
pub async fn assemble_document<D>(
    driver: &D,
    session: SessionId,
    profile: &SiteProfile,
    landing_url: &str,
    descriptors: &[ChapterDescriptor],
    fragments: &[Fragment],
) -> Result<AssemblyOutcome, PipelineError>
where
    D: NavigationDriver + ?Sized,
{
    debug_assert_eq!(descriptors.len(), fragments.len());

    let targets = driver
        .query(session, &profile.content_container)
        .await
        .map_err(PipelineError::driver("query landing content container"))?;
    if targets.is_empty() {
        return Err(PipelineError::MissingContentContainer {
            selector: profile.content_container.clone(),
            url: landing_url.to_owned(),
        });
    }

    // The chapter shown on the landing page is fetched again with the rest.
    apply(
        driver,
        session,
        PageScript::ClearChildren {
            selector: profile.content_container.clone(),
        },
    )
    .await?;

    let toc = render_toc(descriptors);
    let placed = apply(
        driver,
        session,
        PageScript::InsertHtml {
            container: profile.menu_anchor_container.clone(),
            before: profile.menu_insertion_point.clone(),
            html: toc.clone(),
        },
    )
    .await?;
    if !placed {
        tracing::warn!(
            anchor = %profile.menu_anchor_container,
            "menu anchor container not found; placing table of contents at the top of the content"
        );
        apply(
            driver,
            session,
            PageScript::PrependHtml {
                container: profile.content_container.clone(),
                html: toc,
            },
        )
        .await?;
    }

    let mut outcome = AssemblyOutcome {
        toc_entries: descriptors.len(),
        ..AssemblyOutcome::default()
    };
    for (descriptor, fragment) in descriptors.iter().zip(fragments) {
        let Some(html) = fragment.html.as_deref() else {
            outcome.dropped.push(descriptor.id.clone());
            continue;
        };
        apply(
            driver,
            session,
            PageScript::AppendHtml {
                container: profile.content_container.clone(),
                html: wrap_chapter(&descriptor.id, html),
            },
        )
        .await?;
        outcome.chapter_blocks += 1;
    }

    tracing::info!(
        toc_entries = outcome.toc_entries,
        chapters = outcome.chapter_blocks,
        dropped = outcome.dropped.len(),
        "assembled document"
    );
    Ok(outcome)
}

async fn apply<D>(
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
        .map_err(PipelineError::driver("assemble document"))?;
    script_applied(&value).map_err(PipelineError::driver("assemble document"))
}
