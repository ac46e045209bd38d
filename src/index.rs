use url::Url;

use crate::driver::{ElementHandle, NavigationDriver, SessionId};
use crate::error::PipelineError;
use crate::formats::ChapterDescriptor;
use crate::profile::SiteProfile;

pub const UNTITLED: &str = "Untitled";

/// Schemes a chapter link or landing URL may use. `file` covers books built
/// locally and opened from disk.
pub const ACCEPTED_SCHEMES: [&str; 3] = ["http", "https", "file"];

pub fn is_accepted_scheme(url: &Url) -> bool {
    ACCEPTED_SCHEMES.contains(&url.scheme())
}

/// Reads the chapter list from a session already showing the landing page.
///
/// Descriptors follow the document order of the matched links. Links without
/// an absolute target in one of [`ACCEPTED_SCHEMES`] are skipped and do not
/// consume an `order`.
pub async fn index_chapters<D>(
    driver: &D,
    session: SessionId,
    profile: &SiteProfile,
    landing_url: &str,
) -> Result<Vec<ChapterDescriptor>, PipelineError>
where
    D: NavigationDriver + ?Sized,
{
    let links = driver
        .query(session, &profile.chapter_links)
        .await
        .map_err(PipelineError::driver("query chapter links"))?;

    let descriptors = descriptors_from_links(&links);
    tracing::info!(
        matched = links.len(),
        accepted = descriptors.len(),
        "indexed chapters"
    );

    if descriptors.is_empty() {
        return Err(PipelineError::NoChapters {
            profile: profile.name.clone(),
            selector: profile.chapter_links.clone(),
            url: landing_url.to_owned(),
        });
    }
    Ok(descriptors)
}

pub fn descriptors_from_links(links: &[ElementHandle]) -> Vec<ChapterDescriptor> {
    let mut descriptors = Vec::with_capacity(links.len());
    for link in links {
        let Some(url) = link.href.as_deref().and_then(absolute_link_target) else {
            tracing::debug!(index = link.index, href = ?link.href, "skip link without absolute target");
            continue;
        };
        descriptors.push(ChapterDescriptor::new(
            descriptors.len(),
            chapter_title(&link.text),
            url,
        ));
    }
    descriptors
}

fn absolute_link_target(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let url = Url::parse(href).ok()?;
    is_accepted_scheme(&url).then(|| url.to_string())
}

fn chapter_title(text: &str) -> String {
    let title = text.trim();
    if title.is_empty() {
        UNTITLED.to_owned()
    } else {
        title.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(index: usize, href: Option<&str>, text: &str) -> ElementHandle {
        ElementHandle {
            session: SessionId(1),
            selector: "nav a".to_owned(),
            index,
            href: href.map(str::to_owned),
            text: text.to_owned(),
        }
    }

    #[test]
    fn order_counts_only_accepted_links() {
        let links = vec![
            link(0, Some("https://docs.example.com/intro.html"), " Intro "),
            link(1, None, "Part I"),
            link(2, Some(""), "Empty"),
            link(3, Some("https://docs.example.com/usage.html"), "Usage"),
        ];

        let descriptors = descriptors_from_links(&links);

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].order, 0);
        assert_eq!(descriptors[0].id, "chapter_0");
        assert_eq!(descriptors[0].title, "Intro");
        assert_eq!(descriptors[1].order, 1);
        assert_eq!(descriptors[1].id, "chapter_1");
        assert_eq!(descriptors[1].url, "https://docs.example.com/usage.html");
    }

    #[test]
    fn blank_text_becomes_untitled() {
        let links = vec![link(0, Some("https://docs.example.com/a"), "  \n ")];
        assert_eq!(descriptors_from_links(&links)[0].title, UNTITLED);
    }

    #[test]
    fn relative_and_script_targets_are_rejected() {
        let links = vec![
            link(0, Some("chapter1.html"), "Relative"),
            link(1, Some("javascript:void(0)"), "Script"),
            link(2, Some("mailto:docs@example.com"), "Mail"),
        ];
        assert!(descriptors_from_links(&links).is_empty());
    }

    #[test]
    fn file_links_of_a_local_build_are_accepted() {
        let links = vec![
            link(0, Some("file:///home/me/book/book/intro.html"), "Intro"),
            link(1, Some("file:///home/me/book/book/usage.html#setup"), "Usage"),
        ];

        let descriptors = descriptors_from_links(&links);

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].url, "file:///home/me/book/book/intro.html");
        assert_eq!(
            descriptors[1].url,
            "file:///home/me/book/book/usage.html#setup"
        );
    }

    #[test]
    fn duplicate_titles_keep_distinct_ids() {
        let links = vec![
            link(0, Some("https://docs.example.com/a"), "Overview"),
            link(1, Some("https://docs.example.com/b"), "Overview"),
        ];
        let descriptors = descriptors_from_links(&links);
        assert_ne!(descriptors[0].id, descriptors[1].id);
    }
}
