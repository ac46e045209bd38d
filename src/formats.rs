use serde::{Deserialize, Serialize};

/// One crawlable chapter discovered on the landing page.
///
/// `id` is a sequence token derived from `order`, so two chapters sharing a
/// title still get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDescriptor {
    pub id: String,
    pub title: String,
    pub url: String,
    pub order: usize,
}

impl ChapterDescriptor {
    pub fn new(order: usize, title: String, url: String) -> Self {
        Self {
            id: chapter_id(order),
            title,
            url,
            order,
        }
    }
}

pub fn chapter_id(order: usize) -> String {
    format!("chapter_{order}")
}

/// Captured content for one chapter. `html` is `None` when the content
/// container selector matched nothing on that chapter's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub chapter_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl Fragment {
    pub fn is_present(&self) -> bool {
        self.html.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterOutcome {
    pub id: String,
    pub order: usize,
    pub title: String,
    pub url: String,
    pub included: bool,
}

/// Summary of one successful run, written by `build --report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub url: String,
    pub profile: String,
    pub output: String,
    pub page_format: String,
    pub started_at: String,
    pub finished_at: String,
    pub chapters: Vec<ChapterOutcome>,
    pub dropped: Vec<String>,
}

impl RunReport {
    pub fn included_count(&self) -> usize {
        self.chapters.iter().filter(|c| c.included).count()
    }
}

pub fn chapter_outcomes(
    descriptors: &[ChapterDescriptor],
    fragments: &[Fragment],
) -> Vec<ChapterOutcome> {
    descriptors
        .iter()
        .zip(fragments)
        .map(|(descriptor, fragment)| ChapterOutcome {
            id: descriptor.id.clone(),
            order: descriptor.order,
            title: descriptor.title.clone(),
            url: descriptor.url.clone(),
            included: fragment.is_present(),
        })
        .collect()
}
