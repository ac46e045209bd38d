use crate::driver::{NavigationDriver, PageScript, SessionId};
use crate::error::PipelineError;
use crate::formats::{ChapterDescriptor, Fragment};
use crate::profile::SiteProfile;

/// Visits chapters one at a time on a dedicated secondary session.
///
/// Fragments come back aligned with the descriptors: same length, same
/// order. Descriptors arrive in ascending `order` from the indexer and are
/// attempted in exactly that sequence; the first failed remote call aborts
/// the whole run.
pub struct ContentFetcher<'a, D: NavigationDriver + ?Sized> {
    driver: &'a D,
    profile: &'a SiteProfile,
}

impl<'a, D: NavigationDriver + ?Sized> ContentFetcher<'a, D> {
    pub fn new(driver: &'a D, profile: &'a SiteProfile) -> Self {
        Self { driver, profile }
    }

    /// Opens the secondary session, fetches every chapter and closes the
    /// session again, also when a fetch fails.
    pub async fn fetch_all(
        &self,
        descriptors: &[ChapterDescriptor],
    ) -> Result<Vec<Fragment>, PipelineError> {
        let session = self
            .driver
            .new_session()
            .await
            .map_err(PipelineError::driver("open chapter session"))?;

        let fetched = self.fetch_in_order(session, descriptors).await;
        let closed = self
            .driver
            .close_session(session)
            .await
            .map_err(PipelineError::driver("close chapter session"));

        let fragments = fetched?;
        closed?;
        Ok(fragments)
    }

    async fn fetch_in_order(
        &self,
        session: SessionId,
        descriptors: &[ChapterDescriptor],
    ) -> Result<Vec<Fragment>, PipelineError> {
        debug_assert!(descriptors.windows(2).all(|w| w[0].order < w[1].order));

        let mut fragments = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            tracing::info!(
                order = descriptor.order,
                total = descriptors.len(),
                url = %descriptor.url,
                "fetch chapter"
            );
            fragments.push(self.fetch_one(session, descriptor).await?);
        }
        Ok(fragments)
    }

    pub async fn fetch_one(
        &self,
        session: SessionId,
        descriptor: &ChapterDescriptor,
    ) -> Result<Fragment, PipelineError> {
        self.driver
            .navigate(session, &descriptor.url)
            .await
            .map_err(PipelineError::navigation(&descriptor.url))?;

        // Absolutely positioned content collapses once re-parented.
        if let Some(body) = &self.profile.body_container {
            self.driver
                .evaluate(
                    session,
                    &PageScript::SetStyle {
                        selector: body.clone(),
                        property: "position".to_owned(),
                        value: "relative".to_owned(),
                    },
                )
                .await
                .map_err(PipelineError::driver("normalize chapter layout"))?;
        }

        let containers = self
            .driver
            .query(session, &self.profile.content_container)
            .await
            .map_err(PipelineError::driver("query content container"))?;

        let html = match containers.first() {
            Some(container) => Some(
                self.driver
                    .serialize(container)
                    .await
                    .map_err(PipelineError::driver("serialize content container"))?,
            ),
            None => {
                tracing::warn!(
                    order = descriptor.order,
                    title = %descriptor.title,
                    url = %descriptor.url,
                    selector = %self.profile.content_container,
                    "content container not found; chapter will be left out"
                );
                None
            }
        };

        Ok(Fragment {
            chapter_id: descriptor.id.clone(),
            html,
        })
    }
}
