//! The polymorphic adapter contract and the orchestration state shared by
//! every site adapter.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::helpers::make_valid_path_segment;
use crate::models::{Chapter, Page, RepositoryInfo, Series};
use crate::outcome::Fetched;

/// One implementation per site. Each operation is a single attempt: it
/// fetches, parses, checks the token after every stage, and reports
/// expected failure as `Missing` rather than an error. Retry policy, if
/// any, belongs to the caller.
#[async_trait]
pub trait Repository: Send + Sync {
    fn info(&self) -> &RepositoryInfo;

    /// Discover the site's series list from its index page. The first
    /// successful call is memoized for the adapter's lifetime.
    async fn series(&self, token: &CancellationToken) -> Fetched<Vec<Series>>;

    /// Discover a series' chapters, normalized to oldest-first order.
    async fn chapters(&self, series: &Series, token: &CancellationToken)
        -> Fetched<Vec<Chapter>>;

    /// Discover a chapter's pages, numbered densely from 1 in reader order.
    async fn pages(&self, chapter: &Chapter, token: &CancellationToken) -> Fetched<Vec<Page>>;

    /// Locate and fetch a page's image. Records the resolved absolute image
    /// URI on the page before requesting the bytes.
    async fn image(&self, page: &mut Page, token: &CancellationToken) -> Fetched<Vec<u8>>;

    fn suggest_path(&self, root: &Path) -> PathBuf {
        root.join(make_valid_path_segment(self.info().name))
    }
}

/// Memoized series list, written at most once.
///
/// Failed discovery never touches the slot, so the next call retries from
/// scratch. Concurrent first calls may each fetch redundantly; `fill` keeps
/// the first stored value and hands every racer the same published list.
pub struct SeriesCache {
    inner: Mutex<Option<Vec<Series>>>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Option<Vec<Series>> {
        self.inner.lock().unwrap().clone()
    }

    /// Store `series` if the slot is still empty and return whatever the
    /// slot holds afterwards.
    pub fn fill(&self, series: Vec<Series>) -> Vec<Series> {
        let mut slot = self.inner.lock().unwrap();
        slot.get_or_insert(series).clone()
    }
}

impl Default for SeriesCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct Inert(RepositoryInfo);

    #[async_trait]
    impl Repository for Inert {
        fn info(&self) -> &RepositoryInfo {
            &self.0
        }

        async fn series(&self, _token: &CancellationToken) -> Fetched<Vec<Series>> {
            Fetched::Missing
        }

        async fn chapters(
            &self,
            _series: &Series,
            _token: &CancellationToken,
        ) -> Fetched<Vec<Chapter>> {
            Fetched::Missing
        }

        async fn pages(
            &self,
            _chapter: &Chapter,
            _token: &CancellationToken,
        ) -> Fetched<Vec<Page>> {
            Fetched::Missing
        }

        async fn image(&self, _page: &mut Page, _token: &CancellationToken) -> Fetched<Vec<u8>> {
            Fetched::Missing
        }
    }

    fn one_series(title: &str) -> Vec<Series> {
        let repo: Arc<dyn Repository> = Arc::new(Inert(RepositoryInfo::new(
            "Inert",
            "http://inert.example/",
            "Inert.png",
            false,
        )));
        let uri = repo.info().root.join("series/a/").unwrap();
        vec![Series::new(Arc::downgrade(&repo), uri, title)]
    }

    #[test]
    fn cache_starts_empty() {
        let cache = SeriesCache::new();
        assert!(cache.get().is_none());
    }

    #[test]
    fn first_fill_wins() {
        let cache = SeriesCache::new();
        let first = cache.fill(one_series("First"));
        assert_eq!(first[0].title, "First");
        // A later fill must not displace the published list.
        let again = cache.fill(one_series("Second"));
        assert_eq!(again[0].title, "First");
        assert_eq!(cache.get().unwrap()[0].title, "First");
    }

    #[test]
    fn default_path_is_sanitized_name() {
        let repo = Inert(RepositoryInfo::new(
            "Odd: Name",
            "http://inert.example/",
            "Inert.png",
            false,
        ));
        let path = repo.suggest_path(Path::new("/library"));
        assert_eq!(path, PathBuf::from("/library/Odd_ Name"));
    }
}
