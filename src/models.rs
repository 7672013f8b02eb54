//! The four entity kinds: repository identity plus Series, Chapter and Page
//! handles. Entities are thin descriptors; their "get children" calls
//! delegate straight back to the adapter that discovered them.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::helpers::make_valid_path_segment;
use crate::outcome::Fetched;
use crate::repository::Repository;

/// Identity of a manga-hosting site, owned by its adapter.
#[derive(Debug, Clone)]
pub struct RepositoryInfo {
    pub name: &'static str,
    /// All relative links on the site resolve against this.
    pub root: Url,
    pub icon: &'static str,
    /// Marks adapters that callers must treat non-generically.
    pub requires_special_handling: bool,
}

impl RepositoryInfo {
    pub fn new(
        name: &'static str,
        root: &str,
        icon: &'static str,
        requires_special_handling: bool,
    ) -> Self {
        Self {
            name,
            root: Url::parse(root).unwrap(),
            icon,
            requires_special_handling,
        }
    }
}

/// A series listed on a repository's index page.
#[derive(Debug, Clone)]
pub struct Series {
    repo: Weak<dyn Repository>,
    pub uri: Url,
    pub title: String,
    /// Free-form recency marker as the site displays it.
    pub updated: String,
}

impl Series {
    pub(crate) fn new(repo: Weak<dyn Repository>, uri: Url, title: &str) -> Self {
        Self {
            repo,
            uri,
            title: title.to_string(),
            updated: String::new(),
        }
    }

    pub fn repository(&self) -> Option<Arc<dyn Repository>> {
        self.repo.upgrade()
    }

    /// Discover this series' chapters, oldest first. Re-fetched on every
    /// call; hold onto the returned list if you need stability.
    pub async fn chapters(&self, token: &CancellationToken) -> Fetched<Vec<Chapter>> {
        let Some(repo) = self.repo.upgrade() else {
            return Fetched::Missing;
        };
        repo.chapters(self, token).await
    }

    pub fn suggest_path(&self, root: &Path) -> PathBuf {
        root.join(make_valid_path_segment(&self.title))
    }
}

// Identity is the page URI; `updated` is display metadata and takes no part
// in equality.
impl PartialEq for Series {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for Series {}

/// A chapter of a series, identified by the URI of its first page.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub(crate) series: Series,
    pub first_page_uri: Url,
    pub title: String,
    pub updated: String,
    /// Ordinal assigned by the adapter when the site's own listing order is
    /// unreliable; -1 when document order is trusted.
    pub position: i32,
}

impl Chapter {
    pub(crate) fn new(series: &Series, first_page_uri: Url, title: &str, position: i32) -> Self {
        Self {
            series: series.clone(),
            first_page_uri,
            title: title.to_string(),
            updated: String::new(),
            position,
        }
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    /// Discover this chapter's pages, numbered 1..N with no gaps.
    pub async fn pages(&self, token: &CancellationToken) -> Fetched<Vec<Page>> {
        let Some(repo) = self.series.repo.upgrade() else {
            return Fetched::Missing;
        };
        repo.pages(self, token).await
    }

    pub fn suggest_path(&self, root: &Path) -> PathBuf {
        self.series
            .suggest_path(root)
            .join(make_valid_path_segment(&self.title))
    }
}

// The first-page URI is the canonical identity.
impl PartialEq for Chapter {
    fn eq(&self, other: &Self) -> bool {
        self.first_page_uri == other.first_page_uri
    }
}

impl Eq for Chapter {}

/// A single page of a chapter.
#[derive(Debug, Clone)]
pub struct Page {
    pub(crate) chapter: Chapter,
    pub uri: Url,
    /// 1-based position within the chapter.
    pub number: u32,
    /// Absolute image location, recorded once image retrieval resolves it.
    pub image_uri: Option<Url>,
}

impl Page {
    pub(crate) fn new(chapter: &Chapter, uri: Url, number: u32) -> Self {
        Self {
            chapter: chapter.clone(),
            uri,
            number,
            image_uri: None,
        }
    }

    pub fn chapter(&self) -> &Chapter {
        &self.chapter
    }

    /// Fetch this page's raw image bytes. On success `image_uri` holds the
    /// resolved absolute location the bytes came from.
    pub async fn image(&mut self, token: &CancellationToken) -> Fetched<Vec<u8>> {
        let Some(repo) = self.chapter.series.repo.upgrade() else {
            return Fetched::Missing;
        };
        repo.image(self, token).await
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.number == other.number
    }
}

impl Eq for Page {}
