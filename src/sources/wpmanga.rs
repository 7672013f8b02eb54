//! Generic adapter for WP-Manga / Madara-theme sites. One implementation
//! covers every registered deployment; only the site identity varies.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::NetworkClient;
use crate::models::{Chapter, Page, RepositoryInfo, Series};
use crate::outcome::Fetched;
use crate::repository::{Repository, SeriesCache};

/// Listing row candidates, most specific theme first.
const SERIES_SELECTORS: &[(&str, &str)] = &[
    ("div.page-item-detail", "h3 > a"), // Standard WP-Manga
    ("div.page-listing-item", "h3 a"),  // MadaraProject theme
    ("div.bsx", "a"),                   // MangaStream/MangaBuddy theme
];

/// Recency badge inside a listing row.
const SERIES_DATE_SELECTOR: &str = "span.post-on, div.post-on";

/// Reader containers, tried in order; the first that holds any image wins.
const READER_SELECTORS: &[&str] = &[
    "div.reading-content img",
    "div.read-content img",
    "div#readerarea img",
];

pub struct WpManga {
    info: RepositoryInfo,
    index: Url,
    client: Arc<dyn NetworkClient>,
    cache: SeriesCache,
    // Handed to discovered Series so they can delegate back here.
    weak: Weak<WpManga>,
}

impl WpManga {
    pub fn new(
        client: Arc<dyn NetworkClient>,
        name: &'static str,
        root: &str,
        icon: &'static str,
        requires_special_handling: bool,
    ) -> Arc<Self> {
        let info = RepositoryInfo::new(name, root, icon, requires_special_handling);
        let index = info.root.join("manga/").unwrap();
        Arc::new_cyclic(|weak| Self {
            info,
            index,
            client,
            cache: SeriesCache::new(),
            weak: weak.clone(),
        })
    }
}

/// Fall back to the URL slug when a chapter anchor has no usable text.
fn derive_chapter_label(text: &str, href: &str) -> String {
    let t = text.trim();
    if !t.is_empty() && t != "#" {
        return t.to_string();
    }
    let lower = href.to_lowercase();
    if let Some(cap) = Regex::new(r"chapter[-/](\d+(?:\.\d+)?)")
        .unwrap()
        .captures(&lower)
    {
        return format!("Ch.{}", &cap[1]);
    }
    if let Some(cap) = Regex::new(r"vol(?:ume)?[-/](\d+)").unwrap().captures(&lower) {
        return format!("Vol.{}", &cap[1]);
    }
    href.to_string()
}

/// Collect the reader's image sources in strip order, honoring the lazy
/// loading attribute variants these themes use.
fn reader_images(document: &Html) -> Vec<String> {
    for candidate in READER_SELECTORS {
        let sel = Selector::parse(candidate).unwrap();
        let images: Vec<String> = document
            .select(&sel)
            .filter_map(|img| {
                img.value()
                    .attr("src")
                    .or_else(|| img.value().attr("data-src"))
                    .or_else(|| img.value().attr("data-lazy-src"))
                    .map(|s| s.trim().to_string())
            })
            .collect();
        if !images.is_empty() {
            return images;
        }
    }
    Vec::new()
}

#[async_trait]
impl Repository for WpManga {
    fn info(&self) -> &RepositoryInfo {
        &self.info
    }

    async fn series(&self, token: &CancellationToken) -> Fetched<Vec<Series>> {
        if let Some(cached) = self.cache.get() {
            return Fetched::Found(cached);
        }

        let Some(html) = self
            .client
            .fetch_text(&self.index, &self.info.root, token)
            .await
        else {
            return Fetched::failed(token);
        };

        let document = Html::parse_document(&html);
        if token.is_cancelled() {
            return Fetched::Cancelled;
        }

        let date_sel = Selector::parse(SERIES_DATE_SELECTOR).unwrap();
        let repo: Weak<dyn Repository> = self.weak.clone();
        let mut output = Vec::new();

        for (container, link) in SERIES_SELECTORS {
            let container_sel = Selector::parse(container).unwrap();
            let link_sel = Selector::parse(link).unwrap();
            for row in document.select(&container_sel) {
                let (Some(anchor), Some(date_node)) =
                    (row.select(&link_sel).next(), row.select(&date_sel).next())
                else {
                    continue;
                };
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                let Ok(uri) = self.info.root.join(href) else {
                    continue;
                };
                // Heading anchors carry the title as text; cover anchors in
                // tile themes carry it in the title attribute instead.
                let title = if link.starts_with("h3") {
                    anchor.text().collect::<String>().trim().to_string()
                } else {
                    anchor
                        .value()
                        .attr("title")
                        .map(|s| s.trim().to_string())
                        .unwrap_or_else(|| anchor.text().collect::<String>().trim().to_string())
                };
                if title.is_empty() {
                    continue;
                }
                let mut series = Series::new(repo.clone(), uri, &title);
                series.updated = date_node.text().collect::<String>().trim().to_string();
                output.push(series);
            }
            if !output.is_empty() {
                break;
            }
        }

        Fetched::Found(self.cache.fill(output))
    }

    async fn chapters(
        &self,
        series: &Series,
        token: &CancellationToken,
    ) -> Fetched<Vec<Chapter>> {
        let Some(html) = self
            .client
            .fetch_text(&series.uri, &self.index, token)
            .await
        else {
            return Fetched::failed(token);
        };

        let document = Html::parse_document(&html);
        if token.is_cancelled() {
            return Fetched::Cancelled;
        }

        // Anchor and release date are scoped per row, which keeps the two
        // paired even when a row omits its date.
        let row_sel = Selector::parse("li.wp-manga-chapter").unwrap();
        let link_sel = Selector::parse("a").unwrap();
        let date_sel = Selector::parse("span.chapter-release-date").unwrap();

        let mut output = Vec::new();
        for row in document.select(&row_sel) {
            let Some(anchor) = row.select(&link_sel).next() else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Ok(uri) = self.info.root.join(href) else {
                continue;
            };
            let text = anchor.text().collect::<String>();
            let title = derive_chapter_label(&text, href);
            let mut chapter = Chapter::new(series, uri, &title, -1);
            if let Some(date_node) = row.select(&date_sel).next() {
                chapter.updated = date_node.text().collect::<String>().trim().to_string();
            }
            output.push(chapter);
        }

        // These themes list newest first; normalize and stamp ordinals.
        output.reverse();
        for (position, chapter) in output.iter_mut().enumerate() {
            chapter.position = position as i32;
        }
        Fetched::Found(output)
    }

    async fn pages(&self, chapter: &Chapter, token: &CancellationToken) -> Fetched<Vec<Page>> {
        let Some(html) = self
            .client
            .fetch_text(&chapter.first_page_uri, &chapter.series().uri, token)
            .await
        else {
            return Fetched::failed(token);
        };

        let document = Html::parse_document(&html);
        if token.is_cancelled() {
            return Fetched::Cancelled;
        }

        let images = reader_images(&document);
        if images.is_empty() {
            return Fetched::Missing;
        }

        // Long-strip reader: every image is one page, all fetched from the
        // chapter document itself.
        let output = (1..=images.len() as u32)
            .map(|number| Page::new(chapter, chapter.first_page_uri.clone(), number))
            .collect();
        Fetched::Found(output)
    }

    async fn image(&self, page: &mut Page, token: &CancellationToken) -> Fetched<Vec<u8>> {
        let referer = page.chapter().series().uri.clone();
        let Some(html) = self.client.fetch_text(&page.uri, &referer, token).await else {
            return Fetched::failed(token);
        };

        let image_uri = {
            let document = Html::parse_document(&html);
            if token.is_cancelled() {
                return Fetched::Cancelled;
            }
            let images = reader_images(&document);
            let Some(src) = images.get(page.number as usize - 1) else {
                return Fetched::Missing;
            };
            match self.info.root.join(src) {
                Ok(abs) => abs,
                Err(_) => return Fetched::Missing,
            }
        };

        page.image_uri = Some(image_uri.clone());

        let page_uri = page.uri.clone();
        let Some(bytes) = self.client.fetch_bytes(&image_uri, &page_uri, token).await else {
            return Fetched::failed(token);
        };
        if token.is_cancelled() {
            return Fetched::Cancelled;
        }
        Fetched::Found(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_label_prefers_anchor_text() {
        assert_eq!(
            derive_chapter_label("Chapter 12", "https://x.example/manga/a/chapter-12/"),
            "Chapter 12"
        );
    }

    #[test]
    fn chapter_label_from_slug_when_text_is_blank() {
        assert_eq!(
            derive_chapter_label("  ", "https://x.example/manga/a/chapter-10.5/"),
            "Ch.10.5"
        );
        assert_eq!(
            derive_chapter_label("#", "https://x.example/manga/a/volume-3/"),
            "Vol.3"
        );
    }

    #[test]
    fn reader_images_fall_back_to_lazy_attributes() {
        let html = Html::parse_document(
            r#"<div class="reading-content">
                <img data-src="https://cdn.example/001.jpg">
                <img src="https://cdn.example/002.jpg">
            </div>"#,
        );
        let images = reader_images(&html);
        assert_eq!(
            images,
            vec![
                "https://cdn.example/001.jpg".to_string(),
                "https://cdn.example/002.jpg".to_string()
            ]
        );
    }

    #[test]
    fn reader_images_empty_without_reader_container() {
        let html = Html::parse_document("<div><img src=\"banner.png\"></div>");
        assert!(reader_images(&html).is_empty());
    }
}
