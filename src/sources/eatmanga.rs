use std::sync::{Arc, Weak};

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::NetworkClient;
use crate::models::{Chapter, Page, RepositoryInfo, Series};
use crate::outcome::Fetched;
use crate::repository::{Repository, SeriesCache};

/// Reader image candidates, tried in priority order. The big variant is
/// only present for oversized scans.
const IMAGE_SELECTORS: &[&str] = &["#eatmanga_image_big", "#eatmanga_image"];

pub struct EatManga {
    info: RepositoryInfo,
    index: Url,
    client: Arc<dyn NetworkClient>,
    cache: SeriesCache,
    // Handed to discovered Series so they can delegate back here.
    weak: Weak<EatManga>,
}

impl EatManga {
    pub fn new(client: Arc<dyn NetworkClient>) -> Arc<Self> {
        let info = RepositoryInfo::new("Eat Manga", "http://eatmanga.com/", "EatManga.png", false);
        let index = info.root.join("Manga-Scan/").unwrap();
        Arc::new_cyclic(|weak| Self {
            info,
            index,
            client,
            cache: SeriesCache::new(),
            weak: weak.clone(),
        })
    }
}

#[async_trait]
impl Repository for EatManga {
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

        let row_sel = Selector::parse("#updates li").unwrap();
        let title_sel = Selector::parse("a").unwrap();
        let date_sel = Selector::parse("span.badge").unwrap();

        let repo: Weak<dyn Repository> = self.weak.clone();
        let mut output = Vec::new();
        for row in document.select(&row_sel) {
            // Ad and header rows lack the anchor/badge pair; skip them.
            let (Some(title_node), Some(date_node)) =
                (row.select(&title_sel).next(), row.select(&date_sel).next())
            else {
                continue;
            };
            let Some(href) = title_node.value().attr("href") else {
                continue;
            };
            let Ok(uri) = self.info.root.join(href) else {
                continue;
            };
            let title = title_node.text().collect::<String>();
            let mut series = Series::new(repo.clone(), uri, title.trim());
            series.updated = date_node.text().collect::<String>().trim().to_string();
            output.push(series);
        }

        Fetched::Found(self.cache.fill(output))
    }

    async fn chapters(
        &self,
        series: &Series,
        token: &CancellationToken,
    ) -> Fetched<Vec<Chapter>> {
        let Some(html) = self.client.fetch_text(&series.uri, &self.index, token).await else {
            return Fetched::failed(token);
        };

        let document = Html::parse_document(&html);
        if token.is_cancelled() {
            return Fetched::Cancelled;
        }

        let container_sel = Selector::parse("#updates").unwrap();
        let Some(container) = document.select(&container_sel).next() else {
            return Fetched::Missing;
        };

        // Scoping both selectors under the container keeps the anchors and
        // their sibling timestamps positionally paired.
        let link_sel = Selector::parse("li a").unwrap();
        let time_sel = Selector::parse("li span").unwrap();

        let mut output = Vec::new();
        for (link, time) in container.select(&link_sel).zip(container.select(&time_sel)) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Ok(uri) = self.info.root.join(href) else {
                continue;
            };
            // Dummy entries for not-yet-released chapters live under
            // /upcoming/; prune them.
            if uri.path().starts_with("/upcoming") {
                continue;
            }
            let title = link.text().collect::<String>();
            let mut chapter = Chapter::new(series, uri, title.trim(), -1);
            chapter.updated = time.text().collect::<String>().trim().to_string();
            output.push(chapter);
        }

        // The site lists newest first.
        output.reverse();
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

        let control_sel = Selector::parse("#pages").unwrap();
        let Some(control) = document.select(&control_sel).next() else {
            return Fetched::Missing;
        };

        let option_sel = Selector::parse("option").unwrap();
        let mut output = Vec::new();
        for option in control.select(&option_sel) {
            let Some(value) = option.value().attr("value") else {
                continue;
            };
            let Ok(uri) = self.info.root.join(value) else {
                continue;
            };
            // Number by position, not by the option's own value, so the
            // sequence stays dense whatever the markup claims.
            output.push(Page::new(chapter, uri, output.len() as u32 + 1));
        }

        Fetched::Found(output)
    }

    async fn image(&self, page: &mut Page, token: &CancellationToken) -> Fetched<Vec<u8>> {
        let referer = page.chapter().first_page_uri.clone();
        let Some(html) = self.client.fetch_text(&page.uri, &referer, token).await else {
            return Fetched::failed(token);
        };

        let image_uri = {
            let document = Html::parse_document(&html);
            if token.is_cancelled() {
                return Fetched::Cancelled;
            }
            let mut found = None;
            for candidate in IMAGE_SELECTORS {
                let sel = Selector::parse(candidate).unwrap();
                if let Some(src) = document
                    .select(&sel)
                    .next()
                    .and_then(|node| node.value().attr("src"))
                {
                    if let Ok(abs) = self.info.root.join(src) {
                        found = Some(abs);
                        break;
                    }
                }
            }
            match found {
                Some(uri) => uri,
                // No candidate matched: the page has no extractable image.
                None => return Fetched::Missing,
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
