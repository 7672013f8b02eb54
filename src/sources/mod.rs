//! Site adapters and the process-wide registry.

pub mod eatmanga;
pub mod wpmanga;

use std::sync::Arc;

use crate::client::NetworkClient;
use crate::repository::Repository;

/// Build the adapter registry. An explicit list, assembled once at startup;
/// callers own the returned handles for the life of the process.
pub fn all(client: Arc<dyn NetworkClient>) -> Vec<Arc<dyn Repository>> {
    let repos: Vec<Arc<dyn Repository>> = vec![
        eatmanga::EatManga::new(client.clone()),
        // WP-Manga deployments share one implementation.
        wpmanga::WpManga::new(
            client.clone(),
            "Fire Scans",
            "https://firescans.xyz/",
            "FireScans.png",
            false,
        ),
        wpmanga::WpManga::new(
            client.clone(),
            "Manhua US",
            "https://manhuaus.com/",
            "ManhuaUS.png",
            false,
        ),
        // Serves its reader through scripted markup; generic callers should
        // skip it unless they bring their own rendering.
        wpmanga::WpManga::new(
            client,
            "Asmotoon",
            "https://asmotoon.com/",
            "Asmotoon.png",
            true,
        ),
    ];
    repos
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;
    use url::Url;

    struct NoNetwork;

    #[async_trait]
    impl NetworkClient for NoNetwork {
        async fn fetch_text(
            &self,
            _uri: &Url,
            _referer: &Url,
            _token: &CancellationToken,
        ) -> Option<String> {
            None
        }

        async fn fetch_bytes(
            &self,
            _uri: &Url,
            _referer: &Url,
            _token: &CancellationToken,
        ) -> Option<Vec<u8>> {
            None
        }
    }

    #[test]
    fn registry_has_unique_names() {
        let repos = all(Arc::new(NoNetwork));
        assert!(!repos.is_empty());
        let mut names: Vec<_> = repos.iter().map(|r| r.info().name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), repos.len());
    }

    #[test]
    fn special_handling_flag_is_set_where_expected() {
        let repos = all(Arc::new(NoNetwork));
        let special: Vec<_> = repos
            .iter()
            .filter(|r| r.info().requires_special_handling)
            .map(|r| r.info().name)
            .collect();
        assert_eq!(special, vec!["Asmotoon"]);
    }
}
