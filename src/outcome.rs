use tokio_util::sync::CancellationToken;

/// Result of a discovery or image fetch.
///
/// Scraping third-party sites fails all the time, so a missing page or a
/// garbled listing is an ordinary value here, not an error. `Cancelled` is
/// surfaced separately so callers can tell an aborted call from a site
/// that genuinely had nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    Found(T),
    Missing,
    Cancelled,
}

impl<T> Fetched<T> {
    /// Classify an empty fetch: a fired token means the call was cancelled,
    /// anything else is a plain miss.
    pub fn failed(token: &CancellationToken) -> Self {
        if token.is_cancelled() {
            Fetched::Cancelled
        } else {
            Fetched::Missing
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Fetched::Found(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Fetched::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Found(value) => Fetched::Found(f(value)),
            Fetched::Missing => Fetched::Missing,
            Fetched::Cancelled => Fetched::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_reflects_token_state() {
        let token = CancellationToken::new();
        assert_eq!(Fetched::<()>::failed(&token), Fetched::Missing);
        token.cancel();
        assert_eq!(Fetched::<()>::failed(&token), Fetched::Cancelled);
    }

    #[test]
    fn ok_extracts_found_only() {
        assert_eq!(Fetched::Found(3).ok(), Some(3));
        assert_eq!(Fetched::<i32>::Missing.ok(), None);
        assert_eq!(Fetched::<i32>::Cancelled.ok(), None);
    }

    #[test]
    fn map_preserves_variant() {
        assert_eq!(Fetched::Found(2).map(|n| n * 2), Fetched::Found(4));
        assert_eq!(Fetched::<i32>::Missing.map(|n| n * 2), Fetched::Missing);
        assert_eq!(Fetched::<i32>::Cancelled.map(|n| n * 2), Fetched::Cancelled);
    }
}
