//! Rating link enrichment
//!
//! Rated listings get one extra request to their detail page, which is
//! scanned for an outbound link to the rating site. Enrichment never fails a
//! listing; any problem leaves the link empty.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::{first_link_href, RawListing};
use scraper::Selector;
use std::sync::LazyLock;

/// Rating link selectors in priority order
static RATING_LINK_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        r#"a[itemprop="sameAs"][href*="csfd.cz"]"#,
        r#"a[href*="csfd.cz/film/"]"#,
        r#"a[href*="csfd.sk/film/"]"#,
    ]
    .iter()
    .map(|css| Selector::parse(css).expect("rating link selector is valid"))
    .collect()
});

/// Finds the outbound rating link in a detail page
pub fn find_rating_link(html: &str) -> Option<String> {
    first_link_href(html, &RATING_LINK_SELECTORS)
}

/// Fetches detail pages to resolve rating links
#[derive(Debug, Clone)]
pub struct DetailEnricher {
    fetcher: PageFetcher,
}

impl DetailEnricher {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Returns the rating link for a listing, or an empty string
    ///
    /// Unrated listings (rating 0) are skipped without any network activity.
    pub async fn enrich(&self, listing: &RawListing) -> String {
        if listing.rating == 0 {
            return String::new();
        }

        let html = match self.fetcher.fetch(&listing.detail_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!("Detail fetch failed for {}: {}", listing.id, e);
                return String::new();
            }
        };

        find_rating_link(&html).unwrap_or_default()
    }

    /// Fills in `rating_url` for every listing in place
    pub async fn enrich_all(&self, listings: &mut [RawListing]) {
        for listing in listings.iter_mut() {
            listing.rating_url = self.enrich(listing).await;
        }
    }
}
