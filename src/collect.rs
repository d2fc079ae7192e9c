//! Walks the listing pagination from a start URL

use std::collections::HashSet;

use crate::fetch::Fetch;
use crate::listing::parse_page;
use crate::types::ListingRecord;

/// Collect every record reachable from `start_url` by following next-page
/// links. Stops when a page has no next link, a fetch fails, or a link leads
/// back to a page already read. Whatever was gathered until then is the
/// result; this never fails.
pub fn collect(fetcher: &dyn Fetch, start_url: &str) -> Vec<ListingRecord> {
    let mut records: Vec<ListingRecord> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut next = Some(start_url.to_string());
    let mut pages = 0usize;

    while let Some(url) = next.take() {
        if !visited.insert(url.clone()) {
            tracing::warn!(url = %url, "next-page link points to a visited page, stopping");
            break;
        }

        let html = match fetcher.fetch(&url) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "page fetch failed, stopping");
                break;
            }
        };

        let page = parse_page(&html, &url);
        pages += 1;
        tracing::info!(page = pages, url = %url, records = page.records.len(), "scraped listing page");

        records.extend(page.records);
        next = page.next;
    }

    tracing::info!(pages, records = records.len(), "listing collection finished");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::CannedPages;
    use crate::listing::fixtures;

    const BASE: &str = "https://www.imdb.com/search/title/";

    fn page_url(start: u32) -> String {
        format!("{}?start={}", BASE, start)
    }

    /// `count` pages of five movies, each linking to the following one
    fn site(count: u32) -> CannedPages {
        let mut pages = CannedPages::default();
        for p in 0..count {
            let units: Vec<String> = (1..=5)
                .map(|i| {
                    let rank = p * 5 + i;
                    fixtures::unit(rank, &format!("Movie {}", rank))
                })
                .collect();
            let next = format!("/search/title/?start={}", (p + 1) * 50 + 1);
            pages = pages.with(&page_url(p * 50 + 1), fixtures::page(&units, Some(next.as_str())));
        }
        pages
    }

    #[test]
    fn test_failed_fetch_keeps_collected_records() {
        // The third page links to a fourth that cannot be fetched
        let records = collect(&site(3), &page_url(1));

        assert_eq!(records.len(), 15);
        let ranks: Vec<u32> = records.iter().map(|r| r.rank.unwrap()).collect();
        assert_eq!(ranks, (1..=15).collect::<Vec<_>>());
        assert_eq!(records[14].title.as_deref(), Some("Movie 15"));
    }

    #[test]
    fn test_last_page_without_next_link() {
        let units = vec![fixtures::unit(1, "Only")];
        let pages = CannedPages::default().with(BASE, fixtures::page(&units, None));
        let records = collect(&pages, BASE);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_unreachable_start_page() {
        let records = collect(&CannedPages::default(), BASE);
        assert!(records.is_empty());
    }

    #[test]
    fn test_self_link_terminates() {
        let units = vec![fixtures::unit(1, "Loop")];
        let pages = CannedPages::default().with(
            &page_url(1),
            fixtures::page(&units, Some("/search/title/?start=1")),
        );
        let records = collect(&pages, &page_url(1));
        assert_eq!(records.len(), 1);
    }
}
