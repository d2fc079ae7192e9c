//! Field extraction for IMDb "lister" search result pages
//!
//! Every field has its own rule taking the `div.lister-item-content` of one
//! movie and returning `None` when the element is missing or its text does
//! not convert. A broken field never affects the others.

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::types::{Gross, ListingRecord, PageResult};

const UNIT: &str = "div.lister-item-content";
const NEXT_PAGE: &str = "a.lister-page-next.next-page";

fn select_all<'a>(unit: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => unit.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn first<'a>(unit: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    select_all(unit, css).into_iter().next()
}

/// Element text with runs of whitespace collapsed to one space
fn clean_text(el: ElementRef) -> String {
    let text: String = el.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

pub fn title(unit: ElementRef) -> Option<String> {
    first(unit, "h3 a").map(clean_text).and_then(non_empty)
}

/// "1,234." -> 1234
pub fn rank(unit: ElementRef) -> Option<u32> {
    let text = clean_text(first(unit, "h3 span.lister-item-index")?);
    text.replace(['(', ')', '.', ','], "").trim().parse().ok()
}

/// "(2009)" or "(I) (2009)" -> 2009
pub fn year(unit: ElementRef) -> Option<i32> {
    let text = clean_text(first(unit, "h3 span.lister-item-year")?);
    parse_year(&text.replace(['(', ')'], " "))
}

fn parse_year(text: &str) -> Option<i32> {
    for word in text.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_ascii_digit());
        if word.len() == 4 {
            if let Ok(year) = word.parse::<i32>() {
                if (1800..=2100).contains(&year) {
                    return Some(year);
                }
            }
        }
    }
    None
}

/// "162 min" -> 162
pub fn runtime_minutes(unit: ElementRef) -> Option<u32> {
    let text = clean_text(first(unit, "p span.runtime")?);
    text.trim_end_matches("min").replace(',', "").trim().parse().ok()
}

pub fn genre(unit: ElementRef) -> Option<String> {
    first(unit, "p span.genre").map(clean_text).and_then(non_empty)
}

pub fn rating(unit: ElementRef) -> Option<f64> {
    let text = clean_text(first(unit, "div.ratings-imdb-rating")?);
    text.replace('%', "").trim().parse().ok()
}

pub fn metascore(unit: ElementRef) -> Option<u32> {
    let text = clean_text(first(unit, "span.metascore")?);
    text.replace(' ', "").parse().ok()
}

/// The plot line is the second muted paragraph; the first holds runtime and genre.
pub fn synopsis(unit: ElementRef) -> Option<String> {
    select_all(unit, "p.text-muted")
        .into_iter()
        .nth(1)
        .map(clean_text)
        .and_then(non_empty)
}

/// "Director: A | Stars: B, C", from the paragraph with an empty class
fn credits_segment(unit: ElementRef, index: usize) -> Option<String> {
    let paragraph = select_all(unit, "p")
        .into_iter()
        .find(|p| p.value().attr("class").map_or(false, |c| c.trim().is_empty()))?;
    let text = clean_text(paragraph);
    let segment = text.split('|').nth(index)?.trim();

    let segment = match segment.split_once(':') {
        Some((label, rest))
            if matches!(label.trim(), "Director" | "Directors" | "Star" | "Stars") =>
        {
            rest.trim()
        }
        _ => segment,
    };
    non_empty(segment.to_string())
}

pub fn director(unit: ElementRef) -> Option<String> {
    credits_segment(unit, 0)
}

pub fn stars(unit: ElementRef) -> Option<String> {
    credits_segment(unit, 1)
}

/// Votes and gross come from the same `span[name=nv]` list. With a single
/// span the movie has votes but no reported gross.
pub fn votes_and_gross(unit: ElementRef) -> (Option<u64>, Option<Gross>) {
    let spans = select_all(unit, "span[name=\"nv\"]");

    let votes = spans
        .first()
        .and_then(|span| clean_text(*span).replace(',', "").parse().ok());

    let gross = match spans.len() {
        0 => None,
        1 => Some(Gross::NotReported),
        _ => non_empty(clean_text(spans[1])).map(Gross::Reported),
    };

    (votes, gross)
}

/// Build one record, running every field rule exactly once
pub fn extract(unit: ElementRef) -> ListingRecord {
    let (votes, gross) = votes_and_gross(unit);
    let record = ListingRecord {
        rank: rank(unit),
        title: title(unit),
        year: year(unit),
        runtime_minutes: runtime_minutes(unit),
        genre: genre(unit),
        rating: rating(unit),
        metascore: metascore(unit),
        votes,
        gross,
        synopsis: synopsis(unit),
        director: director(unit),
        stars: stars(unit),
    };

    let missing = record.missing_fields();
    if !missing.is_empty() {
        tracing::debug!(
            rank = ?record.rank,
            title = record.title.as_deref().unwrap_or("?"),
            missing = %missing.join(", "),
            "incomplete listing record"
        );
    }
    record
}

/// Parse one listing page: all records in page order and the absolute URL of
/// the following page, if the page links one.
pub fn parse_page(html: &str, page_url: &str) -> PageResult {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let records = select_all(root, UNIT).into_iter().map(extract).collect();

    let next = first(root, NEXT_PAGE)
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| match Url::parse(page_url).and_then(|base| base.join(href)) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!(page_url, href, error = %e, "unusable next-page link");
                None
            }
        });

    PageResult { records, next }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn extract_from(html: &str) -> ListingRecord {
        let document = Html::parse_document(html);
        let unit = first(document.root_element(), UNIT).unwrap();
        extract(unit)
    }

    #[test]
    fn test_extract_complete_unit() {
        let record = extract_from(&fixtures::unit(1, "Avatar"));

        assert!(record.missing_fields().is_empty(), "{:?}", record);
        assert_eq!(record.rank, Some(1));
        assert_eq!(record.title.as_deref(), Some("Avatar"));
        assert_eq!(record.year, Some(2009));
        assert_eq!(record.runtime_minutes, Some(162));
        assert_eq!(record.genre.as_deref(), Some("Action, Adventure, Fantasy"));
        assert_eq!(record.rating, Some(7.8));
        assert_eq!(record.metascore, Some(83));
        assert_eq!(record.votes, Some(1_187_375));
        assert_eq!(record.gross, Some(Gross::Reported("$760.51M".to_string())));
        assert_eq!(
            record.synopsis.as_deref(),
            Some("A paraplegic Marine dispatched to the moon Pandora becomes torn.")
        );
        assert_eq!(record.director.as_deref(), Some("James Cameron"));
        assert_eq!(record.stars.as_deref(), Some("Sam Worthington, Zoe Saldana"));
    }

    #[test]
    fn test_missing_element_only_affects_its_field() {
        let html = fixtures::unit(7, "Dune").replace(r#"<span class="runtime">162 min</span>"#, "");
        let record = extract_from(&html);

        assert_eq!(record.missing_fields(), vec!["runtime_minutes"]);
        assert_eq!(record.rank, Some(7));
        assert_eq!(record.title.as_deref(), Some("Dune"));
        assert_eq!(record.genre.as_deref(), Some("Action, Adventure, Fantasy"));
    }

    #[test]
    fn test_unconvertible_text_is_absent() {
        let html = fixtures::unit(3, "Alien").replace("83        ", "tbd");
        let record = extract_from(&html);
        assert_eq!(record.missing_fields(), vec!["metascore"]);
    }

    #[test]
    fn test_single_named_span_marks_gross_not_reported() {
        let html = fixtures::unit(2, "Moon")
            .replace(r#"<span name="nv" data-value="760,507,625">$760.51M</span>"#, "");
        let record = extract_from(&html);

        assert_eq!(record.votes, Some(1_187_375));
        assert_eq!(record.gross, Some(Gross::NotReported));
    }

    #[test]
    fn test_no_named_spans() {
        let html = fixtures::unit(2, "Moon").replace("name=\"nv\"", "name=\"other\"");
        let record = extract_from(&html);

        assert_eq!(record.votes, None);
        assert_eq!(record.gross, None);
        assert_eq!(record.missing_fields(), vec!["votes", "gross"]);
    }

    #[test]
    fn test_credits_without_stars() {
        let html = fixtures::unit(4, "Solaris").replace(
            r#"<span class="ghost">|</span>
    Stars:"#,
            "",
        );
        let record = extract_from(&html);
        assert!(record.director.is_some());
        assert_eq!(record.stars, None);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year(" 2009 "), Some(2009));
        assert_eq!(parse_year(" I   2019 "), Some(2019));
        assert_eq!(parse_year("TV Movie"), None);
        assert_eq!(parse_year("0042"), None);
    }

    #[test]
    fn test_parse_page_keeps_order_and_resolves_next() {
        let units = vec![fixtures::unit(1, "Avatar"), fixtures::unit(2, "Avengers")];
        let html = fixtures::page(&units, Some("/search/title/?start=51&amp;ref_=adv_nxt"));
        let page = parse_page(&html, "https://www.imdb.com/search/title/?genres=sci-fi");

        let titles: Vec<_> = page.records.iter().map(|r| r.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["Avatar", "Avengers"]);
        assert_eq!(
            page.next.as_deref(),
            Some("https://www.imdb.com/search/title/?start=51&ref_=adv_nxt")
        );
    }

    #[test]
    fn test_parse_page_without_next_link() {
        let html = fixtures::page(&[fixtures::unit(1, "Avatar")], None);
        let page = parse_page(&html, "https://www.imdb.com/search/title/");
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.next, None);
    }
}
