//! Web search augmentation for waldo
//!
//! Issues a query against the DuckDuckGo HTML endpoint, scrapes the result
//! nodes into structured hits and formats them into a text block suitable as
//! model context.

use scraper::{Html, Selector};
use thiserror::Error;
use waldo_types::{format_hits, SearchHit};

/// Hits retained per query, in source ranking order.
pub const RESULT_LIMIT: usize = 5;

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

// The HTML endpoint serves degraded markup to unrecognized clients, so the
// request masquerades as a desktop browser.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_1) \
AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search backend unavailable (status {0})")]
    Unavailable(u16),
}

/// Structured hits plus the formatted block embedded as completion context.
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub formatted: String,
    pub hits: Vec<SearchHit>,
}

/// Query the search backend and parse the result page.
///
/// A non-success status fails the call before anything is parsed, so no
/// augmented prompt is ever built from an error page.
pub async fn search(http: &reqwest::Client, query: &str) -> Result<SearchContext, SearchError> {
    let response = http
        .get(SEARCH_ENDPOINT)
        .query(&[("q", query)])
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Unavailable(status.as_u16()));
    }

    let body = response.text().await?;
    Ok(parse_results(&body))
}

/// Scrape result nodes out of the page markup.
///
/// Selection is by the fixed `.web-result` class marker; each node yields
/// its title, snippet and link. The collection stops at the first
/// [`RESULT_LIMIT`] nodes.
pub fn parse_results(html: &str) -> SearchContext {
    // Static selectors; failing to parse one is a programming error.
    let result = Selector::parse(".web-result").expect("result selector");
    let title = Selector::parse(".result__a").expect("title selector");
    let snippet = Selector::parse(".result__snippet").expect("snippet selector");

    let document = Html::parse_document(html);
    let mut hits = Vec::new();
    for node in document.select(&result).take(RESULT_LIMIT) {
        let title_node = node.select(&title).next();
        let hit = SearchHit {
            title: title_node
                .map(|n| n.text().collect::<String>().trim().to_string())
                .unwrap_or_default(),
            snippet: node
                .select(&snippet)
                .next()
                .map(|n| n.text().collect::<String>().trim().to_string())
                .unwrap_or_default(),
            url: title_node
                .and_then(|n| n.value().attr("href"))
                .unwrap_or_default()
                .to_string(),
        };
        hits.push(hit);
    }

    SearchContext {
        formatted: format_hits(&hits),
        hits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_node(index: usize) -> String {
        format!(
            r#"<div class="web-result">
                 <a class="result__a" href="https://example.com/{index}">Result {index}</a>
                 <a class="result__snippet">Snippet {index}</a>
               </div>"#
        )
    }

    fn page(count: usize) -> String {
        let nodes: String = (0..count).map(result_node).collect();
        format!("<html><body><div id=\"links\">{nodes}</div></body></html>")
    }

    #[test]
    fn few_results_are_all_collected_in_order() {
        let context = parse_results(&page(3));
        assert_eq!(context.hits.len(), 3);
        let titles: Vec<&str> = context.hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Result 0", "Result 1", "Result 2"]);
        assert_eq!(context.hits[1].url, "https://example.com/1");
        assert_eq!(context.hits[1].snippet, "Snippet 1");
    }

    #[test]
    fn many_results_stop_at_the_documented_bound() {
        let context = parse_results(&page(9));
        assert_eq!(context.hits.len(), RESULT_LIMIT);
        assert_eq!(context.hits.last().unwrap().title, "Result 4");
    }

    #[test]
    fn formatted_block_matches_hit_list() {
        let context = parse_results(&page(1));
        assert_eq!(
            context.formatted,
            "Title: Result 0\nDescription: Snippet 0\n\n"
        );
    }

    #[test]
    fn pages_without_result_nodes_yield_nothing() {
        let context = parse_results("<html><body><p>no results</p></body></html>");
        assert!(context.hits.is_empty());
        assert!(context.formatted.is_empty());
    }
}
