//! HTTP renderer backed by `reqwest` and `scraper`.
//!
//! The tournament site serves its data inside the initial HTML payload
//! and finishes layout in script, so plain HTTP plus CSS selection
//! reaches everything the crawler needs. A session keeps the last
//! fetched document around; the paginator asks several regions of the
//! same page in a row and should not refetch between asks.

use async_trait::async_trait;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::renderer::{region, PageRenderer, RenderSession, RenderedRow};

// Browser-like User-Agent to avoid bot detection
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

lazy_static! {
    static ref CARD_SECTION_SEL: Selector = Selector::parse("#cardListView .Grid_item").unwrap();
    static ref EVENT_ROW_SEL: Selector = Selector::parse(".eventListItem").unwrap();
    static ref RANK_ROW_SEL: Selector = Selector::parse(".c-rankTable-row").unwrap();
    static ref EVENT_DATE_SEL: Selector = Selector::parse(".date-day").unwrap();
    static ref NEXT_PAGE_SEL: Selector = Selector::parse(".btn.next").unwrap();
    static ref ANCHOR_SEL: Selector = Selector::parse("a[href]").unwrap();
    static ref DECK_ANCHOR_SEL: Selector = Selector::parse(".deck a").unwrap();
    static ref TITLE_SEL: Selector = Selector::parse(".title").unwrap();
    static ref CAPACITY_SEL: Selector = Selector::parse(".capacity").unwrap();
    static ref BUILDING_SEL: Selector = Selector::parse(".building").unwrap();
    static ref CELL_SEL: Selector = Selector::parse("td").unwrap();
}

/// [`PageRenderer`] over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    timeout: Duration,
}

impl HttpRenderer {
    pub fn new() -> Self {
        HttpRenderer {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn open_session(&self) -> FetchResult<Box<dyn RenderSession>> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .parse()
                .unwrap(),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "ja,en-US;q=0.8,en;q=0.5".parse().unwrap(),
        );
        headers.insert(reqwest::header::CONNECTION, "keep-alive".parse().unwrap());

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Box::new(HttpSession {
            client,
            current: None,
        }))
    }
}

/// One fetch session. `current` caches the last `(url, html)` pair so
/// repeated region asks against one page cost one request.
struct HttpSession {
    client: reqwest::Client,
    current: Option<(String, String)>,
}

impl HttpSession {
    async fn document(&mut self, url: &str) -> FetchResult<String> {
        if let Some((current_url, html)) = &self.current {
            if current_url == url {
                return Ok(html.clone());
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let html = response.text().await.map_err(|e| request_error(url, e))?;
        self.current = Some((url.to_string(), html.clone()));
        Ok(html)
    }
}

// `scraper::Html` is not `Send`; parsing happens inside the extraction
// helpers after every await has resolved.
#[async_trait]
impl RenderSession for HttpSession {
    async fn region_text(&mut self, url: &str, region: &str) -> FetchResult<String> {
        let html = self.document(url).await?;
        extract_region_text(&html, url, region)
    }

    async fn rows(&mut self, url: &str, region: &str) -> FetchResult<Vec<RenderedRow>> {
        let html = self.document(url).await?;
        extract_rows(&html, url, region)
    }
}

fn request_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http(Box::new(error))
    }
}

fn region_selector(region: &str, url: &str) -> FetchResult<&'static Selector> {
    match region {
        region::CARD_SECTIONS => Ok(&CARD_SECTION_SEL),
        region::EVENT_ROWS => Ok(&EVENT_ROW_SEL),
        region::RANK_ROWS => Ok(&RANK_ROW_SEL),
        region::EVENT_DATE => Ok(&EVENT_DATE_SEL),
        region::NEXT_PAGE => Ok(&NEXT_PAGE_SEL),
        _ => Err(FetchError::MissingRegion {
            region: region.to_string(),
            url: url.to_string(),
        }),
    }
}

fn extract_region_text(html: &str, url: &str, region: &str) -> FetchResult<String> {
    let selector = region_selector(region, url)?;
    let document = Html::parse_document(html);
    match document.select(selector).next() {
        Some(element) => Ok(element_text(element)),
        None => Err(FetchError::MissingRegion {
            region: region.to_string(),
            url: url.to_string(),
        }),
    }
}

fn extract_rows(html: &str, url: &str, region: &str) -> FetchResult<Vec<RenderedRow>> {
    let selector = region_selector(region, url)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(selector)
        .map(|element| element_to_row(element, url, region))
        .collect())
}

/// Text nodes joined on newlines; blank nodes dropped. Deck section
/// cells rely on this producing one line per rendered line.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn element_to_row(element: ElementRef<'_>, base_url: &str, region: &str) -> RenderedRow {
    let mut row = RenderedRow::new(element_text(element));

    let href = match region {
        // Standings rows link players too; only the deck link counts.
        region::RANK_ROWS => element
            .select(&DECK_ANCHOR_SEL)
            .next()
            .and_then(|a| a.value().attr("href")),
        _ => element.value().attr("href").or_else(|| {
            element
                .select(&ANCHOR_SEL)
                .next()
                .and_then(|a| a.value().attr("href"))
        }),
    };
    if let Some(href) = href {
        row = row.with_attr("href", resolve_href(base_url, href));
    }

    match region {
        region::EVENT_ROWS => {
            if let Some(title) = first_text(element, &TITLE_SEL) {
                row = row.with_attr("title", title);
            }
            if let Some(capacity) = first_text(element, &CAPACITY_SEL) {
                row = row.with_attr("capacity", capacity);
            }
            if let Some(building) = first_text(element, &BUILDING_SEL) {
                row = row.with_attr("building", building);
            }
        }
        region::RANK_ROWS => {
            let class = element
                .select(&CELL_SEL)
                .next()
                .and_then(|td| td.value().attr("class"));
            if let Some(class) = class {
                row = row.with_attr("class", class);
            }
        }
        _ => {}
    }

    row
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

fn resolve_href(base: &str, href: &str) -> String {
    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_card_section_text() {
        let html = r#"
            <div id="cardListView">
              <div class="Grid_item">
                <h3>ポケモン (3)</h3>
                <span>CardA</span><span>S1</span><span>001/100</span><span>2枚</span>
                <span>CardB</span><span>S2</span><span>014/100</span><span>1枚</span>
              </div>
              <div class="Grid_item">
                <h3>グッズ (2)</h3>
                <div>ItemX 2枚</div>
              </div>
            </div>
        "#;
        let rows = extract_rows(html, "https://example.com/deck", region::CARD_SECTIONS).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].text,
            "ポケモン (3)\nCardA\nS1\n001/100\n2枚\nCardB\nS2\n014/100\n1枚"
        );
        assert_eq!(rows[1].text, "グッズ (2)\nItemX 2枚");
    }

    #[test]
    fn test_extract_event_rows_carries_attrs() {
        let html = r#"
            <li class="eventListItem">
              <a href="/event/detail/46210/result">
                <span class="title">シティリーグ シーズン2</span>
                <span class="capacity">定員：64人</span>
                <span class="building">〒330-0843 埼玉県さいたま市 会場ビル</span>
              </a>
            </li>
        "#;
        let rows = extract_rows(
            html,
            "https://players.pokemon-card.com/event/result/list",
            region::EVENT_ROWS,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].attr("href"),
            Some("https://players.pokemon-card.com/event/detail/46210/result")
        );
        assert_eq!(rows[0].attr("title"), Some("シティリーグ シーズン2"));
        assert_eq!(rows[0].attr("capacity"), Some("定員：64人"));
        assert_eq!(
            rows[0].attr("building"),
            Some("〒330-0843 埼玉県さいたま市 会場ビル")
        );
    }

    #[test]
    fn test_extract_rank_rows_takes_deck_link_and_rank_class() {
        let html = r#"
            <table>
              <tr class="c-rankTable-row">
                <td class="rank rank-2"></td>
                <td><a href="/player/10023/profile">Player</a></td>
                <td class="deck"><a href="https://www.pokemon-card.com/deck/confirm.html/deckID/xxGGnn-abcdef/">デッキ</a></td>
              </tr>
            </table>
        "#;
        let rows = extract_rows(
            html,
            "https://players.pokemon-card.com/event/detail/46210/result",
            region::RANK_ROWS,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attr("class"), Some("rank rank-2"));
        assert_eq!(
            rows[0].attr("href"),
            Some("https://www.pokemon-card.com/deck/confirm.html/deckID/xxGGnn-abcdef/")
        );
    }

    #[test]
    fn test_next_page_control() {
        let html = r#"<a class="btn next" href="?offset=20">次へ</a>"#;
        let rows = extract_rows(
            html,
            "https://players.pokemon-card.com/event/result/list",
            region::NEXT_PAGE,
        )
        .unwrap();
        assert_eq!(
            rows[0].attr("href"),
            Some("https://players.pokemon-card.com/event/result/list?offset=20")
        );
    }

    #[test]
    fn test_region_text_reads_first_match() {
        let html = r#"<span class="date-day">2023年1月15日(日)</span>"#;
        let text = extract_region_text(html, "https://example.com", region::EVENT_DATE).unwrap();
        assert_eq!(text, "2023年1月15日(日)");
    }

    #[test]
    fn test_missing_region_is_an_error() {
        let err = extract_region_text("<p>empty</p>", "https://example.com", region::EVENT_DATE)
            .unwrap_err();
        assert!(matches!(err, FetchError::MissingRegion { .. }));
    }

    #[test]
    fn test_unknown_region_name_is_an_error() {
        let err = extract_rows("<p></p>", "https://example.com", "sidebar").unwrap_err();
        assert!(matches!(err, FetchError::MissingRegion { .. }));
    }

    #[test]
    fn test_resolve_href_keeps_absolute_urls() {
        assert_eq!(
            resolve_href("https://a.example/list", "https://b.example/deck"),
            "https://b.example/deck"
        );
        assert_eq!(
            resolve_href("https://a.example/event/list", "/event/detail/1/result"),
            "https://a.example/event/detail/1/result"
        );
    }
}
