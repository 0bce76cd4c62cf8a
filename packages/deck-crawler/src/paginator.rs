//! Listing and standings walk.
//!
//! Turns the paged tournament result listing into a flat list of
//! [`CrawlTarget`]s. Shape of the walk:
//!
//! - One session walks the listing pages, following the next-page
//!   control until a page budget or the event budget runs out.
//! - Every matching event gets a fresh session for its standings walk,
//!   so rank paging never disturbs the listing position.
//! - A listing page is harvested all-or-nothing: when any event on it
//!   fails, the page's accumulated targets and dedup claims are rolled
//!   back, the failure is logged, and the walk continues on the next
//!   page.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::{deck_url, CrawlConfig};
use crate::error::FetchResult;
use crate::renderer::{region, PageRenderer, RenderSession, RenderedRow};
use crate::text::{full_to_half, sole_integer};
use crate::types::CrawlTarget;

/// Standings rows per rendered page.
const RANKS_PER_PAGE: u32 = 8;

/// Ranks up to this render as an exact place; deeper rows render the
/// floor of their elimination bracket.
const EXACT_RANK_MAX: u32 = 2;

/// Page-limit convention: negative walks every page, zero walks none,
/// positive `n` walks at most `n`.
fn within_limit(limit: i32, done: usize) -> bool {
    limit < 0 || done < limit as usize
}

struct PageHarvest {
    targets: Vec<CrawlTarget>,
    events_processed: usize,
}

/// Walk the result listing and collect one target per new deck.
///
/// Deck codes in `skip_codes`, and codes already claimed by an earlier
/// row of this walk, are skipped.
pub async fn collect_targets(
    renderer: &dyn PageRenderer,
    config: &CrawlConfig,
    skip_codes: &HashSet<String>,
) -> FetchResult<Vec<CrawlTarget>> {
    let mut session = renderer.open_session().await?;
    let mut seen = skip_codes.clone();
    let mut targets = Vec::new();
    let mut page_url = config.event_list_url.clone();
    let mut pages_done = 0usize;
    let mut events_done = 0usize;

    while within_limit(config.result_page_limit, pages_done) {
        let seen_snapshot = seen.clone();
        match collect_page(
            renderer,
            session.as_mut(),
            &page_url,
            config,
            &mut seen,
            events_done,
        )
        .await
        {
            Ok(harvest) => {
                events_done += harvest.events_processed;
                targets.extend(harvest.targets);
            }
            Err(error) => {
                // The dedup set rolls back with the page.
                seen = seen_snapshot;
                warn!(url = %page_url, error = %error, "listing page failed, dropping its targets");
            }
        }
        pages_done += 1;

        if events_done >= config.event_limit {
            break;
        }
        if !within_limit(config.result_page_limit, pages_done) {
            break;
        }
        match next_page_url(session.as_mut(), &page_url).await {
            Some(next) => page_url = next,
            None => break,
        }
    }

    info!(
        targets = targets.len(),
        pages = pages_done,
        events = events_done,
        "collected crawl targets"
    );
    Ok(targets)
}

async fn collect_page(
    renderer: &dyn PageRenderer,
    session: &mut dyn RenderSession,
    page_url: &str,
    config: &CrawlConfig,
    seen: &mut HashSet<String>,
    events_done: usize,
) -> FetchResult<PageHarvest> {
    let rows = session.rows(page_url, region::EVENT_ROWS).await?;
    let mut harvest = PageHarvest {
        targets: Vec::new(),
        events_processed: 0,
    };

    for row in rows {
        if events_done + harvest.events_processed >= config.event_limit {
            break;
        }
        let title = row.attr("title").unwrap_or(&row.text);
        if !title.contains(&config.event_title_pattern) {
            continue;
        }
        let event_url = match row.attr("href") {
            Some(href) => href.to_string(),
            None => {
                debug!(url = %page_url, "event row without link");
                continue;
            }
        };
        let participants = row
            .attr("capacity")
            .and_then(|text| sole_integer(&full_to_half(text)));
        let prefecture = row
            .attr("building")
            .and_then(prefecture_from_address)
            .unwrap_or_default();

        harvest.events_processed += 1;
        // An event failure poisons the whole page harvest.
        scan_event(
            renderer,
            &event_url,
            &prefecture,
            participants,
            config,
            seen,
            &mut harvest.targets,
        )
        .await?;
    }

    Ok(harvest)
}

async fn scan_event(
    renderer: &dyn PageRenderer,
    event_url: &str,
    prefecture: &str,
    participants: Option<u32>,
    config: &CrawlConfig,
    seen: &mut HashSet<String>,
    targets: &mut Vec<CrawlTarget>,
) -> FetchResult<()> {
    // Standings pages get their own session.
    let mut session = renderer.open_session().await?;
    let date = session.region_text(event_url, region::EVENT_DATE).await?;

    let mut page_url = event_url.to_string();
    let mut pages_done = 0usize;
    while within_limit(config.deck_page_limit, pages_done) {
        let rows = session.rows(&page_url, region::RANK_ROWS).await?;
        for (row_idx, row) in rows.iter().enumerate() {
            let target =
                match target_from_row(row, row_idx, pages_done, &date, prefecture, participants) {
                    Some(target) => target,
                    None => {
                        debug!(url = %page_url, "standings row without deck link");
                        continue;
                    }
                };
            if seen.insert(target.deck_code.clone()) {
                targets.push(target);
            }
        }
        pages_done += 1;

        if !within_limit(config.deck_page_limit, pages_done) {
            break;
        }
        match next_page_url(session.as_mut(), &page_url).await {
            Some(next) => page_url = next,
            None => break,
        }
    }
    Ok(())
}

async fn next_page_url(session: &mut dyn RenderSession, page_url: &str) -> Option<String> {
    match session.rows(page_url, region::NEXT_PAGE).await {
        Ok(rows) => rows
            .iter()
            .find_map(|row| row.attr("href").map(str::to_string)),
        Err(error) => {
            debug!(url = %page_url, error = %error, "no next page control");
            None
        }
    }
}

fn target_from_row(
    row: &RenderedRow,
    row_idx: usize,
    page_idx: usize,
    date: &str,
    prefecture: &str,
    participants: Option<u32>,
) -> Option<CrawlTarget> {
    let href = row.attr("href")?;
    let deck_code = deck_code_from_url(href)?;
    let rank = reconcile_rank(rendered_rank(row), page_idx, row_idx);
    Some(CrawlTarget {
        url: deck_url(&deck_code),
        deck_code,
        rank,
        date: date.to_string(),
        region: prefecture.to_string(),
        participants,
    })
}

fn deck_code_from_url(url: &str) -> Option<String> {
    let code = url.trim_end_matches('/').rsplit('/').next()?;
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

/// The `rank-n` class token of a standings row, if any.
fn rendered_rank(row: &RenderedRow) -> Option<u32> {
    row.attr("class")?
        .split_whitespace()
        .find_map(|class| class.strip_prefix("rank-"))
        .and_then(|digits| digits.parse().ok())
}

/// Reconcile the rendered rank with the row's position in the walk.
///
/// Rows past the top cut render the floor of their bracket, not an
/// exact place, while the walk position counts every row. The position
/// candidate is adopted only when it falls inside the bracket the
/// rendered rank opens; anything outside keeps the rendered rank.
fn reconcile_rank(rendered: Option<u32>, page_idx: usize, row_idx: usize) -> u32 {
    let candidate = page_idx as u32 * RANKS_PER_PAGE + row_idx as u32 + 1;
    match rendered {
        Some(rank) if rank <= EXACT_RANK_MAX => rank,
        Some(rank) if candidate >= rank && candidate <= 2 * rank - 2 => candidate,
        Some(rank) => rank,
        None => candidate,
    }
}

/// Prefecture from a venue address: cut at the first 県/都/府 marker,
/// then take the last whitespace-separated token (addresses lead with
/// a postal code).
fn prefecture_from_address(address: &str) -> Option<String> {
    let folded = full_to_half(address);
    let (idx, marker) = folded
        .char_indices()
        .find(|(_, c)| matches!(c, '県' | '都' | '府'))?;
    let head = &folded[..idx + marker.len_utf8()];
    head.split_whitespace().last().map(str::to_string)
}
