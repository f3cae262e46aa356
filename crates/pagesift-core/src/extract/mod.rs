//! Pure HTML-to-result extraction.
//!
//! Everything in this module is synchronous and side-effect free: it takes
//! a fetched page plus a validated config and produces an
//! [`ExtractionResult`]. The parsed DOM never crosses an `await` point,
//! which is why the async pipeline calls into here only after the fetch
//! has fully completed.

mod array;
mod selective;
mod standard;
pub mod text;

use scraper::{Html, Selector};

use crate::config::ExtractionConfig;
use crate::error::AppError;
use crate::models::{ExtractionResult, RawPage};

use text::{element_text, truncate_chars};

/// Tags whose subtrees are removed before any mode runs, always.
const ALWAYS_REMOVED_TAGS: [&str; 3] = ["script", "style", "noscript"];

/// Maximum characters kept from the document title.
const MAX_TITLE_LENGTH: usize = 200;

/// Run the configured extraction mode against a fetched page.
pub fn extract(page: &RawPage, config: &ExtractionConfig) -> Result<ExtractionResult, AppError> {
    let mut dom = Html::parse_document(&page.html);
    detach_matching(&mut dom, ALWAYS_REMOVED_TAGS.iter().copied());

    match config {
        ExtractionConfig::Standard(config) => standard::extract(&mut dom, page, config),
        ExtractionConfig::Selective(config) => {
            detach_matching(&mut dom, config.exclude_selectors.iter().map(String::as_str));
            selective::extract(&dom, page, config)
        }
        ExtractionConfig::Array(config) => {
            detach_matching(&mut dom, config.exclude_selectors.iter().map(String::as_str));
            array::extract(&dom, page, config)
        }
    }
}

/// Detach every subtree matching any of `selectors` from the document.
///
/// Lenient on purpose: selectors from request bodies are validated at the
/// boundary, and tag names from `excluded_tags` that fail to parse are
/// skipped with a warning rather than failing the whole extraction.
fn detach_matching<'a>(dom: &mut Html, selectors: impl Iterator<Item = &'a str>) {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            tracing::warn!(selector = raw, "skipping unparseable exclude selector");
            continue;
        };
        let ids: Vec<_> = dom.select(&selector).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = dom.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::ExtractionError(format!("Invalid selector '{selector}': {e}")))
}

/// Document title, whitespace-normalized and capped at 200 characters.
fn page_title(dom: &Html) -> String {
    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| dom.select(&sel).next())
        .map(|el| element_text(&el))
        .unwrap_or_default();
    truncate_chars(title, MAX_TITLE_LENGTH)
}
