//! Standard mode: whole-document text with block-level noise filtering.

use scraper::{ElementRef, Html, Selector};

use crate::config::StandardConfig;
use crate::error::AppError;
use crate::models::{
    ExtractionResult, ImageRef, LinkRef, Links, Metadata, ModeMetadata, RawPage, StandardMeta,
};

use super::text::{element_text, truncate_chars, word_count};
use super::{detach_matching, page_title};

pub(super) fn extract(
    dom: &mut Html,
    page: &RawPage,
    config: &StandardConfig,
) -> Result<ExtractionResult, AppError> {
    detach_matching(dom, config.excluded_tags.iter().map(String::as_str));

    let title = page_title(dom);
    let scope = body_or_root(dom);

    let content = collect_text(&scope, config.shared.word_count_threshold);
    let content = truncate_chars(content, config.shared.max_content_length);
    let word_count = word_count(&content);

    let images = if config.skip_images {
        Vec::new()
    } else {
        collect_images(&scope)
    };
    let links = if config.skip_links {
        Links::default()
    } else {
        collect_links(&scope, page, config.exclude_external_links)
    };

    Ok(ExtractionResult {
        url: page.url.to_string(),
        title,
        word_count,
        images,
        links,
        metadata: Metadata {
            crawl_time: 0.0,
            status_code: page.status_code,
            content_length: content.chars().count(),
            mode: ModeMetadata::Standard(StandardMeta {
                extraction_mode: "standard",
            }),
        },
        content,
    })
}

fn body_or_root(dom: &Html) -> ElementRef<'_> {
    Selector::parse("body")
        .ok()
        .and_then(|sel| dom.select(&sel).next())
        .unwrap_or_else(|| dom.root_element())
}

/// Join all text blocks of `scope` in document order, dropping blocks with
/// fewer than `threshold` words. A block is one DOM text node.
fn collect_text(scope: &ElementRef, threshold: usize) -> String {
    let blocks: Vec<String> = scope
        .text()
        .filter_map(|raw| {
            let words: Vec<&str> = raw.split_whitespace().collect();
            if words.is_empty() || words.len() < threshold {
                None
            } else {
                Some(words.join(" "))
            }
        })
        .collect();
    blocks.join(" ")
}

fn collect_images(scope: &ElementRef) -> Vec<ImageRef> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };
    scope
        .select(&selector)
        .filter_map(|el| {
            let src = el.value().attr("src")?;
            Some(ImageRef {
                src: src.to_string(),
                alt: el.value().attr("alt").unwrap_or_default().to_string(),
                title: el.value().attr("title").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Collect anchors, resolving relative hrefs against the page URL and
/// classifying by host. Anchors that don't resolve to http(s) are dropped.
fn collect_links(scope: &ElementRef, page: &RawPage, exclude_external: bool) -> Links {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Links::default();
    };
    let mut links = Links::default();
    for el in scope.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = page.url.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        let link = LinkRef {
            href: resolved.to_string(),
            text: element_text(&el),
        };
        if resolved.host_str() == Some(page.host.as_str()) {
            links.internal.push(link);
        } else if !exclude_external {
            links.external.push(link);
        }
    }
    links
}
