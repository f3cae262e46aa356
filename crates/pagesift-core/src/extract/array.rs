//! Array mode: repeated-structure extraction into named groups.

use std::collections::HashSet;

use indexmap::IndexMap;
use scraper::{ElementRef, Html};

use crate::config::{ArrayConfig, ArrayFormat};
use crate::error::AppError;
use crate::models::{
    ArrayItem, ArrayMeta, ArraysView, ExtractionResult, FlatItem, GroupResult, GroupSummary, Links,
    Metadata, ModeMetadata, RawPage,
};

use super::text::{element_text, truncate_chars, word_count};
use super::{page_title, parse_selector};

/// How many item previews a summary-view group carries.
const SUMMARY_PREVIEW_ITEMS: usize = 3;

pub(super) fn extract(
    dom: &Html,
    page: &RawPage,
    config: &ArrayConfig,
) -> Result<ExtractionResult, AppError> {
    let mut groups: IndexMap<String, GroupResult> = IndexMap::with_capacity(config.groups.len());
    let mut total_items = 0;

    for (name, group) in &config.groups {
        let selector = parse_selector(&group.selector)?;
        let mut elements: Vec<ElementRef> = dom.select(&selector).collect();
        if let Some(limit) = group.limit {
            elements.truncate(limit);
        }

        let mut matched_fields: HashSet<&str> = HashSet::new();
        let mut items = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            items.push(extract_item(index, element, group, &mut matched_fields)?);
        }

        total_items += items.len();
        let sub_selectors_used = group
            .sub_selectors
            .keys()
            .filter(|field| matched_fields.contains(field.as_str()))
            .cloned()
            .collect();
        groups.insert(
            name.clone(),
            GroupResult {
                selector: group.selector.clone(),
                count: items.len(),
                items,
                sub_selectors_used,
            },
        );
    }

    let content = truncate_chars(render_content(&groups), config.shared.max_content_length);
    // Top-level word count sums the items, not the rendered text, so it is
    // stable across formats and truncation.
    let word_count = groups
        .values()
        .flat_map(|g| g.items.iter())
        .map(|item| item.word_count)
        .sum();

    let array_selectors_used = groups.keys().cloned().collect();
    let arrays = shape_view(groups, config.format);

    Ok(ExtractionResult {
        url: page.url.to_string(),
        title: page_title(dom),
        word_count,
        images: Vec::new(),
        links: Links::default(),
        metadata: Metadata {
            crawl_time: 0.0,
            status_code: page.status_code,
            content_length: content.chars().count(),
            mode: ModeMetadata::Array(ArrayMeta {
                extraction_mode: "array",
                format: config.format,
                array_selectors_used,
                total_items_extracted: total_items,
                arrays,
            }),
        },
        content,
    })
}

/// Resolve one matched element into an item.
///
/// Each sub-selector takes the first match inside the element; misses leave
/// the field absent. `main_content` joins the resolved fields in declared
/// order, falling back to the element's own text for groups without
/// sub-selectors.
fn extract_item<'a>(
    index: usize,
    element: &ElementRef,
    group: &'a crate::config::ArrayGroup,
    matched_fields: &mut HashSet<&'a str>,
) -> Result<ArrayItem, AppError> {
    let mut fields = IndexMap::new();
    for (field, sub_selector_str) in &group.sub_selectors {
        let sub_selector = parse_selector(sub_selector_str)?;
        if let Some(matched) = element.select(&sub_selector).next() {
            fields.insert(field.clone(), element_text(&matched));
            matched_fields.insert(field.as_str());
        }
    }

    let main_content = if group.sub_selectors.is_empty() {
        element_text(element)
    } else {
        fields.values().cloned().collect::<Vec<_>>().join(" ")
    };

    Ok(ArrayItem {
        index,
        word_count: word_count(&main_content),
        char_count: main_content.chars().count(),
        main_content,
        fields,
    })
}

/// Human-readable rendering of all groups for the `content` field.
fn render_content(groups: &IndexMap<String, GroupResult>) -> String {
    let mut blocks = Vec::new();
    for (name, group) in groups {
        if group.items.is_empty() {
            continue;
        }
        blocks.push(format!(
            "=== {} ({} items) ===",
            name.to_uppercase(),
            group.count
        ));
        for item in &group.items {
            let mut block = format!("[Item {}]", item.index + 1);
            if item.fields.is_empty() {
                if !item.main_content.is_empty() {
                    block.push('\n');
                    block.push_str(&item.main_content);
                }
            } else {
                for (field, value) in &item.fields {
                    if !value.is_empty() {
                        block.push_str(&format!("\n{field}: {value}"));
                    }
                }
            }
            blocks.push(block);
        }
    }
    blocks.join("\n\n")
}

fn shape_view(groups: IndexMap<String, GroupResult>, format: ArrayFormat) -> ArraysView {
    match format {
        ArrayFormat::Structured => ArraysView::Structured(groups),
        ArrayFormat::Flat => ArraysView::Flat(
            groups
                .into_iter()
                .flat_map(|(name, group)| {
                    group.items.into_iter().map(move |item| FlatItem {
                        group: name.clone(),
                        item,
                    })
                })
                .collect(),
        ),
        ArrayFormat::Summary => ArraysView::Summary(
            groups
                .into_iter()
                .map(|(name, group)| {
                    let summary = GroupSummary {
                        count: group.count,
                        selector: group.selector,
                        items: group
                            .items
                            .into_iter()
                            .take(SUMMARY_PREVIEW_ITEMS)
                            .map(|item| item.main_content)
                            .collect(),
                    };
                    (name, summary)
                })
                .collect(),
        ),
    }
}
