use indexmap::IndexMap;
use serde::Serialize;
use url::Url;

use crate::config::ArrayFormat;
use crate::error::AppError;

/// A fetched page as handed over by the fetch adapter.
///
/// Immutable once produced; owned by the extraction call that consumes it.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub url: Url,
    /// Resolved host, used for internal/external link classification.
    pub host: String,
    pub html: String,
    pub status_code: u16,
}

impl RawPage {
    pub fn new(url: Url, html: String, status_code: u16) -> Result<Self, AppError> {
        let host = url
            .host_str()
            .ok_or_else(|| AppError::FetchError(format!("URL has no host: {url}")))?
            .to_string();
        Ok(Self {
            url,
            host,
            html,
            status_code,
        })
    }
}

/// An image reference collected in Standard mode, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub src: String,
    pub alt: String,
    pub title: String,
}

/// An anchor collected in Standard mode; `href` is resolved to absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRef {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Links {
    pub internal: Vec<LinkRef>,
    pub external: Vec<LinkRef>,
}

/// One Selective-mode section, keyed by `selector_<index>_<selector>`.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub selector: String,
    pub content: String,
    pub element_count: usize,
    pub word_count: usize,
}

/// One matched element in an Array-mode group.
#[derive(Debug, Clone, Serialize)]
pub struct ArrayItem {
    pub index: usize,
    pub main_content: String,
    /// Resolved sub-selector fields, in declared order. Missing matches
    /// are absent, not empty.
    #[serde(flatten)]
    pub fields: IndexMap<String, String>,
    pub word_count: usize,
    pub char_count: usize,
}

/// Full per-group extraction output (the `structured` view).
#[derive(Debug, Clone, Serialize)]
pub struct GroupResult {
    pub selector: String,
    pub items: Vec<ArrayItem>,
    pub count: usize,
    /// Field names that matched at least once across items.
    pub sub_selectors_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlatItem {
    pub group: String,
    #[serde(flatten)]
    pub item: ArrayItem,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub count: usize,
    pub selector: String,
    /// `main_content` of the first three items.
    pub items: Vec<String>,
}

/// Array metadata shaped per the requested `format`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ArraysView {
    Structured(IndexMap<String, GroupResult>),
    Flat(Vec<FlatItem>),
    Summary(IndexMap<String, GroupSummary>),
}

#[derive(Debug, Clone, Serialize)]
pub struct StandardMeta {
    pub extraction_mode: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectiveMeta {
    pub extraction_mode: &'static str,
    pub selectors_used: Vec<String>,
    pub total_sections: usize,
    /// Only present when the caller asked for `return_sections`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<IndexMap<String, Section>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrayMeta {
    pub extraction_mode: &'static str,
    pub format: ArrayFormat,
    pub array_selectors_used: Vec<String>,
    pub total_items_extracted: usize,
    pub arrays: ArraysView,
}

/// Mode-specific result metadata. The serializer emits whichever optional
/// fields the variant carries; extraction code never branches on flags to
/// shape output.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ModeMetadata {
    Standard(StandardMeta),
    Selective(SelectiveMeta),
    Array(ArrayMeta),
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    /// Fetch + extract wall time in seconds, set by the pipeline.
    pub crawl_time: f64,
    pub status_code: u16,
    pub content_length: usize,
    #[serde(flatten)]
    pub mode: ModeMetadata,
}

/// A completed extraction. Produced once, never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub url: String,
    pub title: String,
    pub content: String,
    pub word_count: usize,
    pub images: Vec<ImageRef>,
    pub links: Links,
    pub metadata: Metadata,
}
