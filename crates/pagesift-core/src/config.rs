//! Declarative extraction configuration.
//!
//! Callers send a flat option bag (`ExtractionOptions`); the boundary turns
//! it into one of three typed modes (`ExtractionConfig`) and rejects invalid
//! shapes before anything is fetched.

use indexmap::IndexMap;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Maximum selectors accepted for Selective mode.
pub const MAX_SELECTORS: usize = 10;
/// Maximum selector groups accepted for Array mode.
pub const MAX_ARRAY_GROUPS: usize = 5;
/// Hard cap on `max_content_length`, regardless of what the caller asks for.
pub const MAX_CONTENT_LENGTH_CAP: usize = 20_000;
/// Default truncation bound when the caller doesn't set one.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 5_000;
/// Default minimum words per text block in Standard mode.
pub const DEFAULT_WORD_COUNT_THRESHOLD: usize = 5;

fn default_excluded_tags() -> Vec<String> {
    ["form", "header", "nav", "footer"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Raw per-request options as received over the wire.
///
/// All fields optional; which mode they imply is decided by
/// [`ExtractionConfig::from_options`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionOptions {
    pub max_content_length: Option<usize>,
    pub word_count_threshold: Option<usize>,
    pub use_cache: Option<bool>,

    // Standard mode
    pub excluded_tags: Option<Vec<String>>,
    pub exclude_external_links: Option<bool>,
    pub skip_images: Option<bool>,
    pub skip_links: Option<bool>,

    // Selective mode
    pub selectors: Option<Vec<String>>,
    pub return_sections: Option<bool>,

    // Array mode
    pub array_selectors: Option<IndexMap<String, ArraySelectorSpec>>,
    pub format: Option<ArrayFormat>,

    // Selective + Array
    pub exclude_selectors: Option<Vec<String>>,

    // Batch only; ignored for single-URL requests.
    pub max_concurrent: Option<usize>,
}

/// One group entry under `array_selectors`: either a bare selector string
/// or a full config with sub-selectors and a match limit.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArraySelectorSpec {
    Simple(String),
    Full {
        selector: String,
        #[serde(default)]
        sub_selectors: IndexMap<String, String>,
        limit: Option<usize>,
    },
}

/// Output shaping for Array mode metadata. Controls shape only, never
/// what gets extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayFormat {
    #[default]
    Structured,
    Flat,
    Summary,
}

/// Options common to every extraction mode.
#[derive(Debug, Clone)]
pub struct SharedOptions {
    /// Truncation bound in characters. Always > 0.
    pub max_content_length: usize,
    /// Standard mode: minimum words per block to keep.
    pub word_count_threshold: usize,
    /// Passed through to the fetch adapter, never interpreted here.
    pub use_cache: bool,
}

#[derive(Debug, Clone)]
pub struct StandardConfig {
    pub shared: SharedOptions,
    /// Tag names whose entire subtrees are dropped before text collection.
    pub excluded_tags: Vec<String>,
    pub exclude_external_links: bool,
    pub skip_images: bool,
    pub skip_links: bool,
}

#[derive(Debug, Clone)]
pub struct SelectiveConfig {
    pub shared: SharedOptions,
    /// Ordered, duplicates preserved, order significant.
    pub selectors: Vec<String>,
    pub exclude_selectors: Vec<String>,
    pub return_sections: bool,
}

#[derive(Debug, Clone)]
pub struct ArrayGroup {
    pub selector: String,
    /// field name -> sub-selector, in declared order.
    pub sub_selectors: IndexMap<String, String>,
    /// Cap on matched elements per group; `None` = unbounded.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ArrayConfig {
    pub shared: SharedOptions,
    /// group name -> group config, in declared order.
    pub groups: IndexMap<String, ArrayGroup>,
    pub exclude_selectors: Vec<String>,
    pub format: ArrayFormat,
}

/// A validated extraction request: exactly one of three modes.
#[derive(Debug, Clone)]
pub enum ExtractionConfig {
    Standard(StandardConfig),
    Selective(SelectiveConfig),
    Array(ArrayConfig),
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig::Standard(StandardConfig {
            shared: SharedOptions {
                max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
                word_count_threshold: DEFAULT_WORD_COUNT_THRESHOLD,
                use_cache: true,
            },
            excluded_tags: default_excluded_tags(),
            exclude_external_links: true,
            skip_images: true,
            skip_links: false,
        })
    }
}

impl ExtractionConfig {
    /// Validate raw options and resolve them into a typed mode.
    ///
    /// `selectors` implies Selective, `array_selectors` implies Array,
    /// neither implies Standard; both at once is rejected.
    pub fn from_options(opts: ExtractionOptions) -> Result<Self, AppError> {
        if opts.selectors.is_some() && opts.array_selectors.is_some() {
            return Err(AppError::ValidationError(
                "selectors and array_selectors are mutually exclusive".to_string(),
            ));
        }

        let max_content_length = opts
            .max_content_length
            .unwrap_or(DEFAULT_MAX_CONTENT_LENGTH)
            .min(MAX_CONTENT_LENGTH_CAP);
        if max_content_length == 0 {
            return Err(AppError::ValidationError(
                "max_content_length must be greater than zero".to_string(),
            ));
        }

        let shared = SharedOptions {
            max_content_length,
            word_count_threshold: opts
                .word_count_threshold
                .unwrap_or(DEFAULT_WORD_COUNT_THRESHOLD)
                .max(1),
            use_cache: opts.use_cache.unwrap_or(true),
        };

        if let Some(selectors) = opts.selectors {
            if selectors.is_empty() {
                return Err(AppError::ValidationError(
                    "selectors must not be empty".to_string(),
                ));
            }
            if selectors.len() > MAX_SELECTORS {
                return Err(AppError::ValidationError(format!(
                    "Maximum {MAX_SELECTORS} selectors allowed"
                )));
            }
            validate_selectors(&selectors)?;
            let exclude_selectors = opts.exclude_selectors.unwrap_or_default();
            validate_selectors(&exclude_selectors)?;

            return Ok(ExtractionConfig::Selective(SelectiveConfig {
                shared,
                selectors,
                exclude_selectors,
                return_sections: opts.return_sections.unwrap_or(false),
            }));
        }

        if let Some(specs) = opts.array_selectors {
            if specs.is_empty() {
                return Err(AppError::ValidationError(
                    "array_selectors must be a non-empty map".to_string(),
                ));
            }
            if specs.len() > MAX_ARRAY_GROUPS {
                return Err(AppError::ValidationError(format!(
                    "Maximum {MAX_ARRAY_GROUPS} array selectors allowed"
                )));
            }

            let mut groups = IndexMap::with_capacity(specs.len());
            for (name, spec) in specs {
                let group = match spec {
                    ArraySelectorSpec::Simple(selector) => ArrayGroup {
                        selector,
                        sub_selectors: IndexMap::new(),
                        limit: None,
                    },
                    ArraySelectorSpec::Full {
                        selector,
                        sub_selectors,
                        limit,
                    } => ArrayGroup {
                        selector,
                        sub_selectors,
                        limit,
                    },
                };
                if group.selector.trim().is_empty() {
                    return Err(AppError::ValidationError(format!(
                        "array selector group '{name}' has an empty selector"
                    )));
                }
                validate_selector(&group.selector)?;
                for sub in group.sub_selectors.values() {
                    validate_selector(sub)?;
                }
                groups.insert(name, group);
            }

            let exclude_selectors = opts.exclude_selectors.unwrap_or_default();
            validate_selectors(&exclude_selectors)?;

            return Ok(ExtractionConfig::Array(ArrayConfig {
                shared,
                groups,
                exclude_selectors,
                format: opts.format.unwrap_or_default(),
            }));
        }

        Ok(ExtractionConfig::Standard(StandardConfig {
            shared,
            excluded_tags: opts
                .excluded_tags
                .map(|tags| tags.into_iter().map(|t| t.to_lowercase()).collect())
                .unwrap_or_else(default_excluded_tags),
            exclude_external_links: opts.exclude_external_links.unwrap_or(true),
            skip_images: opts.skip_images.unwrap_or(true),
            skip_links: opts.skip_links.unwrap_or(false),
        }))
    }

    pub fn shared(&self) -> &SharedOptions {
        match self {
            ExtractionConfig::Standard(c) => &c.shared,
            ExtractionConfig::Selective(c) => &c.shared,
            ExtractionConfig::Array(c) => &c.shared,
        }
    }
}

fn validate_selector(selector: &str) -> Result<(), AppError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| AppError::ValidationError(format!("Invalid selector '{selector}': {e}")))
}

fn validate_selectors(selectors: &[String]) -> Result<(), AppError> {
    for selector in selectors {
        validate_selector(selector)?;
    }
    Ok(())
}
