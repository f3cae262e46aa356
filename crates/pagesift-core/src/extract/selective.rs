//! Selective mode: caller-ordered CSS selector sections.

use indexmap::IndexMap;
use scraper::{ElementRef, Html};

use crate::config::SelectiveConfig;
use crate::error::AppError;
use crate::models::{
    ExtractionResult, Links, Metadata, ModeMetadata, RawPage, Section, SelectiveMeta,
};

use super::text::{element_text, truncate_chars, word_count};
use super::{page_title, parse_selector};

pub(super) fn extract(
    dom: &Html,
    page: &RawPage,
    config: &SelectiveConfig,
) -> Result<ExtractionResult, AppError> {
    let mut sections: IndexMap<String, Section> = IndexMap::with_capacity(config.selectors.len());
    let mut assembly: Vec<String> = Vec::new();

    for (position, selector_str) in config.selectors.iter().enumerate() {
        let selector = parse_selector(selector_str)?;
        let elements: Vec<ElementRef> = dom.select(&selector).collect();
        let content = elements
            .iter()
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        // Unmatched selectors still get a section entry; only matched ones
        // contribute to the assembled content.
        if !elements.is_empty() {
            assembly.push(format!("[{selector_str}]\n{content}"));
        }

        let word_count = word_count(&content);
        sections.insert(
            format!("selector_{}_{}", position + 1, selector_str),
            Section {
                selector: selector_str.clone(),
                content,
                element_count: elements.len(),
                word_count,
            },
        );
    }

    let content = truncate_chars(assembly.join("\n\n"), config.shared.max_content_length);
    let word_count = word_count(&content);

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
            mode: ModeMetadata::Selective(SelectiveMeta {
                extraction_mode: "selective",
                selectors_used: config.selectors.clone(),
                total_sections: sections.len(),
                sections: config.return_sections.then_some(sections),
            }),
        },
        content,
    })
}

#[cfg(test)]
mod tests {
    use crate::config::{ExtractionConfig, ExtractionOptions};
    use crate::extract::extract;
    use crate::models::{ModeMetadata, RawPage};

    fn page(html: &str) -> RawPage {
        let url = url::Url::parse("https://example.com/").unwrap();
        RawPage::new(url, html.to_string(), 200).unwrap()
    }

    fn config(value: serde_json::Value) -> ExtractionConfig {
        let opts: ExtractionOptions = serde_json::from_value(value).unwrap();
        ExtractionConfig::from_options(opts).unwrap()
    }

    const DOC: &str = r#"<html><head><title>Doc</title></head><body>
        <div class="a">Hello world</div>
        <div class="b">Foo bar baz</div>
        <div class="b">second b</div>
        </body></html>"#;

    #[test]
    fn assembles_labeled_sections_in_request_order() {
        let cfg = config(serde_json::json!({"selectors": [".a", ".b"]}));
        let result = extract(&page(DOC), &cfg).unwrap();
        assert_eq!(
            result.content,
            "[.a]\nHello world\n\n[.b]\nFoo bar baz second b"
        );
    }

    #[test]
    fn unmatched_selector_reported_but_not_assembled() {
        let cfg = config(serde_json::json!({
            "selectors": [".a", ".missing"],
            "return_sections": true
        }));
        let result = extract(&page(DOC), &cfg).unwrap();
        assert!(!result.content.contains(".missing"));

        let ModeMetadata::Selective(meta) = &result.metadata.mode else {
            panic!("expected selective metadata");
        };
        assert_eq!(meta.total_sections, 2);
        let sections = meta.sections.as_ref().unwrap();
        let missing = &sections["selector_2_.missing"];
        assert_eq!(missing.element_count, 0);
        assert_eq!(missing.content, "");
    }

    #[test]
    fn sections_omitted_unless_requested() {
        let cfg = config(serde_json::json!({"selectors": [".a"]}));
        let result = extract(&page(DOC), &cfg).unwrap();
        let ModeMetadata::Selective(meta) = &result.metadata.mode else {
            panic!("expected selective metadata");
        };
        assert!(meta.sections.is_none());
        assert_eq!(meta.selectors_used, vec![".a"]);
    }

    #[test]
    fn duplicate_selectors_produce_distinct_sections() {
        let cfg = config(serde_json::json!({
            "selectors": [".a", ".a"],
            "return_sections": true
        }));
        let result = extract(&page(DOC), &cfg).unwrap();
        let ModeMetadata::Selective(meta) = &result.metadata.mode else {
            panic!("expected selective metadata");
        };
        let sections = meta.sections.as_ref().unwrap();
        assert!(sections.contains_key("selector_1_.a"));
        assert!(sections.contains_key("selector_2_.a"));
    }
}
