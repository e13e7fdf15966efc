//! Media locator extraction from feed markup
//!
//! This module handles parsing a feed page to extract:
//! - The "no posts found" marker that signals an empty page
//! - Media locators from post images and typed video sources

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Marker element rendered on a page past the end of the feed
const EMPTY_RESULT_SELECTOR: &str = ".no_posts_found";

/// Post media elements carrying a locator
const MEDIA_SELECTOR: &str = ".post_media img, .post_media video > source";

/// Returns true if the page carries the empty-result marker
pub fn has_empty_result(html: &str) -> bool {
    let document = Html::parse_document(html);
    match Selector::parse(EMPTY_RESULT_SELECTOR) {
        Ok(selector) => document.select(&selector).next().is_some(),
        Err(_) => false,
    }
}

/// Extracts media locators in document order
///
/// # Extraction Rules
///
/// - `<img>` inside `.post_media`: the `src` attribute
/// - `<source>` directly under a `<video>` inside `.post_media`: the `src`
///   attribute, followed by `.` and the media subtype when the `type`
///   attribute names one (`video/mp4` gives `<src>.mp4`)
///
/// `src` is resolved against `page_url`. Elements without a usable `src`
/// are skipped. The same locator may appear more than once.
///
/// # Example
///
/// ```
/// use likes_harvester::driver::extract_media_locators;
/// use url::Url;
///
/// let html = r#"<div class="post_media">
///     <video><source src="https://va.example/v" type="video/mp4"></video>
/// </div>"#;
/// let page = Url::parse("https://www.example.com/likes?page=0").unwrap();
/// assert_eq!(extract_media_locators(html, &page), vec!["https://va.example/v.mp4"]);
/// ```
pub fn extract_media_locators(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(MEDIA_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| locator_for(element, page_url))
        .collect()
}

/// Computes the locator for one media element
fn locator_for(element: ElementRef<'_>, page_url: &Url) -> Option<String> {
    let src = resolve_src(element.value().attr("src")?, page_url)?;

    if element.value().name() != "source" {
        return Some(src);
    }

    let subtype = element
        .value()
        .attr("type")
        .map(|t| t.replacen("video/", "", 1))
        .unwrap_or_default();

    if subtype.is_empty() {
        Some(src)
    } else {
        Some(format!("{}.{}", src, subtype))
    }
}

/// Resolves a `src` attribute to an absolute URL
///
/// Returns None for empty values and anything that is not http(s) after
/// resolution (data URIs, blob URLs).
fn resolve_src(src: &str, page_url: &Url) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    match page_url.join(src) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
