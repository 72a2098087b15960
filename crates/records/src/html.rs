//! Locating the embedded XML payload inside an HTML report export.

use scraper::{Html, Selector};

/// Returns the text content of the element with id `marker_id`, if any.
///
/// The exports carry their payload as the raw text of a `<script>` data block, so the text is
/// returned verbatim apart from surrounding whitespace. Entity-escaped payloads placed in ordinary
/// elements are decoded by the HTML parser and work the same way. A marker that is missing or
/// holds only whitespace yields `None`.
pub fn extract_marker_text(html: &str, marker_id: &str) -> Option<String> {
    let selector = Selector::parse(&format!("#{marker_id}")).ok()?;
    let document = Html::parse_document(html);
    let element = document.select(&selector).next()?;

    let text: String = element.text().collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
