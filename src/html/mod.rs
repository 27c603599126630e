// src/html/mod.rs

//! Small string utilities over the drafted HTML.
//!
//! - [`sanitize`] strips executable content before anything is streamed.
//! - [`validate`] is the local (no service call) document check run before
//!   quality control.
//! - [`chunk`] slices the final document into streaming increments.

pub mod chunk;
pub mod sanitize;
pub mod validate;

pub use chunk::chunk_chars;
pub use sanitize::sanitize_html;
pub use validate::validate_document;

use crate::types::OutlineSection;

/// Marker that opens every inline section error fragment.
pub const SECTION_ERROR_MARKER: &str = "<p><strong>Error:</strong>";

/// Fragment substituted for a section whose drafting call failed.
pub fn section_error_fragment(section: &OutlineSection, error: &str) -> String {
    format!(
        "<h2>{}</h2>{} {}</p>",
        escape_text(&section.heading()),
        SECTION_ERROR_MARKER,
        escape_text(error)
    )
}

/// Minimal text escaping for values interpolated into HTML.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_fragment_is_labelled_and_escaped() {
        let section = OutlineSection {
            number: "4.".to_string(),
            title: "Fees & Payment".to_string(),
            target_words: 260,
            bullets: Vec::new(),
        };

        let html = section_error_fragment(&section, "HTTP 500: <gateway>");

        assert_eq!(
            html,
            "<h2>4. Fees &amp; Payment</h2><p><strong>Error:</strong> HTTP 500: &lt;gateway&gt;</p>"
        );
    }
}
