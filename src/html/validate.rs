// src/html/validate.rs

//! Local document check.
//!
//! Runs without any service call and never fails the job: findings are
//! logged and handed to the quality-control review as known issues.

use std::sync::OnceLock;

use regex::Regex;

use super::SECTION_ERROR_MARKER;
use crate::types::Outline;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"(?i)\[\s*(insert|tbd|placeholder|name of|date)[^\]]*\]")
            .expect("placeholder pattern")
    })
}

/// Return human-readable issues found in the merged document.
pub fn validate_document(html: &str, outline: &Outline) -> Vec<String> {
    let mut issues = Vec::new();
    let lowered = html.to_lowercase();

    for section in &outline.sections {
        if !lowered.contains(&section.title.to_lowercase()) {
            issues.push(format!(
                "section \"{}\" is missing from the document",
                section.heading()
            ));
        }
    }

    let failed = html.matches(SECTION_ERROR_MARKER).count();
    if failed > 0 {
        issues.push(format!("{failed} section(s) could not be drafted"));
    }

    for found in placeholder().find_iter(html) {
        issues.push(format!("placeholder text left in document: {}", found.as_str()));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutlineSection;

    fn outline(titles: &[&str]) -> Outline {
        Outline {
            sections: titles
                .iter()
                .enumerate()
                .map(|(i, t)| OutlineSection {
                    number: format!("{}.", i + 1),
                    title: t.to_string(),
                    target_words: 200,
                    bullets: Vec::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn clean_document_has_no_issues() {
        let html = "<h2>1. Definitions</h2><p>x</p><h2>2. Confidentiality</h2><p>y</p>";
        assert!(validate_document(html, &outline(&["Definitions", "Confidentiality"])).is_empty());
    }

    #[test]
    fn reports_missing_sections_placeholders_and_failures() {
        let html = "<h2>1. Definitions</h2><p>Fee of [insert amount].</p>\
                    <h2>3. Term</h2><p><strong>Error:</strong> timeout</p>";

        let issues = validate_document(html, &outline(&["Definitions", "Confidentiality", "Term"]));

        assert_eq!(issues.len(), 3);
        assert!(issues[0].contains("2. Confidentiality"));
        assert!(issues[1].contains("1 section(s)"));
        assert!(issues[2].contains("[insert amount]"));
    }
}
