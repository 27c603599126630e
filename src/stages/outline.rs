// src/stages/outline.rs

//! Outline stage and its normalization rules.
//!
//! The model's outline is parsed leniently, then brought up to the
//! configured minimum by appending common sections from a fixed list. Every
//! resulting section has a number, a title, a word target and a bullet list,
//! and titles are unique ignoring case.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use super::{Stages, prompts};
use crate::errors::Result;
use crate::llm::{CompletionRequest, complete_json};
use crate::types::{Guidance, Outline, OutlineSection, Variables, non_empty_str};

/// Common sections appended when the model returns too few.
pub const FALLBACK_SECTIONS: [(&str, u32); 12] = [
    ("Definitions", 280),
    ("Scope of Agreement", 300),
    ("Fees and Payment", 260),
    ("Confidentiality", 260),
    ("Intellectual Property", 260),
    ("Data Protection and Security", 280),
    ("Warranties and Disclaimers", 240),
    ("Indemnities", 240),
    ("Limitation of Liability", 240),
    ("Term and Termination", 240),
    ("Governing Law and Dispute Resolution", 220),
    ("General Provisions", 220),
];

impl Stages {
    /// Produce the section outline for the document.
    pub async fn outline(&self, vars: &Variables, guidance: &Guidance, brief: &str) -> Result<Outline> {
        let (system, user) = prompts::outline(vars, &guidance.html, brief);
        let request = CompletionRequest::json(system, user)
            .temperature(0.2)
            .max_tokens(2000);
        let value = complete_json(self.client.as_ref(), request, self.settings.retry).await?;

        let outline = normalize_outline(
            &value,
            self.settings.outline_min_sections,
            self.settings.section_target_words,
        );
        debug!(sections = outline.sections.len(), "outline normalized");
        Ok(outline)
    }
}

/// A section as the model returned it, before defaults are assigned.
struct RawSection {
    number: Option<String>,
    title: String,
    target_words: Option<u32>,
    bullets: Vec<String>,
}

/// Apply the outline rules to the model's `{"sections": [...]}` object.
pub fn normalize_outline(value: &Value, min_sections: usize, default_target_words: u32) -> Outline {
    let mut seen: HashSet<String> = HashSet::new();
    let mut raw: Vec<RawSection> = Vec::new();

    let entries = value
        .get("sections")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for entry in entries {
        let title = non_empty_str(entry.get("title"))
            .unwrap_or_else(|| format!("Section {}", raw.len() + 1));
        if !seen.insert(title.to_lowercase()) {
            continue;
        }
        raw.push(RawSection {
            number: number_of(entry.get("number")),
            title,
            target_words: entry
                .get("target_words")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0),
            bullets: entry
                .get("bullets")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|b| b.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
        });
    }

    if raw.len() < min_sections {
        for (title, words) in FALLBACK_SECTIONS {
            if seen.insert(title.to_lowercase()) {
                raw.push(RawSection {
                    number: None,
                    title: title.to_string(),
                    target_words: Some(words),
                    bullets: Vec::new(),
                });
            }
        }

        let mut extra = 1;
        while raw.len() < min_sections {
            let title = format!("Additional Provisions {extra}");
            extra += 1;
            if seen.insert(title.to_lowercase()) {
                raw.push(RawSection {
                    number: None,
                    title,
                    target_words: None,
                    bullets: Vec::new(),
                });
            }
        }
    }

    let sections = raw
        .into_iter()
        .enumerate()
        .map(|(i, s)| OutlineSection {
            number: s.number.unwrap_or_else(|| format!("{}.", i + 1)),
            title: s.title,
            target_words: s.target_words.unwrap_or(default_target_words),
            bullets: s.bullets,
        })
        .collect();

    Outline { sections }
}

/// Section numbers arrive as strings ("3.") or bare integers (3).
fn number_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(format!("{n}.")),
        other => non_empty_str(Some(other)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn short_outline_is_padded_without_duplicates() {
        let value = json!({"sections": [
            {"number": "1.", "title": "Definitions", "target_words": 150},
            {"title": "CONFIDENTIALITY"},
        ]});

        let outline = normalize_outline(&value, 12, 600);

        // 2 from the model + 10 fallback titles not already present.
        assert_eq!(outline.sections.len(), 12);
        assert_eq!(outline.sections[0].target_words, 150);
        assert_eq!(outline.sections[1].number, "2.");
        assert_eq!(outline.sections[1].target_words, 600);
        assert_eq!(outline.sections[2].title, "Scope of Agreement");
        assert_eq!(outline.sections[2].number, "3.");
        let confidentiality = outline
            .sections
            .iter()
            .filter(|s| s.title.eq_ignore_ascii_case("confidentiality"))
            .count();
        assert_eq!(confidentiality, 1);
    }

    #[test]
    fn long_enough_outline_is_kept_as_is() {
        let sections: Vec<_> = (1..=3)
            .map(|i| json!({"number": i, "title": format!("Clause {i}"), "bullets": ["a"]}))
            .collect();

        let outline = normalize_outline(&json!({ "sections": sections }), 3, 400);

        assert_eq!(outline.sections.len(), 3);
        assert_eq!(outline.sections[2].number, "3.");
        assert_eq!(outline.sections[2].bullets, vec!["a".to_string()]);
    }

    #[test]
    fn missing_sections_key_yields_fallback_outline() {
        let outline = normalize_outline(&json!({}), 12, 600);
        let titles: Vec<_> = outline.sections.iter().map(|s| s.title.as_str()).collect();
        let expected: Vec<_> = FALLBACK_SECTIONS.iter().map(|(t, _)| *t).collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn minimum_beyond_fallback_list_is_still_met() {
        let outline = normalize_outline(&json!({}), 14, 600);
        assert_eq!(outline.sections.len(), 14);
        assert_eq!(outline.sections[13].title, "Additional Provisions 2");
        assert_eq!(outline.sections[13].number, "14.");
    }
}
