// src/types.rs

//! Typed outputs of the drafting stages.
//!
//! The completion service answers with loosely-shaped JSON. Each stage
//! parses into one of these structs at its boundary and applies the
//! defaulting rules there, so the rest of the pipeline never handles
//! untyped maps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TITLE: &str = "Agreement";
pub const DEFAULT_CONTRACT_TYPE: &str = "Agreement";
pub const DEFAULT_JURISDICTION: &str = "Applicable Law";
pub const DEFAULT_PARTIES: [&str; 2] = ["Party A", "Party B"];

/// Variables inferred from the client's brief.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variables {
    pub title: String,
    pub contract_type: String,
    pub jurisdiction: String,
    /// Always exactly two role names.
    pub parties: [String; 2],
}

impl Default for Variables {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            contract_type: DEFAULT_CONTRACT_TYPE.to_string(),
            jurisdiction: DEFAULT_JURISDICTION.to_string(),
            parties: DEFAULT_PARTIES.map(str::to_string),
        }
    }
}

impl Variables {
    /// Build from whatever the service returned, defaulting every missing,
    /// empty or mistyped field.
    pub fn from_json(value: &Value) -> Self {
        let defaults = Self::default();
        let parties = normalize_parties(value.get("parties"));

        Self {
            title: non_empty_str(value.get("title")).unwrap_or(defaults.title),
            contract_type: non_empty_str(value.get("contract_type"))
                .unwrap_or(defaults.contract_type),
            jurisdiction: non_empty_str(value.get("jurisdiction"))
                .unwrap_or(defaults.jurisdiction),
            parties,
        }
    }
}

/// Pad or truncate a party list to exactly two names.
///
/// A missing or empty list yields the default pair; a single name is
/// completed with the second default.
fn normalize_parties(value: Option<&Value>) -> [String; 2] {
    let names: Vec<String> = value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| non_empty_str(Some(v)))
                .collect()
        })
        .unwrap_or_default();

    match names.as_slice() {
        [] => DEFAULT_PARTIES.map(str::to_string),
        [only] => [only.clone(), DEFAULT_PARTIES[1].to_string()],
        [first, second, ..] => [first.clone(), second.clone()],
    }
}

/// Private drafting guidance. Never streamed to the client as its own event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guidance {
    pub html: String,
    pub notes: String,
}

impl Guidance {
    pub fn from_json(value: &Value) -> Self {
        Self {
            html: str_or_empty(value.get("html")),
            notes: str_or_empty(value.get("notes")),
        }
    }
}

/// One entry of the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub number: String,
    pub title: String,
    pub target_words: u32,
    #[serde(default)]
    pub bullets: Vec<String>,
}

impl OutlineSection {
    /// Heading text used in drafted HTML and in inline error fragments.
    pub fn heading(&self) -> String {
        format!("{} {}", self.number, self.title)
    }
}

/// Ordered document outline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub sections: Vec<OutlineSection>,
}

/// Output of the opening stage: front matter + definitions, and a short
/// carry-forward summary used by every later stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub html: String,
    pub context: String,
}

impl FrontMatter {
    pub fn from_json(value: &Value) -> Self {
        Self {
            html: str_or_empty(value.get("html")),
            context: str_or_empty(value.get("context")),
        }
    }
}

/// Verdict of the quality-control review call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcReview {
    pub should_fix: bool,
    pub issues: Vec<String>,
}

impl QcReview {
    /// A review that omits `should_fix` is treated as asking for a fix.
    pub fn from_json(value: &Value) -> Self {
        let should_fix = value
            .get("should_fix")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let issues = value
            .get("issues")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Self { should_fix, issues }
    }
}

/// One drafted section, tagged with its position in the outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDraft {
    pub index: usize,
    pub html: String,
}

pub(crate) fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn str_or_empty(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}
