// src/html/sanitize.rs

use std::sync::OnceLock;

use regex::Regex;

struct Patterns {
    script: Regex,
    style: Regex,
    handler_double: Regex,
    handler_single: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        script: Regex::new(r"(?is)<\s*script[^>]*>.*?<\s*/\s*script\s*>").expect("script pattern"),
        style: Regex::new(r"(?is)<\s*style[^>]*>.*?<\s*/\s*style\s*>").expect("style pattern"),
        handler_double: Regex::new(r#" on[a-zA-Z]+=".*?""#).expect("handler pattern"),
        handler_single: Regex::new(r" on[a-zA-Z]+='.*?'").expect("handler pattern"),
    })
}

/// Drop `<script>`/`<style>` elements (with their content) and inline
/// `on*=` event handler attributes.
pub fn sanitize_html(html: &str) -> String {
    let p = patterns();
    let html = p.script.replace_all(html, "");
    let html = p.style.replace_all(&html, "");
    let html = p.handler_double.replace_all(&html, "");
    let html = p.handler_single.replace_all(&html, "");
    html.into_owned()
}
