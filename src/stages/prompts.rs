// src/stages/prompts.rs

//! Prompt text for each stage, as `(system, user)` pairs.

use crate::types::{Outline, OutlineSection, Variables};

use super::section::SectionContext;

pub fn infer(brief: &str) -> (String, String) {
    let system = "You are a contracts lawyer. Infer minimal variables from a free-text brief. \
        Never ask questions; use general placeholders for anything unspecified.\n\
        Return ONLY a JSON object: \
        {\"title\":str,\"contract_type\":str,\"jurisdiction\":str,\"parties\":[str,str]}.\n\
        - Keep a contract name the brief clearly gives (e.g. NDA); otherwise use 'Agreement'.\n\
        - Use the jurisdiction the brief states; otherwise 'Applicable Law'.\n\
        - Prefer role nouns for parties (e.g. Provider/Customer); otherwise ['Party A','Party B'].";
    let user = format!("Brief:\n{brief}\n\nReturn ONLY the JSON.");
    (system.to_string(), user)
}

pub fn guidance(vars: &Variables) -> (String, String) {
    let system = "You are a senior contracts lawyer producing PRIVATE drafting guidance.\n\
        Keep guidance general and phrase jurisdiction considerations without naming statutes.\n\
        Return ONLY a JSON object: {\"html\":str,\"notes\":str}.\n\
        'html' is one <section> fragment headed <h2>Guidelines</h2> with subheads for scope, \
        payment, data and security, IP, confidentiality, indemnities, liability, disputes and \
        boilerplate. 'notes' is at most 600 characters summarising allocations to keep consistent.";
    let user = format!(
        "Contract Type: {}\nJurisdiction: {}\n\
         Write neutral guidance plus venue considerations phrased generally.",
        vars.contract_type, vars.jurisdiction
    );
    (system.to_string(), user)
}

pub fn outline(vars: &Variables, guidance_html: &str, brief: &str) -> (String, String) {
    let system = "You are a legal architect. Create an outline that follows the guidelines.\n\
        Return ONLY a JSON object: \
        {\"sections\":[{\"number\":str,\"title\":str,\"target_words\":int,\"bullets\":[str]}]}.\n\
        Use 10 to 16 sections with neutral names, no placeholders and no statute names. \
        Keep all renewal rules under 'Term and Termination'.";
    let user = format!(
        "Contract Type: {}\nJurisdiction: {}\nGuidelines (HTML):\n{}\n\n\
         User brief (context only):\n{}\n",
        vars.contract_type, vars.jurisdiction, guidance_html, brief
    );
    (system.to_string(), user)
}

pub fn front_matter(vars: &Variables, outline: &Outline) -> (String, String) {
    let system = "You are a senior drafter. Return ONLY a JSON object {\"html\":str,\"context\":str}.\n\
        'html' holds two fragments: <section id='front-matter'> and \
        <section id='global-definitions'>. Keep wording general, without numeric specifics or \
        statute names the brief did not supply.\n\
        'context' is at most 1000 characters summarising the defined capitalised terms and \
        drafting constraints later sections must respect.";

    let mut user = format!(
        "Title: {}\nContract Type: {}\nJurisdiction: {}\nParties: {} and {}\n\
         Anticipated Sections:\n",
        vars.title, vars.contract_type, vars.jurisdiction, vars.parties[0], vars.parties[1]
    );
    for section in &outline.sections {
        user.push_str(&format!("- {}\n", section.heading()));
    }
    (system.to_string(), user)
}

pub fn section(ctx: &SectionContext, section: &OutlineSection) -> (String, String) {
    let system = "Draft ONE contract section as a valid HTML fragment.\n\
        Start with <h2>{number} {title}</h2>, then use <p>, <ol>, <ul> and optional <h3>.\n\
        No placeholders such as [insert], no statute names the brief did not supply, and no \
        numeric specifics the brief does not imply. Renewal rules belong only in \
        'Term and Termination'.";

    let vars = &ctx.variables;
    let bullets = serde_json::to_string(&section.bullets).unwrap_or_else(|_| "[]".to_string());
    let mut user = format!(
        "Agreement Title: {}\nContract Type: {}\nJurisdiction: {}\nParties: {} and {}\n\
         Section number: {}\nSection title: {}\nTarget words (approx): {}\n",
        vars.title,
        vars.contract_type,
        vars.jurisdiction,
        vars.parties[0],
        vars.parties[1],
        section.number,
        section.title,
        section.target_words,
    );

    if ctx.include_global_context {
        user.push_str("Guidelines (HTML; PRIVATE; do not copy):\n");
        user.push_str(&ctx.guidance_html);
        user.push_str("\nOpening & Definitions (HTML; authoritative; do not duplicate):\n");
        user.push_str(&ctx.front_matter_html);
        user.push_str("\nShared context (plain text; do not echo):\n");
        user.push_str(&ctx.carry_forward);
        user.push('\n');
    }
    user.push_str(&format!("Guidance bullets: {bullets}\n"));

    (system.to_string(), user)
}

pub fn review(html: &str, vars: &Variables, known_issues: &[String]) -> (String, String) {
    let system = "You are an expert contracts reviewer. Evaluate the HTML contract for structure, \
        coherence, consistent defined terms and missing essentials.\n\
        Return ONLY a JSON object {\"issues\":[str],\"should_fix\":bool}. \
        Do not include the contract text.";

    let mut user = format!(
        "Contract Type: {}\nJurisdiction: {}\n",
        vars.contract_type, vars.jurisdiction
    );
    if !known_issues.is_empty() {
        user.push_str("Automated checks reported:\n");
        for issue in known_issues {
            user.push_str(&format!("- {issue}\n"));
        }
    }
    user.push_str("Contract HTML to evaluate follows:\n");
    user.push_str(html);
    (system.to_string(), user)
}

pub fn fix(html: &str, vars: &Variables, issues: &[String]) -> (String, String) {
    let system = "You are an expert contracts drafter fixing an HTML contract in a single pass.\n\
        Keep language general, preserve headings and numbering, keep renewal centralised, avoid \
        statute names, keep defined terms consistent and leave no placeholders.\n\
        Output ONLY the corrected HTML fragment, without JSON or commentary.";
    let issues = serde_json::to_string(issues).unwrap_or_else(|_| "[]".to_string());
    let user = format!(
        "Contract Type: {}\nJurisdiction: {}\nKnown issues: {}\n\
         Original HTML follows (fix inline):\n{}",
        vars.contract_type, vars.jurisdiction, issues, html
    );
    (system.to_string(), user)
}
