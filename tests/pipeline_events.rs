// tests/pipeline_events.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use contractgen::engine::{EventKind, PipelineState};
use contractgen::html::SECTION_ERROR_MARKER;
use contractgen_test_utils::builders::{engine_settings, orchestrator};
use contractgen_test_utils::fake_llm::{FRONT_MATTER_HTML, ScriptedLlm, ScriptedStage, section_html};
use contractgen_test_utils::sse::{document_of, drain_until_done};
use contractgen_test_utils::{init_tracing, wait_for};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn happy_path_emits_progress_then_document_then_done() -> TestResult {
    init_tracing();

    let llm = Arc::new(ScriptedLlm::with_sections(3));
    let orch = orchestrator(llm.clone(), 3, engine_settings());
    let id = orch.submit("A services agreement between a provider and a customer")?;
    let job = orch.registry().get(&id).ok_or("job not registered")?;

    let events = drain_until_done(&job, Duration::from_secs(5)).await;
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();

    assert_eq!(
        &kinds[..5],
        &[
            EventKind::Start,
            EventKind::Variables,
            EventKind::Progress,
            EventKind::Outline,
            EventKind::Progress,
        ]
    );
    assert_eq!(events[0].data, format!(r#"{{"job_id":"{id}"}}"#));

    let progress: Vec<&str> = events
        .iter()
        .filter(|e| e.kind == EventKind::Progress)
        .map(|e| e.data.as_str())
        .collect();
    assert_eq!(
        progress,
        vec![
            "guidelines_ready",
            "first_part_ready",
            "section_ready:1",
            "section_ready:2",
            "section_ready:3",
            "sections_done",
            "qc_done",
        ]
    );

    // Document text only appears after quality control.
    let qc_at = events.iter().position(|e| e.data == "qc_done").ok_or("no qc_done")?;
    let first_chunk = events
        .iter()
        .position(|e| e.kind == EventKind::Chunk)
        .ok_or("no chunks")?;
    assert!(first_chunk > qc_at);

    assert_eq!(kinds.iter().filter(|k| **k == EventKind::Done).count(), 1);
    assert_eq!(kinds.last(), Some(&EventKind::Done));
    assert!(!kinds.contains(&EventKind::Error));

    let expected = format!(
        "{FRONT_MATTER_HTML}\n{}\n{}\n{}",
        section_html("1.", "Section Title 1"),
        section_html("2.", "Section Title 2"),
        section_html("3.", "Section Title 3"),
    );
    assert_eq!(document_of(&events), expected);

    assert!(wait_for(|| job.is_finished(), Duration::from_secs(2)).await);
    assert_eq!(job.state(), PipelineState::Done);
    assert!(orch.reaper().is_scheduled(&id));
    assert_eq!(llm.count(ScriptedStage::Section), 3);
    assert_eq!(llm.count(ScriptedStage::Fix), 0);

    Ok(())
}

#[tokio::test]
async fn failing_section_is_isolated_to_its_position() -> TestResult {
    init_tracing();

    let llm = Arc::new(ScriptedLlm::with_sections(3).fail_section("Section Title 2"));
    let orch = orchestrator(llm.clone(), 3, engine_settings());
    let id = orch.submit("brief")?;
    let job = orch.registry().get(&id).ok_or("job not registered")?;

    let events = drain_until_done(&job, Duration::from_secs(5)).await;
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::Done));
    assert!(!events.iter().any(|e| e.kind == EventKind::Error));

    let doc = document_of(&events);
    assert_eq!(doc.matches(SECTION_ERROR_MARKER).count(), 1);

    let first = doc
        .find(&section_html("1.", "Section Title 1"))
        .ok_or("section 1 missing")?;
    let failed = doc
        .find("<h2>2. Section Title 2</h2><p><strong>Error:</strong>")
        .ok_or("inline error missing")?;
    let third = doc
        .find(&section_html("3.", "Section Title 3"))
        .ok_or("section 3 missing")?;
    assert!(first < failed && failed < third);
    assert!(doc.contains("scripted failure for Section Title 2"));

    Ok(())
}

#[tokio::test]
async fn fatal_stage_failure_reports_error_and_streams_nothing() -> TestResult {
    init_tracing();

    let llm = Arc::new(ScriptedLlm::with_sections(3).fail_stage(ScriptedStage::Outline));
    let orch = orchestrator(llm.clone(), 3, engine_settings());
    let id = orch.submit("brief")?;
    let job = orch.registry().get(&id).ok_or("job not registered")?;

    let events = drain_until_done(&job, Duration::from_secs(5)).await;
    let n = events.len();
    assert!(n >= 2);
    assert_eq!(events[n - 2].kind, EventKind::Error);
    assert!(events[n - 2].data.starts_with("Internal error:"));
    assert_eq!(events[n - 1].kind, EventKind::Done);
    assert!(!events.iter().any(|e| e.kind == EventKind::Chunk));
    assert!(!events.iter().any(|e| e.kind == EventKind::Outline));

    // Structured stages are retried before giving up.
    assert_eq!(llm.count(ScriptedStage::Outline), 2);
    assert_eq!(llm.count(ScriptedStage::Section), 0);

    assert!(wait_for(|| job.is_finished(), Duration::from_secs(2)).await);
    assert_eq!(job.state(), PipelineState::Error);
    assert!(orch.reaper().is_scheduled(&id));

    Ok(())
}

#[tokio::test]
async fn malformed_inference_falls_back_to_default_variables() -> TestResult {
    init_tracing();

    let llm = Arc::new(ScriptedLlm::with_sections(2).with_variables(json!("not an object")));
    let orch = orchestrator(llm.clone(), 2, engine_settings());
    let id = orch.submit("brief")?;
    let job = orch.registry().get(&id).ok_or("job not registered")?;

    let events = drain_until_done(&job, Duration::from_secs(5)).await;
    let variables = events
        .iter()
        .find(|e| e.kind == EventKind::Variables)
        .ok_or("no variables event")?;
    let parsed: serde_json::Value = serde_json::from_str(&variables.data)?;

    assert_eq!(parsed["title"], "Agreement");
    assert_eq!(parsed["jurisdiction"], "Applicable Law");
    assert_eq!(parsed["parties"], json!(["Party A", "Party B"]));
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::Done));
    assert!(!events.iter().any(|e| e.kind == EventKind::Error));

    Ok(())
}

#[tokio::test]
async fn quality_control_fix_is_sanitized_before_streaming() -> TestResult {
    init_tracing();

    let llm = Arc::new(
        ScriptedLlm::with_sections(2)
            .with_review(true, &["missing remedies clause"])
            .with_fixed_html("<p onclick=\"steal()\">Fixed</p><script>alert(1)</script>"),
    );
    let orch = orchestrator(llm.clone(), 2, engine_settings());
    let id = orch.submit("brief")?;
    let job = orch.registry().get(&id).ok_or("job not registered")?;

    let events = drain_until_done(&job, Duration::from_secs(5)).await;

    assert_eq!(document_of(&events), "<p>Fixed</p>");
    assert_eq!(llm.count(ScriptedStage::Fix), 1);

    Ok(())
}

#[tokio::test]
async fn empty_fix_keeps_the_reviewed_text() -> TestResult {
    init_tracing();

    let llm = Arc::new(
        ScriptedLlm::with_sections(1)
            .with_review(true, &["style"])
            .with_fixed_html("   "),
    );
    let orch = orchestrator(llm.clone(), 1, engine_settings());
    let id = orch.submit("brief")?;
    let job = orch.registry().get(&id).ok_or("job not registered")?;

    let events = drain_until_done(&job, Duration::from_secs(5)).await;

    assert_eq!(
        document_of(&events),
        format!("{FRONT_MATTER_HTML}\n{}", section_html("1.", "Section Title 1"))
    );

    Ok(())
}

#[tokio::test]
async fn small_chunk_size_still_reconstructs_the_document() -> TestResult {
    init_tracing();

    let mut settings = engine_settings();
    settings.chars_per_event = 3;
    let llm = Arc::new(ScriptedLlm::with_sections(2).with_front_matter_html("<h1>Überblick – §1</h1>"));
    let orch = orchestrator(llm.clone(), 2, settings);
    let id = orch.submit("brief")?;
    let job = orch.registry().get(&id).ok_or("job not registered")?;

    let events = drain_until_done(&job, Duration::from_secs(5)).await;
    let chunks: Vec<&str> = events
        .iter()
        .filter(|e| e.kind == EventKind::Chunk)
        .map(|e| e.data.as_str())
        .collect();

    assert!(chunks.iter().all(|c| c.chars().count() <= 3));
    assert!(document_of(&events).starts_with("<h1>Überblick – §1</h1>\n"));

    Ok(())
}
