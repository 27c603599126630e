use std::sync::Arc;
use std::time::Duration;

use contractgen::engine::{EngineSettings, Orchestrator};
use contractgen::llm::{LlmClient, RetryPolicy};
use contractgen::stages::{StageSettings, Stages};

/// Stage settings with a near-zero retry backoff.
pub fn stage_settings(outline_min_sections: usize) -> StageSettings {
    StageSettings {
        retry: RetryPolicy {
            attempts: 2,
            backoff: Duration::from_millis(1),
        },
        outline_min_sections,
        ..StageSettings::default()
    }
}

/// Engine settings tuned for tests: no inter-chunk delay, short keep-alive.
pub fn engine_settings() -> EngineSettings {
    EngineSettings {
        max_parallel_sections: 4,
        job_ttl: Duration::from_secs(30),
        chars_per_event: 64,
        chunk_delay: Duration::ZERO,
        keep_alive: Duration::from_millis(50),
        retry_ms: 1000,
        validation_enabled: true,
    }
}

/// An orchestrator over `client`, with the outline minimum set to
/// `outline_min_sections` so scripted outlines are not padded.
pub fn orchestrator(
    client: Arc<dyn LlmClient>,
    outline_min_sections: usize,
    settings: EngineSettings,
) -> Orchestrator {
    let stages = Stages::new(client, stage_settings(outline_min_sections));
    Orchestrator::new(stages, settings)
}
