// tests/graceful_shutdown.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use contractgen::engine::{CANCELLED_MESSAGE, PipelineState};
use contractgen::server;
use contractgen_test_utils::builders::{engine_settings, orchestrator};
use contractgen_test_utils::fake_llm::{ScriptedLlm, ScriptedStage};
use contractgen_test_utils::{init_tracing, wait_for, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn shutdown_signal_closes_attached_streams_and_the_server_exits() -> TestResult {
    init_tracing();

    let llm = ScriptedLlm::with_sections(1).delay_stage(ScriptedStage::Infer, Duration::from_secs(60));
    let orch = Arc::new(orchestrator(Arc::new(llm), 1, engine_settings()));
    let app = server::router(orch.clone(), &["*".to_string()]);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    // Same shape as the Ctrl-C future in `run`.
    let (signal_tx, signal_rx) = oneshot::channel::<()>();
    let signalled = orch.clone();
    let server = tokio::spawn(server::serve_on(listener, app, async move {
        let _ = signal_rx.await;
        signalled.shutdown();
    }));

    let job_id = orch.submit("brief")?;
    let job = orch.registry().get(&job_id).ok_or("job not registered")?;

    let mut client = TcpStream::connect(addr).await?;
    client
        .write_all(format!("GET /stream/{job_id} HTTP/1.1\r\nHost: {addr}\r\n\r\n").as_bytes())
        .await?;

    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    while !String::from_utf8_lossy(&received).contains("retry: 1000") {
        let n = with_timeout(client.read(&mut buf)).await?;
        if n == 0 {
            return Err("connection closed before the retry directive".into());
        }
        received.extend_from_slice(&buf[..n]);
    }
    assert!(!job.is_cancelled());

    signal_tx.send(()).map_err(|_| "server already stopped")?;

    let served = tokio::time::timeout(Duration::from_secs(5), server).await;
    assert!(
        matches!(served, Ok(Ok(Ok(())))),
        "server did not exit after the shutdown signal"
    );

    with_timeout(client.read_to_end(&mut received)).await?;
    let body = String::from_utf8_lossy(&received);
    assert!(body.contains(&format!("event: error\ndata: {CANCELLED_MESSAGE}\n\n")));
    assert!(body.contains("event: done\n"));

    assert!(job.is_cancelled());
    assert!(wait_for(|| job.is_finished(), Duration::from_secs(1)).await);
    assert_eq!(job.state(), PipelineState::Cancelled);
    assert_eq!(orch.drain(Duration::from_secs(1)).await, 0);

    Ok(())
}
