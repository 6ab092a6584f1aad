//! Whole-system runs: real server socket, real runner, real client

use rce_client::{ClientError, Poller, PollerConfig, RceClient};
use rce_core::retry::RetryPolicy;
use rce_core::store::{LogStore, MemoryLogStore};
use rce_runner::{JobRunner, RunnerConfig};
use std::sync::Arc;
use std::time::Duration;

use crate::api::create_router;
use crate::service::{ReadGrants, StaticTokens, TaskDispatcher};
use crate::state::AppState;

const TOKEN: &str = "e2e-token";

async fn start_server(runner: RunnerConfig) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let store: Arc<dyn LogStore> = Arc::new(MemoryLogStore::new());
    let state = AppState::new(
        store.clone(),
        Arc::new(StaticTokens::default().with("e2e", TOKEN)),
        Arc::new(TaskDispatcher::new(JobRunner::new(runner, store.clone()), store)),
        Arc::new(ReadGrants::new(&base, Duration::from_secs(60))),
    );

    let app = create_router(state);
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    base
}

fn poller(base: &str, token: &str) -> Poller<RceClient> {
    let config = PollerConfig {
        retry: RetryPolicy::new(7, Duration::from_millis(50), Duration::from_millis(500)),
        not_ready_backoff: Duration::from_millis(100),
        not_consistent_backoff: Duration::from_millis(100),
        ..PollerConfig::default()
    };
    Poller::new(RceClient::new(base, token), config)
}

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_echo_round_trip() {
    let base = start_server(RunnerConfig::new()).await;

    let mut chunks = Vec::new();
    let status = poller(&base, TOKEN)
        .execute(argv(&["echo", "hi"]), None, |c| chunks.push(c.to_string()))
        .await
        .unwrap();

    assert_eq!(status, 0);
    assert_eq!(chunks, vec!["hi"]);
}

#[tokio::test]
async fn test_failing_command_reports_failure() {
    let base = start_server(RunnerConfig::new()).await;

    let status = poller(&base, TOKEN)
        .execute(argv(&["sh", "-c", "echo nope >&2; exit 3"]), None, |_| {})
        .await
        .unwrap();

    assert_eq!(status, 1);
}

#[tokio::test]
async fn test_streamed_output_arrives_complete_and_in_order() {
    let mut runner = RunnerConfig::new();
    runner.flush_interval = Duration::from_millis(200);
    let base = start_server(runner).await;

    let mut chunks = Vec::new();
    let status = poller(&base, TOKEN)
        .execute(
            argv(&["sh", "-c", "for i in 1 2 3 4 5; do echo line$i; sleep 0.2; done"]),
            None,
            |c| chunks.push(c.to_string()),
        )
        .await
        .unwrap();

    assert_eq!(status, 0);
    assert!(chunks.len() >= 2, "expected several chunks, got {:?}", chunks);

    let lines: Vec<String> = chunks
        .iter()
        .flat_map(|c| c.lines().map(str::to_string))
        .collect();
    assert_eq!(lines, vec!["line1", "line2", "line3", "line4", "line5"]);
}

#[tokio::test]
async fn test_deadline_kills_long_command() {
    let mut runner = RunnerConfig::new();
    runner.max_execution_time = Duration::from_secs(2);
    runner.finalize_margin = Duration::from_secs(1);
    runner.kill_grace = Duration::from_millis(200);
    let base = start_server(runner).await;

    let mut chunks = Vec::new();
    let status = poller(&base, TOKEN)
        .execute(
            argv(&["sh", "-c", "echo started; sleep 30"]),
            None,
            |c| chunks.push(c.to_string()),
        )
        .await
        .unwrap();

    assert_eq!(status, 1);
    assert_eq!(chunks.concat(), "started");
}

#[tokio::test]
async fn test_bad_credential_is_rejected() {
    let base = start_server(RunnerConfig::new()).await;

    let err = poller(&base, "not-the-token")
        .execute(argv(&["echo", "hi"]), None, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized));
}
