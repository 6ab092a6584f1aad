//! Execution service
//!
//! Runs one exec event end to end:
//! - Spawning the command with piped stdout/stderr
//! - Reading both streams into the aggregator until they end
//! - Enforcing the deadline (kill, drain, final flush)
//! - Writing exactly one exit record
//!
//! The runner is the only writer of a job's chunks and exit record.

use rce_core::domain::job::{ExitStatus, JobId};
use rce_core::dto::exec::ExecEvent;
use rce_core::keys::exit_key;
use rce_core::request_log::RequestLog;
use rce_core::store::LogStore;
use reqwest::Client;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::RunnerConfig;
use crate::error::{Result, RunnerError};
use crate::service::aggregator::Aggregator;
use crate::service::log_buffer::InMemoryLineBuffer;
use crate::service::stream::spawn_reader;
use crate::sink::{OutputSink, PushSink, StoreSink};

/// Capacity of the reader queue
const LINE_QUEUE_DEPTH: usize = 128;

/// Executes exec events
#[derive(Clone)]
pub struct JobRunner {
    config: RunnerConfig,
    store: Arc<dyn LogStore>,
    http: Client,
}

impl JobRunner {
    pub fn new(config: RunnerConfig, store: Arc<dyn LogStore>) -> Self {
        let http = Client::builder()
            .timeout(config.push_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    "Failed to build push client with timeout {:?}, using defaults: {}",
                    config.push_timeout, e
                );
                Client::new()
            });

        Self {
            config,
            store,
            http,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs an event against its sink
    ///
    /// Push targets, when present, replace the log store entirely.
    pub async fn run(&self, event: &ExecEvent, log: &RequestLog) -> Result<ExitStatus> {
        let sink: Box<dyn OutputSink> = match &event.push_urls {
            Some(targets) => Box::new(PushSink::new(self.http.clone(), targets.clone())),
            None => Box::new(StoreSink::new(
                self.store.clone(),
                event.uid.clone(),
                self.config.store_retry,
            )),
        };

        let deadline = Instant::now() + self.config.deadline();
        log.line(format!("exec {} {:?}", event.uid, event.argv));

        let result = self.execute(&event.uid, &event.argv, sink, deadline).await;

        match &result {
            Ok(status) => log.line(format!("exit {} {}", event.uid, status.code())),
            Err(e) => log.line(format!("error {} {}", event.uid, e)),
        }
        result
    }

    /// Records a failure exit for an event whose run died without one
    ///
    /// Used by supervisors after a runner panic. Push-mode jobs and jobs that
    /// already have an exit record are left alone.
    pub async fn mark_failed(&self, event: &ExecEvent) -> Result<()> {
        if event.push_urls.is_some() {
            return Ok(());
        }

        let key = exit_key(&event.uid);
        if let Ok(true) = self.store.exists(&key).await {
            return Ok(());
        }

        let mut sink = StoreSink::new(
            self.store.clone(),
            event.uid.clone(),
            self.config.store_retry,
        );
        sink.write_exit(ExitStatus::Failure).await?;
        Ok(())
    }

    /// Runs `argv` to completion or to `deadline`
    pub async fn execute(
        &self,
        job_id: &JobId,
        argv: &[String],
        sink: Box<dyn OutputSink>,
        deadline: Instant,
    ) -> Result<ExitStatus> {
        info!("Starting execution of job {}: {:?}", job_id, argv);

        let buffer = Arc::new(InMemoryLineBuffer::new());
        let mut aggregator = Aggregator::new(buffer, sink, self.config.flush_interval);

        let mut child = match spawn(argv) {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to start job {}: {}", job_id, e);
                aggregator.push(format!("error: failed to start {:?}: {}", argv, e));
                if let Err(flush_err) = aggregator.flush().await {
                    error!("Job {} lost its log store: {}", job_id, flush_err);
                    if let Err(exit_err) = aggregator.finish(ExitStatus::Failure).await {
                        error!("Failed to write exit record for job {}: {}", job_id, exit_err);
                    }
                    return Err(RunnerError::Fatal(flush_err));
                }
                aggregator.finish(ExitStatus::Failure).await?;
                return Ok(ExitStatus::Failure);
            }
        };

        let (tx, mut rx) = mpsc::channel(LINE_QUEUE_DEPTH);
        let mut readers: Vec<JoinHandle<()>> = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader("stdout", stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader("stderr", stderr, tx.clone()));
        }
        let streams = readers.len();
        drop(tx);

        let mut timed_out = false;
        let collected = {
            let collect = aggregator.collect(&mut rx, streams);
            tokio::pin!(collect);

            loop {
                tokio::select! {
                    result = &mut collect => break result,
                    _ = tokio::time::sleep_until(deadline), if !timed_out => {
                        timed_out = true;
                        warn!(
                            "Job {} exceeded its deadline of {:?}, killing",
                            job_id,
                            self.config.deadline()
                        );
                        if let Err(e) = child.start_kill() {
                            warn!("Failed to kill job {}: {}", job_id, e);
                        }
                        abort_after(&readers, self.config.kill_grace);
                    }
                }
            }
        };

        if let Err(e) = collected {
            error!("Job {} lost its log store: {}", job_id, e);
            let _ = child.start_kill();
            let _ = child.wait().await;
            if let Err(exit_err) = aggregator.finish(ExitStatus::Failure).await {
                error!("Failed to write exit record for job {}: {}", job_id, exit_err);
            }
            return Err(RunnerError::Fatal(e));
        }

        let status = self.wait(job_id, &mut child, deadline, timed_out).await;
        aggregator.finish(status).await?;

        info!(
            "Job {} completed with status: {} ({} chunk(s))",
            job_id,
            status,
            aggregator.cursor()
        );
        Ok(status)
    }

    async fn wait(
        &self,
        job_id: &JobId,
        child: &mut Child,
        deadline: Instant,
        timed_out: bool,
    ) -> ExitStatus {
        if timed_out {
            let _ = child.wait().await;
            return ExitStatus::Failure;
        }

        match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => ExitStatus::from_process(&status),
            Ok(Err(e)) => {
                warn!("Failed to wait for job {}: {}", job_id, e);
                ExitStatus::Failure
            }
            Err(_) => {
                warn!("Job {} closed its output but outlived the deadline, killing", job_id);
                let _ = child.start_kill();
                let _ = child.wait().await;
                ExitStatus::Failure
            }
        }
    }
}

fn spawn(argv: &[String]) -> std::io::Result<Child> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv")
    })?;

    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

/// Aborts the readers once `grace` has passed
///
/// Descendants of a killed child can keep its pipes open; aborting the
/// readers drops their senders, which ends collection.
fn abort_after(readers: &[JoinHandle<()>], grace: std::time::Duration) {
    let handles: Vec<_> = readers.iter().map(|r| r.abort_handle()).collect();
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        for handle in handles {
            handle.abort();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rce_core::dto::exec::PushTargets;
    use rce_core::keys::chunk_key;
    use rce_core::retry::RetryPolicy;
    use rce_core::store::MemoryLogStore;
    use std::time::Duration;

    fn test_config() -> RunnerConfig {
        RunnerConfig {
            flush_interval: Duration::from_millis(100),
            kill_grace: Duration::from_millis(200),
            store_retry: RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2)),
            ..RunnerConfig::default()
        }
    }

    fn event(argv: &[&str]) -> ExecEvent {
        ExecEvent {
            uid: JobId::generate(),
            auth_name: None,
            argv: argv.iter().map(|s| s.to_string()).collect(),
            push_urls: None,
        }
    }

    fn chunks(store: &MemoryLogStore, id: &JobId) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = 0;
        while let Some(text) = store.text(&chunk_key(id, cursor)) {
            out.push(text);
            cursor += 1;
        }
        out
    }

    async fn run(runner: &JobRunner, event: &ExecEvent) -> Result<ExitStatus> {
        let log = RequestLog::start(Arc::new(MemoryLogStore::new()), Duration::from_secs(60));
        let result = runner.run(event, &log).await;
        log.finish().await;
        result
    }

    #[tokio::test]
    async fn test_echo_writes_one_chunk_then_exit() {
        let store = MemoryLogStore::new();
        let runner = JobRunner::new(test_config(), Arc::new(store.clone()));
        let event = event(&["echo", "hi"]);

        let status = run(&runner, &event).await.unwrap();

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(chunks(&store, &event.uid), vec!["hi"]);
        assert_eq!(store.text(&exit_key(&event.uid)), Some("0".to_string()));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let store = MemoryLogStore::new();
        let runner = JobRunner::new(test_config(), Arc::new(store.clone()));
        let event = event(&["sh", "-c", "echo out; echo err >&2; exit 3"]);

        let status = run(&runner, &event).await.unwrap();

        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(store.text(&exit_key(&event.uid)), Some("1".to_string()));

        let all = chunks(&store, &event.uid).join("\n");
        let mut lines: Vec<&str> = all.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
    }

    #[tokio::test]
    async fn test_continuous_output_spans_several_chunks() {
        let store = MemoryLogStore::new();
        let runner = JobRunner::new(test_config(), Arc::new(store.clone()));
        let event = event(&[
            "sh",
            "-c",
            "i=0; while [ $i -lt 10 ]; do echo line $i; i=$((i+1)); sleep 0.05; done",
        ]);

        let status = run(&runner, &event).await.unwrap();
        assert_eq!(status, ExitStatus::Success);

        let chunks = chunks(&store, &event.uid);
        assert!(chunks.len() >= 2, "expected several chunks, got {:?}", chunks);

        let expected: Vec<String> = (0..10).map(|i| format!("line {}", i)).collect();
        assert_eq!(chunks.join("\n"), expected.join("\n"));
    }

    #[tokio::test]
    async fn test_silent_command_writes_only_exit() {
        let store = MemoryLogStore::new();
        let runner = JobRunner::new(test_config(), Arc::new(store.clone()));
        let event = event(&["true"]);

        assert_eq!(run(&runner, &event).await.unwrap(), ExitStatus::Success);
        assert!(chunks(&store, &event.uid).is_empty());
        assert_eq!(store.text(&exit_key(&event.uid)), Some("0".to_string()));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_terminal() {
        let store = MemoryLogStore::new();
        let runner = JobRunner::new(test_config(), Arc::new(store.clone()));
        let event = event(&["/definitely/not/a/binary"]);

        let status = run(&runner, &event).await.unwrap();

        assert_eq!(status, ExitStatus::Failure);
        let chunks = chunks(&store, &event.uid);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("error: failed to start"));
        assert_eq!(store.text(&exit_key(&event.uid)), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_spawn_failure_with_exhausted_store_still_writes_exit() {
        let store = MemoryLogStore::new();
        let runner = JobRunner::new(test_config(), Arc::new(store.clone()));
        let event = event(&["/definitely/not/a/binary"]);

        store.fail_next_puts(3);
        let err = run(&runner, &event).await.unwrap_err();

        assert!(matches!(err, RunnerError::Fatal(_)));
        assert!(chunks(&store, &event.uid).is_empty());
        assert_eq!(store.text(&exit_key(&event.uid)), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_deadline_kills_and_still_finalizes() {
        let store = MemoryLogStore::new();
        let config = RunnerConfig {
            max_execution_time: Duration::from_millis(1300),
            finalize_margin: Duration::from_millis(1000),
            ..test_config()
        };
        let runner = JobRunner::new(config, Arc::new(store.clone()));
        let event = event(&["sh", "-c", "echo started; sleep 30; echo never"]);

        let started = std::time::Instant::now();
        let status = run(&runner, &event).await.unwrap();

        assert_eq!(status, ExitStatus::Failure);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(chunks(&store, &event.uid), vec!["started"]);
        assert_eq!(store.text(&exit_key(&event.uid)), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_store_exhaustion_is_fatal_but_exit_attempted() {
        let store = MemoryLogStore::new();
        let runner = JobRunner::new(test_config(), Arc::new(store.clone()));
        let event = event(&["echo", "hi"]);

        store.fail_next_puts(3);
        let err = run(&runner, &event).await.unwrap_err();

        assert!(matches!(err, RunnerError::Fatal(_)));
        assert!(chunks(&store, &event.uid).is_empty());
        assert_eq!(store.text(&exit_key(&event.uid)), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_push_mode_bypasses_store() {
        let store = MemoryLogStore::new();
        let runner = JobRunner::new(
            RunnerConfig {
                push_timeout: Duration::from_millis(200),
                ..test_config()
            },
            Arc::new(store.clone()),
        );
        let mut event = event(&["echo", "hi"]);
        event.push_urls = Some(PushTargets {
            log: "http://127.0.0.1:9/log".to_string(),
            size: "http://127.0.0.1:9/size".to_string(),
            exit: "http://127.0.0.1:9/exit".to_string(),
        });

        let status = run(&runner, &event).await.unwrap();

        assert_eq!(status, ExitStatus::Success);
        assert!(store.keys("jobs/").is_empty());
    }

    #[tokio::test]
    async fn test_mark_failed_only_fills_missing_exit() {
        let store = MemoryLogStore::new();
        let runner = JobRunner::new(test_config(), Arc::new(store.clone()));
        let event = event(&["true"]);

        runner.mark_failed(&event).await.unwrap();
        assert_eq!(store.text(&exit_key(&event.uid)), Some("1".to_string()));

        store
            .put(&exit_key(&event.uid), b"0".to_vec())
            .await
            .unwrap();
        runner.mark_failed(&event).await.unwrap();
        assert_eq!(store.text(&exit_key(&event.uid)), Some("0".to_string()));
    }
}
