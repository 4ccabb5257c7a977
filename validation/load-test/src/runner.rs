//! Probe worker orchestration.
//!
//! Every worker owns one channel session and one probe and runs on its own
//! blocking thread, since probe invocations block on broker I/O. Results flow
//! back to the async side over a channel, where they are aggregated.

use crate::config::{redact_uri, TestConfig};
use crate::metrics::{MetricsCollector, TargetInfo, TestResults};
use indicatif::{ProgressBar, ProgressStyle};
use probe_common::ChannelSession;
use publish_probe::{AmqpSession, InterruptHandle, ProbeConfig, PublishProbe, SampleResult};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A single logged sample for debugging.
#[derive(Debug, Serialize)]
pub struct SampleLog<'a> {
    pub timestamp_ms: u64,
    pub worker: usize,
    #[serde(flatten)]
    pub result: &'a SampleResult,
}

/// One sample result as reported by a worker.
#[derive(Debug)]
pub struct WorkerSample {
    pub worker: usize,
    /// Time since the test started when the invocation finished.
    pub offset: Duration,
    pub result: SampleResult,
}

/// Stop signal shared by the runner and its workers.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
    interrupts: Arc<std::sync::Mutex<Vec<InterruptHandle>>>,
}

impl StopSignal {
    fn register(&self, handle: InterruptHandle) {
        if let Ok(mut handles) = self.interrupts.lock() {
            handles.push(handle);
        }
    }

    /// Stop all workers after their current invocation and raise every probe's
    /// interrupt handle.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Ok(handles) = self.interrupts.lock() {
            for handle in handles.iter() {
                handle.interrupt();
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Executes load tests with a fixed number of probe workers.
pub struct LoadRunner {
    config: TestConfig,
    stop: StopSignal,
}

impl LoadRunner {
    /// Create a new load runner.
    pub fn new(config: TestConfig) -> Self {
        Self {
            config,
            stop: StopSignal::default(),
        }
    }

    /// Handle that stops the run early.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run the load test against the configured broker.
    ///
    /// Must be called on a multi-threaded runtime: workers drive their
    /// sessions with `Handle::block_on` from blocking threads.
    pub async fn run(&mut self) -> anyhow::Result<TestResults> {
        let session_config = self.config.session_config();
        let runtime = Handle::current();

        println!("Broker: {}", redact_uri(&session_config.uri));
        self.run_with(move |_| AmqpSession::new(session_config.clone(), runtime.clone()))
            .await
    }

    /// Run the load test with sessions built by `make_session`, one per worker.
    pub async fn run_with<S, F>(&mut self, make_session: F) -> anyhow::Result<TestResults>
    where
        S: ChannelSession + Send + 'static,
        F: Fn(usize) -> S,
    {
        let total_duration =
            Duration::from_secs(self.config.duration_secs + self.config.warmup_secs);
        let warmup_duration = Duration::from_secs(self.config.warmup_secs);

        println!("Starting load test: {}", self.config.name);
        println!("  Warmup: {}s", self.config.warmup_secs);
        println!("  Test duration: {}s", self.config.duration_secs);
        println!("  Concurrency: {}", self.config.concurrency);
        println!(
            "  Target: {} / {} ({} publishes per invocation)",
            self.config.probe.exchange, self.config.probe.routing_key, self.config.probe.iterations
        );
        if let Some(rate) = self.config.invocations_per_second {
            println!("  Rate limit: {:.1} invocations/s", rate);
        }
        println!();

        let pb = ProgressBar::new(self.config.duration_secs);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}s {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("##-"),
        );

        let mut sample_log = if self.config.log_samples {
            Some(self.open_sample_log()?)
        } else {
            None
        };

        // Each worker gets an equal share of the total rate.
        let worker_interval = self.config.invocations_per_second.map(|rate| {
            Duration::from_secs_f64(f64::from(self.config.concurrency) / rate)
        });

        let start_time = Instant::now();
        let deadline = start_time + total_duration;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut workers = Vec::with_capacity(self.config.concurrency as usize);

        for id in 0..self.config.concurrency as usize {
            let worker = Worker {
                id,
                session: make_session(id),
                probe: PublishProbe::new(format!("{}-{}", self.config.name, id)),
                config: self.config.probe.clone(),
                interval: worker_interval,
                start_time,
                deadline,
                stop: self.stop.clone(),
                tx: tx.clone(),
            };
            self.stop.register(worker.probe.interrupt_handle());
            workers.push(tokio::task::spawn_blocking(move || worker.run()));
        }
        // Only the workers hold senders now; the loop below ends once they exit.
        drop(tx);

        let mut metrics = MetricsCollector::new();
        let mut warmup_complete = warmup_duration.is_zero();
        if warmup_complete {
            pb.set_message("Test phase");
        }

        let ctrl_c = {
            let stop = self.stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping workers");
                    stop.stop();
                }
            })
        };

        while let Some(sample) = rx.recv().await {
            if sample.offset < warmup_duration {
                pb.set_message(format!(
                    "Warmup ({}/{}s)",
                    sample.offset.as_secs(),
                    self.config.warmup_secs
                ));
                continue;
            }
            if !warmup_complete {
                warmup_complete = true;
                pb.set_message("Test phase");
            }

            if !sample.result.success {
                debug!(
                    worker = sample.worker,
                    code = %sample.result.response_code,
                    message = %sample.result.response_message,
                    "Invocation failed"
                );
            }
            metrics.record(&sample.result);

            if let Some(writer) = sample_log.as_mut() {
                let entry = SampleLog {
                    timestamp_ms: sample.offset.as_millis() as u64,
                    worker: sample.worker,
                    result: &sample.result,
                };
                if let Ok(json) = serde_json::to_string(&entry) {
                    let _ = writeln!(writer, "{}", json);
                }
            }

            let test_elapsed = (sample.offset - warmup_duration).as_secs();
            pb.set_position(test_elapsed.min(self.config.duration_secs));
        }

        ctrl_c.abort();
        pb.set_message("Waiting for workers...");
        for worker in workers {
            worker.await?;
        }
        if let Some(mut writer) = sample_log {
            writer.flush()?;
        }

        pb.finish_with_message("Complete!");
        println!();

        Ok(metrics.results(
            self.config.name.clone(),
            self.config.concurrency,
            TargetInfo::from_probe(&self.config.probe),
        ))
    }

    fn open_sample_log(&self) -> anyhow::Result<BufWriter<File>> {
        let results_dir = if std::path::Path::new("validation/load-test").exists() {
            "validation/load-test/results"
        } else {
            "results"
        };
        std::fs::create_dir_all(results_dir)?;
        let scenario_name = self.config.name.replace(' ', "_").to_lowercase();
        let log_path = format!(
            "{}/{}_{}.jsonl",
            results_dir,
            scenario_name,
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        );
        println!("  Logging samples to: {}", log_path);
        Ok(BufWriter::new(File::create(&log_path)?))
    }
}

/// State moved onto a worker's blocking thread.
struct Worker<S> {
    id: usize,
    session: S,
    probe: PublishProbe,
    config: ProbeConfig,
    interval: Option<Duration>,
    start_time: Instant,
    deadline: Instant,
    stop: StopSignal,
    tx: mpsc::UnboundedSender<WorkerSample>,
}

impl<S: ChannelSession> Worker<S> {
    fn run(mut self) {
        let mut next_start = Instant::now();

        while !self.stop.is_stopped() && Instant::now() < self.deadline {
            if let Some(interval) = self.interval {
                let now = Instant::now();
                if next_start > now {
                    std::thread::sleep(next_start - now);
                }
                next_start += interval;
            }

            let result = self.probe.run_invocation(&mut self.session, &self.config);
            let sample = WorkerSample {
                worker: self.id,
                offset: self.start_time.elapsed(),
                result,
            };
            if self.tx.send(sample).is_err() {
                warn!(worker = self.id, "Result receiver closed, stopping worker");
                break;
            }
        }

        self.probe.interrupt(&mut self.session);
        debug!(worker = self.id, "Worker finished");
    }
}
