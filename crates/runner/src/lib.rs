//! Runs the long-lived processes of a service side by side and shuts them
//! down together.
//!
//! - Every process gets the same cancellation token
//! - SIGINT/SIGTERM or the first failing process cancels the token
//! - Closers run afterwards under a timeout, whatever the processes did
//! - [`Runner::run`] reports a [`RunOutcome`]; mapping it to an exit code is
//!   left to `main`
//!
//! # Example
//!
//! ```no_run
//! use oddsfeed_runner::{RunOutcome, Runner};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let outcome = Runner::new()
//!         .with_named_process("heartbeat", |ctx| async move {
//!             loop {
//!                 tokio::select! {
//!                     _ = ctx.cancelled() => break,
//!                     _ = tokio::time::sleep(Duration::from_secs(1)) => {
//!                         tracing::info!("still here");
//!                     }
//!                 }
//!             }
//!             Ok(())
//!         })
//!         .with_closer(|| async move {
//!             tracing::info!("Cleaning up resources");
//!             Ok(())
//!         })
//!         .with_closer_timeout(Duration::from_secs(5))
//!         .run()
//!         .await;
//!
//!     std::process::exit(outcome.exit_code());
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A process: takes the shared cancellation token, resolves when it is done.
pub type AppProcess = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>
        + Send,
>;

/// Cleanup run after every process has stopped.
pub type Closer =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>> + Send>;

/// How a [`Runner::run`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every process returned `Ok` or was cancelled by a signal
    Clean,
    /// The named process failed or panicked first
    Failed(String),
}

impl RunOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, RunOutcome::Clean)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Clean => 0,
            RunOutcome::Failed(_) => 1,
        }
    }
}

struct NamedProcess {
    name: String,
    process: AppProcess,
}

pub struct Runner {
    processes: Vec<NamedProcess>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Closer timeout defaults to 10 seconds.
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Adds a process, named `process-N` in logs.
    pub fn with_app_process<F, Fut>(self, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        let name = format!("process-{}", self.processes.len());
        self.with_named_process(name, process)
    }

    /// Adds a process. If it returns an error, every other process is
    /// cancelled and the run is reported as failed under `name`.
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.processes.push(NamedProcess {
            name: name.into(),
            process: Box::new(|token| Box::pin(process(token))),
        });
        self
    }

    /// Adds a closer. All closers run, even when some of them fail.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Use an external token, so callers can trigger shutdown themselves.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub async fn run(self) -> RunOutcome {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();

        for NamedProcess { name, process } in self.processes {
            let process_token = token.clone();
            tracing::debug!(process = %name, "starting app process");
            join_set.spawn(async move { (name, process(process_token).await) });
        }

        let signals = spawn_signal_handlers(token.clone());

        let mut outcome = RunOutcome::Clean;
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((name, Ok(()))) => {
                    tracing::debug!(process = %name, "app process completed");
                }
                Ok((name, Err(err))) => {
                    if !token.is_cancelled() {
                        tracing::error!(process = %name, "App process error: {:#}", err);
                        outcome = RunOutcome::Failed(name);
                        token.cancel();
                    } else {
                        tracing::warn!(process = %name, "App process error during shutdown: {:#}", err);
                    }
                }
                Err(err) => {
                    tracing::error!("App process panicked: {}", err);
                    if !token.is_cancelled() {
                        outcome = RunOutcome::Failed("<panicked>".to_string());
                        token.cancel();
                    }
                }
            }

            // Once cancelled, processes get to finish on their own below
            if token.is_cancelled() {
                break;
            }
        }

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((name, Ok(()))) => tracing::debug!(process = %name, "app process stopped"),
                Ok((name, Err(err))) => {
                    tracing::warn!(process = %name, "App process error during shutdown: {:#}", err)
                }
                Err(err) => tracing::error!("App process panicked during shutdown: {}", err),
            }
        }

        for handle in signals {
            handle.abort();
        }

        if !self.closers.is_empty() {
            tracing::info!("Running closers with timeout of {:?}", self.closer_timeout);

            match tokio::time::timeout(self.closer_timeout, run_closers(self.closers)).await {
                Ok(()) => tracing::info!("All closers completed"),
                Err(_) => tracing::error!("Closers timed out after {:?}", self.closer_timeout),
            }
        }

        match &outcome {
            RunOutcome::Clean => tracing::info!("Application exiting normally"),
            RunOutcome::Failed(name) => {
                tracing::error!(process = %name, "Application exiting with error")
            }
        }
        outcome
    }
}

fn spawn_signal_handlers(token: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    let ctrl_c_token = token.clone();
    handles.push(tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => {
                tracing::error!("Error setting up signal handler: {}", err);
            }
        }
    }));

    #[cfg(unix)]
    handles.push(tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
                token.cancel();
            }
            Err(err) => {
                tracing::error!("Error setting up SIGTERM handler: {}", err);
            }
        }
    }));

    handles
}

/// Runs all closers concurrently.
async fn run_closers(closers: Vec<Closer>) {
    let mut closer_set = JoinSet::new();

    for closer in closers {
        closer_set.spawn(async move { closer().await });
    }

    while let Some(result) = closer_set.join_next().await {
        match result {
            Ok(Ok(())) => {
                tracing::debug!("Closer completed successfully");
            }
            Ok(Err(err)) => {
                tracing::error!("Closer error: {:#}", err);
            }
            Err(err) => {
                tracing::error!("Closer panicked: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn until_cancelled(ctx: CancellationToken) -> Result<(), anyhow::Error> {
        ctx.cancelled().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_run_when_cancelled_externally() {
        let closer_called = Arc::new(AtomicBool::new(false));
        let flag = closer_called.clone();
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let outcome = Runner::new()
            .with_named_process("feed", until_cancelled)
            .with_app_process(until_cancelled)
            .with_closer(move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .with_cancellation_token(token)
            .run()
            .await;

        assert_eq!(outcome, RunOutcome::Clean);
        assert_eq!(outcome.exit_code(), 0);
        assert!(closer_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failing_process_cancels_the_rest() {
        let stopped = Arc::new(AtomicBool::new(false));
        let stopped_flag = stopped.clone();

        let outcome = Runner::new()
            .with_named_process("inplay-feed", move |ctx| async move {
                ctx.cancelled().await;
                stopped_flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .with_named_process("prematch-feed", |_ctx| async move {
                Err(anyhow::anyhow!("broker went away"))
            })
            .run()
            .await;

        assert_eq!(outcome, RunOutcome::Failed("prematch-feed".to_string()));
        assert_eq!(outcome.exit_code(), 1);
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_processes_finishing_on_their_own() {
        let outcome = Runner::new()
            .with_app_process(|_ctx| async move { Ok(()) })
            .with_app_process(|_ctx| async move { Ok(()) })
            .run()
            .await;

        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn test_closers_all_run_even_when_one_fails() {
        let counter = Arc::new(AtomicUsize::new(0));
        let a = counter.clone();
        let b = counter.clone();

        let runner = Runner::new()
            .with_closer(move || async move {
                a.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("close failed"))
            })
            .with_closer(move || async move {
                b.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        run_closers(runner.closers).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_closer_timeout_does_not_hang_run() {
        let outcome = Runner::new()
            .with_app_process(|_ctx| async move { Ok(()) })
            .with_closer(|| async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .with_closer_timeout(Duration::from_millis(20))
            .run()
            .await;

        assert!(outcome.is_clean());
    }
}
