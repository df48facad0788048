//! # Save Coalescing
//!
//! Every applied edit hands the coalescer a snapshot of the document. The
//! coalescer guarantees:
//!
//! 1. **One write at a time**: never two concurrent `store` calls
//! 2. **Latest wins**: requests arriving during a write replace each other,
//!    only the newest is written next
//! 3. **Nothing lost**: once quiescent, the stored document is the newest
//!    snapshot requested
//!
//! ## States
//!
//! ```text
//!            request                     done, pending = None
//!   Idle ──────────────▶ Writing(None) ─────────────────────▶ Idle
//!                          │    ▲
//!                  request │    │ done, pending = Some(s): write s
//!                          ▼    │
//!                        Writing(Some(newest))
//!
//!   failure, nothing pending, policy allows ──▶ Backoff ──▶ Writing
//! ```
//!
//! The state machine runs in its own tokio task, owned by one editing
//! session and fed over a channel.

use crate::document::Document;
use crate::EditorError;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Document rejected: {0}")]
    Rejected(String),
}

/// Persistence collaborator
pub trait DocumentStore: Send + Sync + 'static {
    /// Persist `document` under `identifier`, e.g. `street/f1.json`
    fn store(
        &self,
        identifier: &str,
        document: &Document,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Decides whether a failed write is retried
pub trait RetryPolicy: Send + 'static {
    /// Delay before retrying after the `attempt`-th write of a snapshot
    /// failed; `None` gives up.
    fn retry_after(&self, attempt: u32, error: &StoreError) -> Option<Duration>;
}

/// Surface failures and wait for the next edit
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn retry_after(&self, _attempt: u32, _error: &StoreError) -> Option<Duration> {
        None
    }
}

/// Retry up to `attempts` times, `delay` apart
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy for FixedDelay {
    fn retry_after(&self, attempt: u32, _error: &StoreError) -> Option<Duration> {
        (attempt <= self.attempts).then_some(self.delay)
    }
}

impl RetryPolicy for Box<dyn RetryPolicy> {
    fn retry_after(&self, attempt: u32, error: &StoreError) -> Option<Duration> {
        (**self).retry_after(attempt, error)
    }
}

/// Immutable, versioned copy of a document
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub identifier: String,
    pub document: Arc<Document>,
}

/// Observable coalescer state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Writing { version: u64 },
    Failed { version: u64, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedWrite {
    pub version: u64,
    pub error: String,
}

/// Summary returned once the coalescer is idle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Snapshots handed to the coalescer
    pub requests: u64,
    /// Successful `store` calls
    pub writes: u64,
    pub last_written: Option<u64>,
    /// Most recent failure not yet superseded by a successful write
    pub last_error: Option<FailedWrite>,
}

enum Command {
    Persist(Snapshot),
    Flush(oneshot::Sender<FlushReport>),
}

enum WriteEvent {
    Completed {
        snapshot: Snapshot,
        result: Result<(), StoreError>,
    },
    RetryDue {
        version: u64,
    },
}

enum State {
    Idle,
    Writing {
        pending: Option<Snapshot>,
        attempt: u32,
    },
    Backoff {
        failed: Snapshot,
        attempt: u32,
    },
}

/// Handle to a running save coalescer
#[derive(Debug)]
pub struct SaveCoalescer {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    task: JoinHandle<()>,
}

impl SaveCoalescer {
    /// Start the coalescer task. Must be called inside a tokio runtime.
    pub fn spawn<S, P>(store: S, policy: P) -> Self
    where
        S: DocumentStore,
        P: RetryPolicy,
    {
        Self::spawn_shared(Arc::new(store), policy)
    }

    pub fn spawn_shared<S, P>(store: Arc<S>, policy: P) -> Self
    where
        S: DocumentStore,
        P: RetryPolicy,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);

        let actor = Coalescer {
            store,
            policy,
            state: State::Idle,
            status: status_tx,
            done_tx,
            waiters: Vec::new(),
            report: FlushReport::default(),
            newest: None,
        };
        let task = tokio::spawn(actor.run(command_rx, done_rx));

        Self {
            commands,
            status,
            task,
        }
    }

    /// Hand over a snapshot; returns immediately
    pub fn request(&self, snapshot: Snapshot) -> Result<(), EditorError> {
        self.commands
            .send(Command::Persist(snapshot))
            .map_err(|_| EditorError::CoalescerClosed)
    }

    /// Wait until no write is in flight or pending
    pub async fn flush(&self) -> Result<FlushReport, EditorError> {
        let (reply, report) = oneshot::channel();
        self.commands
            .send(Command::Flush(reply))
            .map_err(|_| EditorError::CoalescerClosed)?;
        report.await.map_err(|_| EditorError::CoalescerClosed)
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Flush, then stop the task
    pub async fn close(self) -> Result<FlushReport, EditorError> {
        let report = self.flush().await?;
        drop(self.commands);
        let _ = self.task.await;
        Ok(report)
    }
}

struct Coalescer<S, P> {
    store: Arc<S>,
    policy: P,
    state: State,
    status: watch::Sender<SaveStatus>,
    done_tx: mpsc::UnboundedSender<WriteEvent>,
    waiters: Vec<oneshot::Sender<FlushReport>>,
    report: FlushReport,
    newest: Option<u64>,
}

impl<S: DocumentStore, P: RetryPolicy> Coalescer<S, P> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut done: mpsc::UnboundedReceiver<WriteEvent>,
    ) {
        let mut open = true;
        loop {
            // Commands first, so requests already queued supersede before a
            // completion is handled
            tokio::select! {
                biased;
                command = commands.recv(), if open => match command {
                    Some(Command::Persist(snapshot)) => self.on_request(snapshot),
                    Some(Command::Flush(reply)) => self.on_flush(reply),
                    None => open = false,
                },
                Some(event) = done.recv() => self.on_event(event),
            }

            if !open && matches!(self.state, State::Idle) {
                break;
            }
        }
        tracing::debug!("Save coalescer stopped");
    }

    fn on_request(&mut self, snapshot: Snapshot) {
        if self.newest.is_some_and(|newest| snapshot.version <= newest) {
            tracing::debug!("Ignoring stale snapshot v{}", snapshot.version);
            return;
        }
        self.newest = Some(snapshot.version);
        self.report.requests += 1;

        match &mut self.state {
            State::Idle => self.start_write(snapshot, 1),
            State::Writing { pending, .. } => {
                if let Some(replaced) = pending.replace(snapshot) {
                    tracing::debug!("Snapshot v{} superseded before writing", replaced.version);
                }
            }
            State::Backoff { failed, .. } => {
                tracing::debug!("Snapshot v{} superseded during backoff", failed.version);
                self.start_write(snapshot, 1);
            }
        }
    }

    fn on_flush(&mut self, reply: oneshot::Sender<FlushReport>) {
        match self.state {
            State::Idle => {
                let _ = reply.send(self.report.clone());
            }
            _ => self.waiters.push(reply),
        }
    }

    fn on_event(&mut self, event: WriteEvent) {
        match event {
            WriteEvent::Completed { snapshot, result } => self.on_completed(snapshot, result),
            WriteEvent::RetryDue { version } => {
                let state = std::mem::replace(&mut self.state, State::Idle);
                match state {
                    State::Backoff { failed, attempt } if failed.version == version => {
                        tracing::info!("Retrying {} (v{}, attempt {})", failed.identifier, version, attempt + 1);
                        self.start_write(failed, attempt + 1);
                    }
                    other => self.state = other,
                }
            }
        }
    }

    fn on_completed(&mut self, snapshot: Snapshot, result: Result<(), StoreError>) {
        let (pending, attempt) = match std::mem::replace(&mut self.state, State::Idle) {
            State::Writing { pending, attempt } => (pending, attempt),
            other => {
                // Only one write is ever in flight
                self.state = other;
                return;
            }
        };

        match result {
            Ok(()) => {
                tracing::info!("Saved {} (v{})", snapshot.identifier, snapshot.version);
                self.report.writes += 1;
                self.report.last_written = Some(snapshot.version);
                self.report.last_error = None;

                match pending {
                    Some(next) => self.start_write(next, 1),
                    None => self.go_idle(SaveStatus::Idle),
                }
            }
            Err(error) => {
                tracing::warn!("Failed to save {} (v{}): {}", snapshot.identifier, snapshot.version, error);
                let failure = FailedWrite {
                    version: snapshot.version,
                    error: error.to_string(),
                };
                self.report.last_error = Some(failure.clone());
                let failed_status = SaveStatus::Failed {
                    version: failure.version,
                    error: failure.error,
                };

                if let Some(next) = pending {
                    self.start_write(next, 1);
                } else if let Some(delay) = self.policy.retry_after(attempt, &error) {
                    self.status.send_replace(failed_status);
                    self.schedule_retry(snapshot.version, delay);
                    self.state = State::Backoff {
                        failed: snapshot,
                        attempt,
                    };
                } else {
                    tracing::error!("Giving up on v{} until the next edit", snapshot.version);
                    self.go_idle(failed_status);
                }
            }
        }
    }

    fn start_write(&mut self, snapshot: Snapshot, attempt: u32) {
        self.state = State::Writing {
            pending: None,
            attempt,
        };
        self.status.send_replace(SaveStatus::Writing {
            version: snapshot.version,
        });
        tracing::debug!("Writing {} (v{})", snapshot.identifier, snapshot.version);

        let store = Arc::clone(&self.store);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = store.store(&snapshot.identifier, &snapshot.document).await;
            let _ = done.send(WriteEvent::Completed { snapshot, result });
        });
    }

    fn schedule_retry(&self, version: u64, delay: Duration) {
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = done.send(WriteEvent::RetryDue { version });
        });
    }

    fn go_idle(&mut self, status: SaveStatus) {
        self.state = State::Idle;
        self.status.send_replace(status);
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(self.report.clone());
        }
    }
}

/// In-memory store keeping every write, used for previews and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    writes: Mutex<Vec<(String, Document)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write so far, oldest first
    pub fn writes(&self) -> Vec<(String, Document)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Latest document per identifier
    pub fn latest(&self) -> BTreeMap<String, Document> {
        self.writes().into_iter().collect()
    }
}

impl DocumentStore for MemoryStore {
    async fn store(&self, identifier: &str, document: &Document) -> Result<(), StoreError> {
        let mut writes = self
            .writes
            .lock()
            .map_err(|_| StoreError::Rejected("memory store poisoned".to_string()))?;
        writes.push((identifier.to_string(), document.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(version: u64) -> Snapshot {
        let mut document = Document::default();
        crate::Mutation::set("$.name", format!("v{}", version))
            .unwrap()
            .apply(document.root_mut())
            .unwrap();
        Snapshot {
            version,
            identifier: "frames/f.json".to_string(),
            document: Arc::new(document),
        }
    }

    #[test]
    fn test_fixed_delay_policy() {
        let policy = FixedDelay {
            attempts: 2,
            delay: Duration::from_millis(5),
        };
        let error = StoreError::Rejected("nope".into());
        assert_eq!(policy.retry_after(1, &error), Some(Duration::from_millis(5)));
        assert_eq!(policy.retry_after(2, &error), Some(Duration::from_millis(5)));
        assert_eq!(policy.retry_after(3, &error), None);
        assert_eq!(NoRetry.retry_after(1, &error), None);
    }

    #[tokio::test]
    async fn test_single_request_is_written() {
        let store = Arc::new(MemoryStore::new());
        let coalescer = SaveCoalescer::spawn_shared(Arc::clone(&store), NoRetry);

        coalescer.request(snapshot(1)).unwrap();
        let report = coalescer.flush().await.unwrap();

        assert_eq!(report.writes, 1);
        assert_eq!(report.last_written, Some(1));
        assert_eq!(coalescer.status(), SaveStatus::Idle);
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_snapshots_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let coalescer = SaveCoalescer::spawn_shared(Arc::clone(&store), NoRetry);

        coalescer.request(snapshot(2)).unwrap();
        coalescer.request(snapshot(1)).unwrap();
        let report = coalescer.close().await.unwrap();

        assert_eq!(report.requests, 1);
        assert_eq!(report.last_written, Some(2));
    }

    #[tokio::test]
    async fn test_flush_when_idle_returns_immediately() {
        let coalescer = SaveCoalescer::spawn(MemoryStore::new(), NoRetry);
        assert_eq!(coalescer.flush().await.unwrap(), FlushReport::default());
    }
}
