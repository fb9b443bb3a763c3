// src/engine/runner.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, info, warn};

use crate::dag::sequencer;
use crate::errors::RunError;
use crate::registry::{CommandId, CommandSource};

/// Per-session state of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmdState {
    /// Not dispatched yet (or dispatched once and failed; a failure halts
    /// the session before a second dispatch could happen).
    NotStarted,
    /// Dispatched to a worker and currently executing.
    Running,
    /// Body returned successfully.
    Completed,
}

/// Options that influence how the runner behaves.
#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    /// Upper bound on command bodies in flight at once.
    ///
    /// `None` or `Some(0)` means the implementation default (available
    /// parallelism), not unlimited. With `max_workers = 1` execution order
    /// is exactly the sequencer's output order.
    pub max_workers: Option<usize>,
}

impl RunnerOptions {
    fn effective_max_workers(&self) -> usize {
        match self.max_workers {
            Some(n) if n > 0 => n,
            _ => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// Outcome of one worker, reported back to the coordinating loop.
///
/// Workers never touch the status map themselves; this message is their only
/// way to affect session state.
struct WorkerDone {
    id: CommandId,
    result: anyhow::Result<()>,
}

/// Drives requests against a [`CommandSource`] with bounded concurrency.
///
/// Each [`run`](Runner::run) call is one isolated session: the request is
/// expanded to its dependency closure, and commands are dispatched as their
/// dependencies complete, at most `max_workers` at a time. A cyclic request
/// cannot be expanded; it falls back to running the requested ids directly,
/// one at a time (see [`run`](Runner::run)).
pub struct Runner<S: CommandSource> {
    source: Arc<S>,
    options: RunnerOptions,
}

impl<S: CommandSource> Runner<S> {
    pub fn new(source: Arc<S>, options: RunnerOptions) -> Self {
        Self { source, options }
    }

    /// The source this runner schedules against.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Execute `requested` and every transitive dependency, concurrently
    /// where the dependency order allows.
    ///
    /// Returns `Ok(())` once every command in the closure has completed.
    /// On a body failure no new commands are dispatched, in-flight work is
    /// allowed to finish, and the error of the first failed command (in
    /// dispatch order) is returned.
    ///
    /// If the closure contains a cycle it cannot be ordered; the runner then
    /// runs exactly the *requested* ids, in the given order, synchronously
    /// one at a time, ignoring dependency lists altogether. Dependencies not
    /// on the cycle are not resurrected on this path; callers get the
    /// requested commands and nothing else. The fallback is logged at warn
    /// level.
    pub async fn run(&self, requested: &[CommandId]) -> Result<(), RunError> {
        match sequencer::sequence(requested, self.source.as_ref()) {
            Ok(order) => {
                let session = Session::new(
                    Arc::clone(&self.source),
                    order,
                    self.options.effective_max_workers(),
                );
                session.drive().await
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "request cannot be ordered; falling back to direct execution of the requested commands"
                );
                self.run_fallback(requested).await
            }
        }
    }

    /// Cycle fallback: each requested id, in order, run to completion before
    /// the next starts. Ids the source already reports completed are skipped.
    async fn run_fallback(&self, requested: &[CommandId]) -> Result<(), RunError> {
        for id in requested {
            if self.source.has_completed(id) {
                debug!(command = %id, "already completed; skipping");
                continue;
            }

            info!(command = %id, "running command directly");
            let source = Arc::clone(&self.source);
            let body_id = id.clone();
            let joined = task::spawn_blocking(move || source.run_one(&body_id)).await;

            if let Err(err) = flatten_worker_result(joined) {
                return Err(RunError::Command {
                    id: id.clone(),
                    source: err,
                });
            }
        }
        Ok(())
    }
}

/// Collapse a blocking-pool join result into the body's own result; a
/// panicked body surfaces as an error rather than tearing the session down.
fn flatten_worker_result(
    joined: Result<anyhow::Result<()>, task::JoinError>,
) -> anyhow::Result<()> {
    match joined {
        Ok(result) => result,
        Err(join_err) => Err(anyhow::Error::new(join_err).context("command body panicked")),
    }
}

/// One `run` call over one ordered closure.
///
/// The session loop is the single writer of the status map. Workers report
/// back over `tx`/`rx`; every status transition happens here, which is what
/// keeps the dispatch scan race-free without any locking on the map.
struct Session<S: CommandSource> {
    source: Arc<S>,
    /// The ordered dependency closure. Dispatch scans walk it in order, so
    /// submission order is deterministic for a fixed source.
    order: Vec<CommandId>,
    /// Populated lazily; a command absent from the map is `NotStarted`.
    status: HashMap<CommandId, CmdState>,
    max_workers: usize,
    in_flight: usize,
    /// Set on the first body failure; suppresses all further dispatch while
    /// in-flight work drains.
    halted: bool,
    /// Every captured body error, keyed by command. Only the first in
    /// `order` is returned; the rest are logged and discarded.
    failures: HashMap<CommandId, anyhow::Error>,
    tx: mpsc::Sender<WorkerDone>,
    rx: mpsc::Receiver<WorkerDone>,
}

impl<S: CommandSource> Session<S> {
    fn new(source: Arc<S>, order: Vec<CommandId>, max_workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<WorkerDone>(order.len().max(1));
        Self {
            source,
            order,
            status: HashMap::new(),
            max_workers,
            in_flight: 0,
            halted: false,
            failures: HashMap::new(),
            tx,
            rx,
        }
    }

    async fn drive(mut self) -> Result<(), RunError> {
        info!(
            commands = self.order.len(),
            max_workers = self.max_workers,
            "starting run"
        );

        // Commands the source already reports completed (e.g. from an
        // earlier session over the same registry) never dispatch.
        for id in &self.order {
            if self.source.has_completed(id) {
                debug!(command = %id, "already completed before this run");
                self.status.insert(id.clone(), CmdState::Completed);
            }
        }

        loop {
            if !self.halted {
                self.dispatch_scan();
            }

            if self.finished() {
                info!("all commands completed");
                return Ok(());
            }

            if self.in_flight == 0 {
                if self.halted {
                    break;
                }
                // Nothing running and nothing dispatchable: the source's
                // dependency lists changed under us.
                warn!("no runnable command and none in flight; aborting run");
                return Err(RunError::Stalled);
            }

            match self.rx.recv().await {
                Some(done) => self.handle_worker_done(done),
                // We hold a sender ourselves, so the channel cannot close
                // while workers are in flight.
                None => return Err(RunError::Stalled),
            }
        }

        self.first_failure()
    }

    /// Walk the order and dispatch every command whose dependencies are all
    /// completed, up to the worker limit. Non-blocking; dispatched bodies
    /// run on the blocking pool and report back over the channel.
    fn dispatch_scan(&mut self) {
        let mut ready = Vec::new();
        for id in &self.order {
            if self.in_flight + ready.len() >= self.max_workers {
                break;
            }
            if self.state(id) == CmdState::NotStarted && self.needs_satisfied(id) {
                ready.push(id.clone());
            }
        }

        for id in ready {
            debug!(command = %id, "dependencies satisfied; dispatching");
            self.status.insert(id.clone(), CmdState::Running);
            self.in_flight += 1;
            self.spawn_worker(id);
        }
    }

    fn spawn_worker(&self, id: CommandId) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let body_id = id.clone();
            let joined = task::spawn_blocking(move || source.run_one(&body_id)).await;
            let result = flatten_worker_result(joined);
            // A closed channel means the session is already gone; there is
            // nobody left to report to.
            let _ = tx.send(WorkerDone { id, result }).await;
        });
    }

    fn handle_worker_done(&mut self, done: WorkerDone) {
        self.in_flight -= 1;

        match done.result {
            Ok(()) => {
                debug!(command = %done.id, "command completed");
                self.status.insert(done.id, CmdState::Completed);
            }
            Err(err) => {
                warn!(
                    command = %done.id,
                    error = %err,
                    "command failed; halting new dispatch, draining in-flight work"
                );
                // Clear the running marker without marking completion. The
                // halt below guarantees it is never dispatched again.
                self.status.insert(done.id.clone(), CmdState::NotStarted);
                self.failures.insert(done.id, err);
                self.halted = true;
            }
        }
    }

    fn state(&self, id: &str) -> CmdState {
        self.status.get(id).copied().unwrap_or(CmdState::NotStarted)
    }

    fn needs_satisfied(&self, id: &str) -> bool {
        self.source
            .dependencies_of(id)
            .iter()
            .all(|dep| self.state(dep) == CmdState::Completed || self.source.has_completed(dep))
    }

    fn finished(&self) -> bool {
        self.order
            .iter()
            .all(|id| self.state(id) == CmdState::Completed)
    }

    /// Return the error of the first command in order that recorded one,
    /// discarding (with a log line) any captured after it.
    fn first_failure(&mut self) -> Result<(), RunError> {
        for id in &self.order {
            if let Some(err) = self.failures.remove(id) {
                for (other, discarded) in self.failures.drain() {
                    warn!(
                        command = %other,
                        error = %discarded,
                        "additional command failure discarded"
                    );
                }
                return Err(RunError::Command {
                    id: id.clone(),
                    source: err,
                });
            }
        }
        // Halted implies at least one recorded failure; keep a hard error
        // here rather than pretending the run succeeded.
        warn!("run halted without a recorded failure");
        Err(RunError::Stalled)
    }
}
