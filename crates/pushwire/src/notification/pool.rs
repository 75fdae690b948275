// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Worker pool: N engines on N threads.
//!
//! Two modes:
//!
//! - **List**: the messages are split into contiguous, nearly equal groups up
//!   front. One worker per non-empty group sends its group and exits.
//!   [`WorkerPool::wait_for_all`] blocks until every worker is done.
//! - **Queue**: workers start idle and block on their own channel.
//!   [`WorkerPool::enqueue`] hands each message to the next worker in
//!   rotation, skipping workers that are mid-send. Workers exit when the pool
//!   is closed or dropped.
//!
//! Worker `i` (1-based) tags frames with `(i << 24) | seq`, so identifiers are
//! unique across the pool.
//!
//! Threads are detached; nothing joins them on drop.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendError, Sender};
use parking_lot::{Condvar, Mutex};

use crate::config::PoolConfig;
use crate::error::PushError;
use crate::metrics::PushMetrics;
use crate::notification::engine::TransmissionEngine;
use crate::notification::identifier::MessageIdGenerator;
use crate::notification::listener::{ProgressListener, RestartReason};
use crate::notification::outcome::PushOutcome;
use crate::payload::Payload;
use crate::server::ServerDescriptor;
use crate::transport::Connector;

// ============================================================================
// Messages and partitioning
// ============================================================================

/// One notification addressed to one device.
#[derive(Debug, Clone)]
pub struct PushMessage {
    token: String,
    payload: Payload,
}

impl PushMessage {
    /// Address `payload` to the device `token` (64 hex characters).
    pub fn new(token: impl Into<String>, payload: Payload) -> Self {
        Self {
            token: token.into(),
            payload,
        }
    }

    /// Device token as supplied.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// How a pool receives its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMode {
    /// Fixed message list, partitioned at construction.
    List,
    /// Messages arrive through [`WorkerPool::enqueue`].
    Queue,
}

/// Group sizes for splitting `len` items into `groups` contiguous groups.
///
/// Sizes differ by at most one; the first `len % groups` groups carry the
/// extra item. Trailing zeros appear when `len < groups`.
pub fn partition_sizes(len: usize, groups: usize) -> Vec<usize> {
    if groups == 0 {
        return Vec::new();
    }
    let base = len / groups;
    let extra = len % groups;
    (0..groups).map(|g| base + usize::from(g < extra)).collect()
}

/// Split `items` into at most `groups` contiguous, order-preserving groups.
///
/// Empty groups are dropped.
pub fn split_into_groups<T>(items: Vec<T>, groups: usize) -> Vec<Vec<T>> {
    let sizes = partition_sizes(items.len(), groups);
    let mut rest = items.into_iter();
    sizes
        .into_iter()
        .filter(|&size| size > 0)
        .map(|size| rest.by_ref().take(size).collect())
        .collect()
}

// ============================================================================
// Per-worker state
// ============================================================================

/// Point-in-time view of one worker.
#[derive(Debug, Clone)]
pub struct WorkerSnapshot {
    /// 1-based worker index (high byte of its identifiers).
    pub index: u8,
    /// Pool mode.
    pub mode: PoolMode,
    /// Mid-send right now.
    pub busy: bool,
    /// Thread started and not yet finished.
    pub running: bool,
    /// Notifications attempted.
    pub pushed: usize,
    /// Notifications written.
    pub successful: usize,
    /// Notifications that failed.
    pub failed: usize,
    /// First identifier used.
    pub first_identifier: Option<u32>,
    /// Last identifier used.
    pub last_identifier: Option<u32>,
    /// Proactive and recovery reconnects.
    pub connection_restarts: u32,
    /// Error that stopped the worker.
    pub critical_error: Option<PushError>,
}

#[derive(Default)]
struct WorkerLog {
    outcomes: Vec<PushOutcome>,
    critical: Option<PushError>,
    first_identifier: Option<u32>,
    last_identifier: Option<u32>,
    restarts: u32,
}

struct WorkerShared {
    index: u8,
    mode: PoolMode,
    started: AtomicBool,
    busy: AtomicBool,
    stopped: AtomicBool,
    log: Mutex<WorkerLog>,
}

impl WorkerShared {
    fn new(index: u8, mode: PoolMode) -> Self {
        Self {
            index,
            mode,
            started: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            log: Mutex::new(WorkerLog::default()),
        }
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn record(&self, outcome: PushOutcome) {
        let mut log = self.log.lock();
        let id = outcome.identifier();
        log.first_identifier.get_or_insert(id);
        log.last_identifier = Some(id);
        log.outcomes.push(outcome);
    }

    fn snapshot(&self) -> WorkerSnapshot {
        let log = self.log.lock();
        let successful = log.outcomes.iter().filter(|o| o.is_successful()).count();
        WorkerSnapshot {
            index: self.index,
            mode: self.mode,
            busy: self.is_busy(),
            running: self.started.load(Ordering::Acquire) && !self.is_stopped(),
            pushed: log.outcomes.len(),
            successful,
            failed: log.outcomes.len() - successful,
            first_identifier: log.first_identifier,
            last_identifier: log.last_identifier,
            connection_restarts: log.restarts,
            critical_error: log.critical.clone(),
        }
    }
}

/// State shared by the pool handle and its threads.
struct PoolShared {
    workers: Vec<WorkerShared>,
    /// Workers that have not called `finish` yet.
    unfinished: AtomicUsize,
    /// Workers `wait_for_all` is still waiting for.
    running: Mutex<usize>,
    all_done: Condvar,
}

impl PoolShared {
    fn snapshots(&self) -> Vec<WorkerSnapshot> {
        self.workers.iter().map(WorkerShared::snapshot).collect()
    }

    /// Mark worker `pos` finished. The last one reports `on_all_finished`
    /// before waiters are released.
    fn finish(&self, pos: usize, listener: Option<&Arc<dyn ProgressListener>>) {
        let worker = &self.workers[pos];
        worker.busy.store(false, Ordering::Release);
        worker.stopped.store(true, Ordering::Release);

        if let Some(l) = listener {
            l.on_worker_finished(&worker.snapshot());
        }
        if self.unfinished.fetch_sub(1, Ordering::AcqRel) == 1 {
            if let Some(l) = listener {
                l.on_all_finished(&self.snapshots());
            }
        }

        let mut running = self.running.lock();
        *running = running.saturating_sub(1);
        if *running == 0 {
            self.all_done.notify_all();
        }
    }
}

// ============================================================================
// Worker thread
// ============================================================================

enum WorkerTask {
    List(Vec<PushMessage>),
    Queue(Receiver<PushMessage>),
}

struct Worker {
    pos: usize,
    shared: Arc<PoolShared>,
    connector: Arc<dyn Connector>,
    server: ServerDescriptor,
    config: PoolConfig,
    listener: Option<Arc<dyn ProgressListener>>,
    metrics: Option<Arc<PushMetrics>>,
}

impl Worker {
    fn me(&self) -> &WorkerShared {
        &self.shared.workers[self.pos]
    }

    fn run(self, task: WorkerTask) {
        let index = self.me().index;
        self.me().started.store(true, Ordering::Release);
        if let Some(l) = &self.listener {
            l.on_worker_started(&self.me().snapshot());
        }
        log::debug!("[pool] worker {} started", index);

        let mut engine = TransmissionEngine::new(self.connector.clone(), self.config.engine.clone());
        if let Some(m) = &self.metrics {
            engine = engine.with_metrics(m.clone());
        }
        let mut ids = MessageIdGenerator::for_worker(index);

        // A retryable connect failure is left to the first send's retry budget
        let result = match engine.initialize(self.server.clone()) {
            Err(e) if e.is_retryable() => {
                log::info!(
                    "[pool] worker {} initial connect failed, retrying on first send: {}",
                    index,
                    e
                );
                Ok(())
            }
            other => other,
        }
        .and_then(|()| match task {
            WorkerTask::List(messages) => self.run_list(&mut engine, &mut ids, &messages),
            WorkerTask::Queue(rx) => self.run_queue(&mut engine, &mut ids, &rx),
        });
        engine.stop();

        if let Err(e) = result {
            log::warn!("[pool] worker {} stopped on critical error: {}", index, e);
            self.me().log.lock().critical = Some(e.clone());
            if let Some(l) = &self.listener {
                l.on_critical_error(index, &e);
            }
        }

        log::debug!("[pool] worker {} finished", index);
        self.shared.finish(self.pos, self.listener.as_ref());
    }

    fn run_list(
        &self,
        engine: &mut TransmissionEngine,
        ids: &mut MessageIdGenerator,
        messages: &[PushMessage],
    ) -> Result<(), PushError> {
        let max = self.config.max_notifications_per_connection as usize;
        for (i, message) in messages.iter().enumerate() {
            if i != 0 {
                if max != 0 && i % max == 0 {
                    if let Err(e) = self.restart(engine) {
                        self.fail(ids, message, &e);
                        return Err(e);
                    }
                }
                self.pause();
            }
            self.me().busy.store(true, Ordering::Release);
            let delivered = self.deliver(engine, ids, message);
            self.me().busy.store(false, Ordering::Release);
            delivered?;
        }
        Ok(())
    }

    fn run_queue(
        &self,
        engine: &mut TransmissionEngine,
        ids: &mut MessageIdGenerator,
        rx: &Receiver<PushMessage>,
    ) -> Result<(), PushError> {
        let max = self.config.max_notifications_per_connection as usize;
        let mut on_connection = 0usize;
        let mut sent_any = false;

        loop {
            let message = match rx.recv_timeout(self.config.queue_poll_interval) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            };

            self.me().busy.store(true, Ordering::Release);
            if sent_any {
                self.pause();
            }
            if max != 0 && on_connection == max {
                if let Err(e) = self.restart(engine) {
                    self.fail(ids, &message, &e);
                    self.me().busy.store(false, Ordering::Release);
                    self.fail_pending(ids, rx, &e);
                    return Err(e);
                }
                on_connection = 0;
            }

            let delivered = self.deliver(engine, ids, &message);
            self.me().busy.store(false, Ordering::Release);
            sent_any = true;
            on_connection += 1;

            if let Err(e) = delivered {
                self.fail_pending(ids, rx, &e);
                return Err(e);
            }
        }
    }

    /// Send one message and record its outcome. Only critical errors are
    /// returned.
    fn deliver(
        &self,
        engine: &mut TransmissionEngine,
        ids: &mut MessageIdGenerator,
        message: &PushMessage,
    ) -> Result<(), PushError> {
        let identifier = ids.next_id();
        let before = engine.stats().reconnections;
        let result = engine.send(message.token(), message.payload(), identifier);
        for _ in before..engine.stats().reconnections {
            self.note_restart(RestartReason::Recovery);
        }

        let error = result.err();
        let critical = error.as_ref().filter(|e| e.is_critical()).cloned();
        self.me().record(PushOutcome::new(
            message.token(),
            message.payload().clone(),
            identifier,
            error,
        ));

        match critical {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Proactive reconnect. A transport failure here is left to the next
    /// send, which reconnects with retries.
    fn restart(&self, engine: &mut TransmissionEngine) -> Result<(), PushError> {
        if let Some(m) = &self.metrics {
            m.record_proactive_restart();
        }
        self.note_restart(RestartReason::Proactive);
        match engine.restart_connection() {
            Ok(()) => Ok(()),
            Err(e) if e.is_retryable() => {
                log::info!(
                    "[pool] worker {} proactive reconnect failed: {}",
                    self.me().index,
                    e
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn note_restart(&self, reason: RestartReason) {
        self.me().log.lock().restarts += 1;
        if let Some(l) = &self.listener {
            l.on_connection_restarted(self.me().index, reason);
        }
    }

    fn pause(&self) {
        let pause = self.config.sleep_between_notifications;
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }

    /// Record a failed outcome for a message that never reached the engine.
    fn fail(&self, ids: &mut MessageIdGenerator, message: &PushMessage, error: &PushError) {
        self.me().record(PushOutcome::new(
            message.token(),
            message.payload().clone(),
            ids.next_id(),
            Some(error.clone()),
        ));
    }

    /// Fail every message already queued for this worker. The worker is
    /// marked stopped first so `enqueue` stops routing to it.
    fn fail_pending(
        &self,
        ids: &mut MessageIdGenerator,
        rx: &Receiver<PushMessage>,
        error: &PushError,
    ) {
        self.me().stopped.store(true, Ordering::Release);
        let mut failed = 0usize;
        for message in rx.try_iter() {
            self.fail(ids, &message, error);
            failed += 1;
        }
        if failed > 0 {
            log::warn!(
                "[pool] worker {} failing {} queued message(s): {}",
                self.me().index,
                failed,
                error
            );
        }
    }
}

// ============================================================================
// WorkerPool
// ============================================================================

/// Pool of transmission engines, one thread each.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use pushwire::{
///     ConnectionConfig, ConnectionManager, Environment, FileCredentials, CredentialFormat,
///     Payload, PoolConfig, ServerDescriptor, WorkerPool,
/// };
///
/// # fn main() -> pushwire::Result<()> {
/// let credentials = Arc::new(FileCredentials::new("push.pem", CredentialFormat::Pem));
/// let server = ServerDescriptor::notification(Environment::Sandbox, credentials);
/// let manager = Arc::new(ConnectionManager::new(ConnectionConfig::default())?);
///
/// let tokens = vec!["a".repeat(64), "b".repeat(64)];
/// let pool = WorkerPool::list_for_payload(
///     manager,
///     server,
///     Payload::from(r#"{"aps":{"alert":"hi"}}"#),
///     tokens,
///     PoolConfig::default().with_workers(2),
/// )?;
/// pool.start()?;
/// pool.wait_for_all(true)?;
/// println!("{} sent, {} failed", pool.successful().len(), pool.failed().len());
/// # Ok(())
/// # }
/// ```
pub struct WorkerPool {
    mode: PoolMode,
    connector: Arc<dyn Connector>,
    server: ServerDescriptor,
    config: PoolConfig,
    listener: Option<Arc<dyn ProgressListener>>,
    metrics: Option<Arc<PushMetrics>>,
    shared: Arc<PoolShared>,
    pending: Mutex<Option<Vec<WorkerTask>>>,
    senders: Vec<Sender<PushMessage>>,
    cursor: AtomicUsize,
    started: AtomicBool,
}

impl WorkerPool {
    /// List-mode pool over `messages`.
    pub fn list(
        connector: Arc<dyn Connector>,
        server: ServerDescriptor,
        messages: Vec<PushMessage>,
        config: PoolConfig,
    ) -> Result<Self, PushError> {
        config
            .validate()
            .map_err(|e| PushError::Config(e.to_string()))?;
        let tasks = split_into_groups(messages, config.workers)
            .into_iter()
            .map(WorkerTask::List)
            .collect();
        Self::build(PoolMode::List, connector, server, config, tasks, Vec::new())
    }

    /// List-mode pool sending the same payload to every token.
    pub fn list_for_payload<I, S>(
        connector: Arc<dyn Connector>,
        server: ServerDescriptor,
        payload: Payload,
        tokens: I,
        config: PoolConfig,
    ) -> Result<Self, PushError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let messages = tokens
            .into_iter()
            .map(|t| PushMessage::new(t, payload.clone()))
            .collect();
        Self::list(connector, server, messages, config)
    }

    /// Queue-mode pool with `config.workers` idle workers.
    pub fn queue(
        connector: Arc<dyn Connector>,
        server: ServerDescriptor,
        config: PoolConfig,
    ) -> Result<Self, PushError> {
        config
            .validate()
            .map_err(|e| PushError::Config(e.to_string()))?;
        let (senders, tasks): (Vec<_>, Vec<_>) = (0..config.workers)
            .map(|_| {
                let (tx, rx) = channel::unbounded();
                (tx, WorkerTask::Queue(rx))
            })
            .unzip();
        Self::build(PoolMode::Queue, connector, server, config, tasks, senders)
    }

    fn build(
        mode: PoolMode,
        connector: Arc<dyn Connector>,
        server: ServerDescriptor,
        config: PoolConfig,
        tasks: Vec<WorkerTask>,
        senders: Vec<Sender<PushMessage>>,
    ) -> Result<Self, PushError> {
        let workers = (1..=tasks.len())
            .map(|i| {
                u8::try_from(i)
                    .map(|index| WorkerShared::new(index, mode))
                    .map_err(|_| PushError::Config("too many workers".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let count = workers.len();

        Ok(Self {
            mode,
            connector,
            server,
            config,
            listener: None,
            metrics: None,
            shared: Arc::new(PoolShared {
                workers,
                unfinished: AtomicUsize::new(count),
                running: Mutex::new(0),
                all_done: Condvar::new(),
            }),
            pending: Mutex::new(Some(tasks)),
            senders,
            cursor: AtomicUsize::new(0),
            started: AtomicBool::new(false),
        })
    }

    /// Report progress to `listener`.
    pub fn with_listener(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Record delivery events in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<PushMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Launch the worker threads. Idempotent.
    pub fn start(&self) -> Result<(), PushError> {
        // Running count is set before `started` becomes visible to waiters
        let tasks = {
            let mut running = self.shared.running.lock();
            if self.started.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            let tasks = self.pending.lock().take().unwrap_or_default();
            *running = tasks.len();
            tasks
        };

        log::debug!(
            "[pool] starting {:?} pool: {} workers to {}",
            self.mode,
            tasks.len(),
            self.server
        );
        if let Some(l) = &self.listener {
            l.on_pool_started(self.mode, tasks.len());
            if tasks.is_empty() {
                l.on_all_finished(&[]);
            }
        }

        for (pos, task) in tasks.into_iter().enumerate() {
            let worker = Worker {
                pos,
                shared: self.shared.clone(),
                connector: self.connector.clone(),
                server: self.server.clone(),
                config: self.config.clone(),
                listener: self.listener.clone(),
                metrics: self.metrics.clone(),
            };
            let name = format!(
                "{}-{}",
                self.config.thread_name_prefix, self.shared.workers[pos].index
            );

            let spawned = thread::Builder::new()
                .name(name)
                .spawn(move || worker.run(task));
            if let Err(e) = spawned {
                let err = PushError::Internal(format!("failed to spawn worker thread: {}", e));
                log::error!("[pool] {}", err);
                self.shared.workers[pos].log.lock().critical = Some(err.clone());
                if let Some(l) = &self.listener {
                    l.on_critical_error(self.shared.workers[pos].index, &err);
                }
                self.shared.finish(pos, self.listener.as_ref());
            }
        }
        Ok(())
    }

    /// Hand a message to a queue worker, starting the pool if needed.
    ///
    /// Returns the index of the chosen worker.
    pub fn enqueue(&self, payload: Payload, token: impl Into<String>) -> Result<u8, PushError> {
        if self.mode != PoolMode::Queue {
            return Err(PushError::InvalidState("enqueue requires a queue-mode pool"));
        }
        if self.senders.is_empty() {
            return Err(PushError::InvalidState("pool is closed"));
        }
        self.start()?;

        let workers = &self.shared.workers;
        let n = workers.len();
        let from = self.cursor.fetch_add(1, Ordering::Relaxed) % n;

        // Rotation order, idle workers first; stable sort keeps the rotation
        let mut order: Vec<usize> = (0..n)
            .map(|k| (from + k) % n)
            .filter(|&pos| !workers[pos].is_stopped())
            .collect();
        order.sort_by_key(|&pos| workers[pos].is_busy());

        let mut message = PushMessage::new(token, payload);
        for pos in order {
            match self.senders[pos].send(message) {
                Ok(()) => return Ok(workers[pos].index),
                Err(SendError(back)) => message = back,
            }
        }
        Err(PushError::InvalidState("no queue worker is running"))
    }

    /// Block until every list worker finished.
    ///
    /// With `throw_critical`, the first recorded critical error (by worker
    /// index) is returned.
    pub fn wait_for_all(&self, throw_critical: bool) -> Result<(), PushError> {
        if self.mode == PoolMode::Queue {
            return Err(PushError::InvalidState(
                "queue workers never finish on their own; use close()",
            ));
        }
        if !self.is_started() {
            return Err(PushError::InvalidState("pool not started"));
        }
        self.wait_idle();
        self.raise_critical(throw_critical)
    }

    /// Stop accepting messages and wait for queue workers to drain their
    /// channels. Idempotent.
    pub fn close(&mut self, throw_critical: bool) -> Result<(), PushError> {
        if self.mode != PoolMode::Queue {
            return Err(PushError::InvalidState("close requires a queue-mode pool"));
        }
        self.senders.clear();
        if self.is_started() {
            self.wait_idle();
        }
        self.raise_critical(throw_critical)
    }

    fn wait_idle(&self) {
        let mut running = self.shared.running.lock();
        while *running > 0 {
            self.shared.all_done.wait(&mut running);
        }
    }

    fn raise_critical(&self, throw_critical: bool) -> Result<(), PushError> {
        if throw_critical {
            if let Some(e) = self.critical_errors().into_iter().next() {
                return Err(e);
            }
        }
        Ok(())
    }

    /// Every outcome so far, grouped by worker.
    pub fn outcomes(&self) -> Vec<PushOutcome> {
        self.shared
            .workers
            .iter()
            .flat_map(|w| w.log.lock().outcomes.clone())
            .collect()
    }

    /// Outcomes that succeeded.
    pub fn successful(&self) -> Vec<PushOutcome> {
        self.outcomes().into_iter().filter(PushOutcome::is_successful).collect()
    }

    /// Outcomes that failed.
    pub fn failed(&self) -> Vec<PushOutcome> {
        self.outcomes().into_iter().filter(|o| !o.is_successful()).collect()
    }

    /// Critical errors, by worker index.
    pub fn critical_errors(&self) -> Vec<PushError> {
        self.shared
            .workers
            .iter()
            .filter_map(|w| w.log.lock().critical.clone())
            .collect()
    }

    /// Snapshot of every worker.
    pub fn workers(&self) -> Vec<WorkerSnapshot> {
        self.shared.snapshots()
    }

    /// Number of workers (list mode: non-empty groups only).
    pub fn worker_count(&self) -> usize {
        self.shared.workers.len()
    }

    /// Workers not yet finished.
    pub fn running_workers(&self) -> usize {
        *self.shared.running.lock()
    }

    /// Pool mode.
    pub fn mode(&self) -> PoolMode {
        self.mode
    }

    /// True once `start` ran.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("mode", &self.mode)
            .field("server", &self.server)
            .field("workers", &self.worker_count())
            .field("started", &self.is_started())
            .field("running", &self.running_workers())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
