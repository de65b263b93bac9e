//! The catch-up engine: four cooperating tasks reconciling the missing,
//! waiting, and received sets against the host node's heights.
//!
//! # Tasks
//!
//! - **scan loop** (periodic): raises the received-set watermark to the
//!   saved height, purges stale entries from all three sets, and queues
//!   every height between the watermark and the network's target ceiling
//!   that is neither buffered nor in flight.
//! - **sweep loop** (periodic): moves timed-out requests from the waiting
//!   set back to the missing queue.
//! - **mailbox loop** (event driven): the single admission point. All
//!   mutations triggered by notifications funnel through here, so the
//!   drop-or-admit decision for each event is made in one place.
//! - **dispatch loop**: pops the lowest missing height, sends a block
//!   request, and marks the height in flight — capped by the request limit.
//!
//! Each loop's single cycle is also a public method (`scan_once`,
//! `sweep_once`, `drain_mailbox`, `dispatch_once`) so the machinery can be
//! driven deterministically, mirroring how the host can call it during
//! controlled shutdown or tests.

use std::sync::Arc;

use dirchain_block::{BlockRequest, BlockState};
use dirchain_common::Height;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::missing::MissingBlocks;
use crate::received::ReceivedBlocks;
use crate::waiting::WaitingBlocks;
use crate::{CatchupConfig, CatchupError, ChainHeights, RequestSender, Result};

/// Outcome of one dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A request for this height was handed to the transport.
    Requested(Height),
    /// Nothing to request right now.
    Idle,
    /// The in-flight cap is reached; no request was attempted.
    Throttled,
}

/// Point-in-time counters for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchupStats {
    /// Heights queued for request.
    pub missing: usize,
    /// Requests in flight.
    pub waiting: usize,
    /// Payloads buffered for application.
    pub received: usize,
    /// The contiguous-delivery watermark.
    pub base: Height,
}

/// Receivers drained by the mailbox. Moved into the mailbox task on start.
struct MailboxReceivers {
    missing_rx: mpsc::Receiver<Height>,
    waiting_rx: mpsc::Receiver<Height>,
    inbound_rx: mpsc::Receiver<BlockState>,
}

/// State shared by the engine handle and its spawned tasks.
struct EngineInner {
    config: CatchupConfig,
    heights: Arc<dyn ChainHeights>,
    transport: Arc<dyn RequestSender>,
    missing: Mutex<MissingBlocks>,
    waiting: Mutex<WaitingBlocks>,
    received: Mutex<ReceivedBlocks>,
    missing_tx: mpsc::Sender<Height>,
    waiting_tx: mpsc::Sender<Height>,
    inbound_tx: mpsc::Sender<BlockState>,
}

/// Catch-up engine for directory blocks.
///
/// Detects which heights the node is missing, requests them from peers,
/// buffers out-of-order responses, and hands blocks to the applier in
/// strictly ascending, contiguous order via
/// [`try_apply_next`](Self::try_apply_next).
///
/// # Usage
///
/// ```rust,ignore
/// let engine = CatchupEngine::new(CatchupConfig::default(), heights, transport);
/// let payload_tx = engine.payload_sender();   // wire to the network inbox
/// engine.start()?;
///
/// // Applier loop:
/// while let Some(state) = engine.try_apply_next() {
///     store.apply(state.into_block())?;
/// }
///
/// engine.shutdown().await;
/// ```
pub struct CatchupEngine {
    inner: Arc<EngineInner>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    receivers: Mutex<Option<MailboxReceivers>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl CatchupEngine {
    /// Create an engine over the host's height reads and request transport.
    ///
    /// The engine is inert until [`start`](Self::start); before that, the
    /// per-cycle methods can drive it by hand.
    pub fn new(
        config: CatchupConfig,
        heights: Arc<dyn ChainHeights>,
        transport: Arc<dyn RequestSender>,
    ) -> Self {
        let capacity = config.channel_capacity.max(1);
        let (missing_tx, missing_rx) = mpsc::channel(capacity);
        let (waiting_tx, waiting_rx) = mpsc::channel(capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            inner: Arc::new(EngineInner {
                config,
                heights,
                transport,
                missing: Mutex::new(MissingBlocks::new()),
                waiting: Mutex::new(WaitingBlocks::new()),
                received: Mutex::new(ReceivedBlocks::new()),
                missing_tx,
                waiting_tx,
                inbound_tx,
            }),
            shutdown_tx,
            shutdown_rx,
            receivers: Mutex::new(Some(MailboxReceivers {
                missing_rx,
                waiting_rx,
                inbound_rx,
            })),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Sender for inbound block payloads.
    ///
    /// The host pushes every block state received from peers here; the
    /// mailbox routes them into the received set. Payloads that arrive
    /// after shutdown are discarded when the channel closes.
    pub fn payload_sender(&self) -> mpsc::Sender<BlockState> {
        self.inner.inbound_tx.clone()
    }

    /// Spawn the four background loops.
    pub fn start(&self) -> Result<()> {
        let receivers = self
            .receivers
            .lock()
            .take()
            .ok_or(CatchupError::AlreadyStarted)?;

        info!(
            request_limit = self.inner.config.request_limit,
            request_timeout_secs = self.inner.config.request_timeout_secs,
            "Starting catch-up engine"
        );

        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(run_scan_loop(
            self.inner.clone(),
            self.shutdown_rx.clone(),
        )));
        tasks.push(tokio::spawn(run_sweep_loop(
            self.inner.clone(),
            self.shutdown_rx.clone(),
        )));
        tasks.push(tokio::spawn(run_mailbox_loop(
            self.inner.clone(),
            receivers,
            self.shutdown_rx.clone(),
        )));
        tasks.push(tokio::spawn(run_dispatch_loop(
            self.inner.clone(),
            self.shutdown_rx.clone(),
        )));

        Ok(())
    }

    /// Signal all loops to stop and wait for them to finish.
    ///
    /// In-flight transport sends are abandoned; state stays in memory only,
    /// so a later restart rebuilds from the saved-height watermark.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        info!("Catch-up engine stopped");
    }

    /// Pop the next contiguous block for application, advancing the
    /// watermark. Returns `None` while the next height is still missing.
    pub fn try_apply_next(&self) -> Option<BlockState> {
        self.inner.received.lock().pop_next_contiguous()
    }

    /// The contiguous-delivery watermark.
    pub fn base(&self) -> Height {
        self.inner.received.lock().base()
    }

    /// Current counters.
    pub fn stats(&self) -> CatchupStats {
        let (received, base) = {
            let received = self.inner.received.lock();
            (received.len(), received.base())
        };
        CatchupStats {
            missing: self.inner.missing.lock().len(),
            waiting: self.inner.waiting.lock().len(),
            received,
            base,
        }
    }

    /// Ascending snapshot of the heights queued for request.
    pub fn missing_heights(&self) -> Vec<Height> {
        self.inner.missing.lock().snapshot()
    }

    /// Snapshot of the in-flight heights.
    pub fn waiting_heights(&self) -> Vec<Height> {
        self.inner.waiting.lock().snapshot()
    }

    /// Ascending snapshot of the buffered payload heights.
    pub fn received_heights(&self) -> Vec<Height> {
        self.inner.received.lock().heights()
    }

    /// Run one scan cycle.
    pub fn scan_once(&self) {
        self.inner.scan_once();
    }

    /// Run one timeout sweep.
    pub fn sweep_once(&self) {
        self.inner.sweep_once();
    }

    /// Run one dispatch cycle.
    pub async fn dispatch_once(&self) -> DispatchOutcome {
        self.inner.dispatch_once().await
    }

    /// Process every notification currently queued, returning how many were
    /// handled. Only usable before [`start`](Self::start) hands the
    /// channels to the mailbox loop; afterwards it returns 0.
    pub fn drain_mailbox(&self) -> usize {
        let mut guard = self.receivers.lock();
        let Some(receivers) = guard.as_mut() else {
            return 0;
        };

        let mut handled = 0;
        while let Ok(height) = receivers.missing_rx.try_recv() {
            self.inner.admit_missing(height);
            handled += 1;
        }
        while let Ok(height) = receivers.waiting_rx.try_recv() {
            self.inner.admit_waiting(height);
            handled += 1;
        }
        while let Ok(state) = receivers.inbound_rx.try_recv() {
            self.inner.accept_payload(state);
            handled += 1;
        }
        handled
    }
}

impl EngineInner {
    /// One scan cycle: advance the watermark, purge, and queue gaps plus
    /// the frontier up to the target ceiling.
    fn scan_once(&self) {
        let saved = self.heights.highest_saved();
        let ceiling = self.heights.target_ceiling();

        let base = {
            let mut received = self.received.lock();
            if received.base() < saved {
                received.set_base(saved);
            }
            received.base()
        };

        self.missing.lock().purge_through(base);
        self.waiting.lock().purge_through(base);

        // Holes between buffered payloads.
        let gaps = self.received.lock().gap_heights();
        for height in gaps {
            self.note_missing(height);
        }

        // The frontier: everything past the highest buffered payload, up to
        // (but not including) the ceiling.
        let frontier = self.received.lock().highest_received().saturating_add(1);
        for height in frontier..ceiling {
            self.note_missing(height);
        }

        let missing = self.missing.lock().len();
        let waiting = self.waiting.lock().len();
        trace!(base, ceiling, missing, waiting, "Scan cycle complete");
    }

    /// One sweep cycle: requeue every request older than the timeout.
    ///
    /// Each height is removed from the waiting set before it is announced
    /// as missing again; in the other order the mailbox would still see it
    /// in flight and refuse the requeue.
    fn sweep_once(&self) {
        let expired = self
            .waiting
            .lock()
            .expired(self.config.request_timeout());
        for height in expired {
            self.waiting.lock().remove(height);
            debug!(height, "Block request timed out; requeueing");
            self.note_missing(height);
        }
    }

    /// One dispatch cycle.
    async fn dispatch_once(&self) -> DispatchOutcome {
        if self.waiting.lock().len() >= self.config.request_limit {
            return DispatchOutcome::Throttled;
        }

        let Some(height) = self.missing.lock().pop_next() else {
            return DispatchOutcome::Idle;
        };

        if self.waiting.lock().contains(height) {
            // The mailbox admission check makes this unreachable; if it
            // happens anyway, dropping the height is safe because the scan
            // loop rediscovers anything not in flight.
            debug_assert!(false, "popped height {height} already in flight");
            warn!(height, "Height already in flight; dropping from queue");
            return DispatchOutcome::Idle;
        }

        let request = BlockRequest::single(height);
        match self.transport.send_block_request(request).await {
            Ok(()) => {
                trace!(height, "Requested block");
                if self.waiting_tx.try_send(height).is_err() {
                    // The height is now in neither set; the scan loop will
                    // requeue it.
                    debug!(height, "Waiting notification dropped; will rescan");
                }
                DispatchOutcome::Requested(height)
            }
            Err(e) => {
                // Treated as never sent: the height stays out of the
                // waiting set and the next scan cycle requeues it.
                warn!(height, error = %e, "Block request failed");
                DispatchOutcome::Idle
            }
        }
    }

    /// Queue a height onto the missing notification channel.
    ///
    /// Drops on a full channel: every producer is periodic, so the height
    /// is re-emitted on a later cycle.
    fn note_missing(&self, height: Height) {
        if self.missing_tx.try_send(height).is_err() {
            trace!(height, "Missing notification dropped (channel full)");
        }
    }

    /// Admission for missing-height notifications: drop anything already
    /// applied, buffered, or in flight.
    fn admit_missing(&self, height: Height) {
        {
            let received = self.received.lock();
            if height <= received.base() {
                trace!(height, "Not queueing; at or below the applied watermark");
                return;
            }
            if received.get(height).is_some() {
                trace!(height, "Not queueing; payload already received");
                return;
            }
        }
        if self.waiting.lock().contains(height) {
            trace!(height, "Not queueing; request in flight");
            return;
        }
        self.missing.lock().add(height);
    }

    /// Admission for dispatched-height notifications.
    fn admit_waiting(&self, height: Height) {
        let mut waiting = self.waiting.lock();
        if !waiting.contains(height) {
            waiting.add(height);
        }
    }

    /// Route an inbound payload: the height is no longer in flight, and the
    /// payload is buffered unless stale or duplicate.
    fn accept_payload(&self, state: BlockState) {
        let height = state.height();
        self.waiting.lock().remove(height);
        if self.received.lock().add(height, state) {
            debug!(height, "Buffered received block");
        } else {
            trace!(height, "Dropped stale or duplicate block payload");
        }
    }
}

/// Periodic scan loop.
async fn run_scan_loop(inner: Arc<EngineInner>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(inner.config.scan_period());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => inner.scan_once(),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Periodic timeout sweep loop.
async fn run_sweep_loop(inner: Arc<EngineInner>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(inner.config.sweep_period());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => inner.sweep_once(),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Event-driven mailbox loop: the single admission point for all three
/// notification channels.
async fn run_mailbox_loop(
    inner: Arc<EngineInner>,
    receivers: MailboxReceivers,
    mut shutdown: watch::Receiver<bool>,
) {
    let MailboxReceivers {
        mut missing_rx,
        mut waiting_rx,
        mut inbound_rx,
    } = receivers;

    loop {
        tokio::select! {
            Some(height) = missing_rx.recv() => inner.admit_missing(height),
            Some(height) = waiting_rx.recv() => inner.admit_waiting(height),
            Some(state) = inbound_rx.recv() => inner.accept_payload(state),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            else => break,
        }
    }
}

/// Dispatch loop: request the lowest missing height whenever the in-flight
/// cap allows.
async fn run_dispatch_loop(inner: Arc<EngineInner>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let pause = match inner.dispatch_once().await {
            DispatchOutcome::Requested(_) => None,
            DispatchOutcome::Idle => Some(inner.config.dispatch_idle()),
            DispatchOutcome::Throttled => Some(inner.config.dispatch_backoff()),
        };

        if let Some(pause) = pause {
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}
