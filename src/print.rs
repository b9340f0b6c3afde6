//! Print job queue and dispatcher.
//!
//! UI "Print" actions enqueue a job; a single dispatcher task renders each
//! document to ESC/POS bytes and writes them to the connected printer's
//! channel. The queue is two-tier: high-priority jobs jump ahead of all
//! pending normal/low jobs, FIFO within a tier.
//!
//! Key design goals:
//! - **Single writer**: one dispatcher per queue, guarded by an explicit
//!   dispatching flag — never more than one in-flight write per printer.
//! - **Forward-only status**: `pending → printing → completed | failed`; a
//!   job leaves the queue the moment it leaves `pending`.
//! - **No retry**: a failed job emits `job-failed` and the dispatcher moves
//!   on; a single job's failure never aborts the queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PrinterConfig;
use crate::events::{EventBus, HardwareEvent};
use crate::receipt_renderer::{render, PrintPayload};
use crate::transport::ByteTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Receipt,
    Report,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Printing,
    Completed,
    Failed,
}

/// One queued print request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: String,
    pub kind: JobKind,
    pub payload: PrintPayload,
    pub priority: JobPriority,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl JobKind {
    fn of(payload: &PrintPayload) -> Self {
        match payload {
            PrintPayload::Receipt(_) => JobKind::Receipt,
            PrintPayload::Report(_) => JobKind::Report,
            PrintPayload::TestPage(_) => JobKind::Test,
        }
    }
}

/// The printer a queue writes to: shared channel handle plus its config.
#[derive(Clone)]
pub struct PrinterTarget {
    pub device_id: String,
    pub channel: Arc<Mutex<Box<dyn ByteTransport>>>,
    pub config: PrinterConfig,
}

struct QueueInner {
    pending: VecDeque<PrintJob>,
    dispatching: bool,
    target: Option<PrinterTarget>,
}

/// Priority-ordered, single-consumer print queue.
#[derive(Clone)]
pub struct PrintJobQueue {
    inner: Arc<Mutex<QueueInner>>,
    events: EventBus,
}

impl PrintJobQueue {
    pub fn new(events: EventBus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                pending: VecDeque::new(),
                dispatching: false,
                target: None,
            })),
            events,
        }
    }

    /// Bind the queue to a connected printer and wake the dispatcher for
    /// any jobs queued while disconnected.
    pub fn bind_printer(&self, target: PrinterTarget) {
        let mut inner = self.lock();
        info!(device = %target.device_id, "Print queue bound to printer");
        inner.target = Some(target);
        self.maybe_start_dispatcher(&mut inner);
    }

    /// Detach the printer. Pending jobs stay queued; the dispatcher stops
    /// on its next pass.
    pub fn unbind_printer(&self) {
        let mut inner = self.lock();
        if inner.target.take().is_some() {
            info!("Print queue unbound from printer");
        }
    }

    /// Queue a document for printing and return the job id.
    ///
    /// A `high` job is inserted behind the last queued `high` job, ahead of
    /// everything else; other priorities append to the back.
    pub fn enqueue(&self, payload: PrintPayload, priority: JobPriority) -> String {
        let job = PrintJob {
            id: Uuid::new_v4().to_string(),
            kind: JobKind::of(&payload),
            payload,
            priority,
            status: JobStatus::Pending,
            created_at: Utc::now(),
        };
        let id = job.id.clone();

        let mut inner = self.lock();
        if priority == JobPriority::High {
            let pos = inner
                .pending
                .iter()
                .take_while(|j| j.priority == JobPriority::High)
                .count();
            inner.pending.insert(pos, job);
        } else {
            inner.pending.push_back(job);
        }
        info!(job_id = %id, queued = inner.pending.len(), "Print job enqueued");
        self.maybe_start_dispatcher(&mut inner);
        id
    }

    /// Drop all pending jobs. A job already printing is not interrupted.
    pub fn clear_queue(&self) -> usize {
        let mut inner = self.lock();
        let removed = inner.pending.len();
        inner.pending.clear();
        if removed > 0 {
            info!(removed = removed, "Pending print jobs cleared");
        }
        removed
    }

    /// Snapshot of pending jobs in dispatch order.
    pub fn pending_jobs(&self) -> Vec<PrintJob> {
        self.lock().pending.iter().cloned().collect()
    }

    /// Whether the dispatcher task is currently running.
    pub fn is_dispatching(&self) -> bool {
        self.lock().dispatching
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start the dispatcher unless it is already running or there is no
    /// open printer to write to. Must be called with the lock held.
    fn maybe_start_dispatcher(&self, inner: &mut QueueInner) {
        if inner.dispatching || inner.pending.is_empty() {
            return;
        }
        let target_open = inner
            .target
            .as_ref()
            .map(|t| t.channel.lock().unwrap_or_else(|e| e.into_inner()).is_open())
            .unwrap_or(false);
        if !target_open {
            return;
        }
        inner.dispatching = true;
        let queue = self.clone();
        tokio::spawn(async move {
            queue.dispatch_loop().await;
        });
    }

    async fn dispatch_loop(self) {
        loop {
            // Pop under the lock; drop it before the blocking write.
            let (mut job, target) = {
                let mut inner = self.lock();
                let target = match inner.target.clone() {
                    Some(t) => t,
                    None => {
                        inner.dispatching = false;
                        info!("Dispatcher stopped — printer unbound");
                        return;
                    }
                };
                let open = target
                    .channel
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .is_open();
                if !open {
                    inner.dispatching = false;
                    info!("Dispatcher stopped — printer disconnected");
                    return;
                }
                match inner.pending.pop_front() {
                    Some(job) => (job, target),
                    None => {
                        inner.dispatching = false;
                        return;
                    }
                }
            };

            job.status = JobStatus::Printing;
            let bytes = render(&job.payload, &target.config);
            let result = target
                .channel
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .write(&bytes);

            match result {
                Ok(()) => {
                    job.status = JobStatus::Completed;
                    info!(job_id = %job.id, bytes = bytes.len(), "Print job completed");
                    self.events.emit(HardwareEvent::JobCompleted(job));
                }
                Err(e) => {
                    job.status = JobStatus::Failed;
                    warn!(job_id = %job.id, error = %e, "Print job failed");
                    self.events.emit(HardwareEvent::JobFailed {
                        job,
                        error: e.to_string(),
                    });
                }
            }

            // Let the printer's buffer drain before the next job.
            tokio::time::sleep(Duration::from_millis(target.config.inter_job_delay_ms)).await;
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
