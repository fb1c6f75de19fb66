//! Asynchronous upload dispatch.
//!
//! Uploads are fire-and-forget from the controller's point of view, but
//! the network layer may be slow; dispatching from the sampling loop would
//! stall the cadence. A worker thread owns the `Uploader`, fed over a
//! bounded channel; completion results come back as events the runner
//! drains and logs. Outcomes never gate state transitions.
//!
//! Safety: each dispatcher spawns exactly one thread that is shut down
//! when the dispatcher is dropped.

use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use scale_traits::Uploader;

#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Sent { tag: String, weight: f64 },
    Failed { tag: String, error: String },
}

struct Job {
    tag: String,
    weight: f64,
}

pub struct UploadDispatcher {
    tx: xch::Sender<Job>,
    events: xch::Receiver<UploadEvent>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl UploadDispatcher {
    pub fn spawn<U: Uploader + Send + 'static>(mut uploader: U) -> Self {
        let (tx, rx) = xch::bounded::<Job>(4);
        let (ev_tx, events) = xch::bounded::<UploadEvent>(8);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("upload worker received shutdown signal");
                    break;
                }
                match rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(job) => {
                        let ev = match uploader.send(&job.tag, job.weight) {
                            Ok(()) => UploadEvent::Sent {
                                tag: job.tag,
                                weight: job.weight,
                            },
                            Err(e) => UploadEvent::Failed {
                                tag: job.tag,
                                error: e.to_string(),
                            },
                        };
                        // If the event queue is full the oldest outcome is
                        // the least interesting; drop the new one instead
                        // of blocking.
                        let _ = ev_tx.try_send(ev);
                    }
                    Err(xch::RecvTimeoutError::Timeout) => continue,
                    Err(xch::RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::trace!("upload worker exiting");
        });

        Self {
            tx,
            events,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Queue an upload without blocking; a full queue drops the request
    /// (the uploader is fire-and-forget and the core never retries).
    pub fn dispatch(&self, tag: String, weight: f64) {
        if self.tx.try_send(Job { tag, weight }).is_err() {
            tracing::warn!("upload queue full, dropping request");
        }
    }

    /// Completed upload outcomes since the last drain.
    pub fn drain_events(&self) -> Vec<UploadEvent> {
        self.events.try_iter().collect()
    }
}

impl Drop for UploadDispatcher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("upload worker panicked during shutdown");
        }
    }
}
