//! Cooperative sampling loop.
//!
//! One logical thread of control: read the front-end, convert, feed the
//! stability buffer, tick the session controller, execute its effect
//! requests, then sleep to the configured cadence. Nothing in the loop
//! blocks past its bound; acquisition timeouts skip the tick with all
//! state unchanged. Uploads run on the dispatcher's worker thread so a
//! slow network never stalls the cadence.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel as xch;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, ScaleError};
use crate::scale::Scale;
use crate::session::{Effect, SessionCfg, SessionController};
use crate::stability::StabilityBuffer;
use crate::uplink::{UploadDispatcher, UploadEvent};
use scale_traits::{Clock, FrontEnd, LineDisplay, TagReader};

/// Manual control surface accepted in any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Re-tare and reset the session machine.
    Retare,
    Shutdown,
}

/// Cloneable handle for feeding commands into a running station.
#[derive(Clone)]
pub struct StationHandle {
    tx: xch::Sender<Command>,
}

impl StationHandle {
    pub fn send(&self, cmd: Command) {
        if self.tx.try_send(cmd).is_err() {
            warn!(?cmd, "command channel full, dropping");
        }
    }
}

pub struct Station<F: FrontEnd> {
    scale: Scale<F>,
    buffer: StabilityBuffer,
    controller: SessionController,
    display: Box<dyn LineDisplay + Send>,
    reader: Box<dyn TagReader + Send>,
    uplink: UploadDispatcher,
    clock: Arc<dyn Clock + Send + Sync>,
    tick: Duration,
    cmd_rx: xch::Receiver<Command>,
}

impl<F: FrontEnd> Station<F> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scale: Scale<F>,
        buffer_capacity: usize,
        session_cfg: SessionCfg,
        display: Box<dyn LineDisplay + Send>,
        reader: Box<dyn TagReader + Send>,
        uplink: UploadDispatcher,
        clock: Arc<dyn Clock + Send + Sync>,
        tick: Duration,
    ) -> (Self, StationHandle) {
        let (tx, cmd_rx) = xch::bounded(8);
        (
            Self {
                scale,
                buffer: StabilityBuffer::new(buffer_capacity),
                controller: SessionController::new(session_cfg),
                display,
                reader,
                uplink,
                clock,
                tick,
                cmd_rx,
            },
            StationHandle { tx },
        )
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn scale(&self) -> &Scale<F> {
        &self.scale
    }

    /// Startup sequence: banner, initial tare, display clear. A failed
    /// tare is surfaced but never fatal; the station runs with the
    /// best-effort offset.
    pub fn startup(&mut self) -> Result<()> {
        self.show(0, "Weighing station starting");
        self.show(1, "Zeroing scale...");
        if let Err(e) = self.scale.tare() {
            warn!(error = %e, "initial tare incomplete");
            self.show(1, "Zeroing incomplete");
        }
        if let Err(e) = self.display.clear() {
            warn!(error = %e, "display clear failed");
        }
        Ok(())
    }

    /// Run the loop until shutdown, or for `max_ticks` when bounded (used
    /// by scripted runs and tests).
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<()> {
        let epoch = self.clock.now();
        let mut ticks: u64 = 0;
        info!(tick_ms = self.tick.as_millis() as u64, "session loop started");

        loop {
            let mut shutdown = false;
            let pending: Vec<Command> = self.cmd_rx.try_iter().collect();
            for cmd in pending {
                match cmd {
                    Command::Shutdown => shutdown = true,
                    Command::Retare => self.retare(),
                }
            }
            if shutdown {
                info!("shutdown requested");
                break;
            }

            match self.scale.read_raw() {
                Ok(raw) => {
                    let weight = self.scale.weight_from_raw(raw);
                    trace!(
                        raw,
                        weight,
                        zero = self.scale.calibration().zero_counts(),
                        "sample"
                    );
                    self.buffer.push(weight);
                    let tag = self.poll_tag();
                    let now = self.clock.ms_since(epoch);
                    let effects = self.controller.tick(weight, self.buffer.stats(), tag, now);
                    self.execute(effects);
                }
                // No new sample this tick; prior state stays untouched.
                Err(ScaleError::Timeout) => trace!("acquisition timeout, skipping tick"),
                Err(e) => warn!(error = %e, "front-end read failed, skipping tick"),
            }

            for ev in self.uplink.drain_events() {
                match ev {
                    UploadEvent::Sent { tag, weight } => {
                        info!(tag = %tag, weight, "upload confirmed");
                    }
                    UploadEvent::Failed { tag, error } => {
                        // Fire-and-forget: log and move on, the machine
                        // already advanced on removal.
                        warn!(tag = %tag, error = %error, "upload failed");
                    }
                }
            }

            ticks += 1;
            if let Some(max) = max_ticks
                && ticks >= max
            {
                debug!(ticks, "tick budget exhausted");
                break;
            }
            self.clock.sleep(self.tick);
        }
        Ok(())
    }

    fn retare(&mut self) {
        info!("manual re-tare requested");
        if let Err(e) = self.scale.tare() {
            warn!(error = %e, "re-tare incomplete");
        }
        let effects = self.controller.reset();
        self.execute(effects);
    }

    fn poll_tag(&mut self) -> Option<String> {
        if !self.controller.wants_tag() {
            return None;
        }
        match self.reader.poll() {
            Ok(tag) => tag,
            Err(e) => {
                warn!(error = %e, "tag reader poll failed");
                None
            }
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ShowWeight(w) => self.show(0, &format!("Weight:{w:10.3}")),
                Effect::ShowWeighing => self.show(1, "Weighing..."),
                Effect::ShowStable(w) => self.show(0, &format!("Stable:{w:10.3}")),
                Effect::PromptIdentity => self.show(1, "Scan tag to send"),
                Effect::Upload { tag, weight } => self.uplink.dispatch(tag, weight),
                Effect::ClearDisplay => {
                    if let Err(e) = self.display.clear() {
                        warn!(error = %e, "display clear failed");
                    }
                }
                Effect::ClearBuffer => self.buffer.clear(),
            }
        }
    }

    /// Display failures are logged, never propagated; a dead display must
    /// not halt weighing.
    fn show(&mut self, row: u8, text: &str) {
        if let Err(e) = self.display.show_line(row, text) {
            warn!(error = %e, row, "display write failed");
        }
    }
}
