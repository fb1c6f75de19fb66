//! Session state machine over the live weight stream.
//!
//! The controller is ticked once per sampling cadence with the latest
//! weight, the rolling buffer statistics, an optional freshly-polled tag,
//! and the monotonic time. It owns the session state and its timers and
//! returns a list of effect requests; a thin executor in the runner
//! performs them, so the machine is testable without any hardware.

use tracing::{debug, info, warn};

use crate::stability::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing on the scale.
    Idle,
    /// Load present, waiting for the stream to settle.
    Weighing,
    /// Weight captured, waiting for an identity tag.
    AwaitingIdentity,
    /// Upload requested, waiting for the load to be removed.
    AwaitingRemoval,
}

/// Side-effect requests emitted by a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Show the live weight (already display-zero clamped).
    ShowWeight(f64),
    /// Show "weighing in progress".
    ShowWeighing,
    /// Show the captured stable weight.
    ShowStable(f64),
    /// Ask the operator to scan an identity tag.
    PromptIdentity,
    /// Fire-and-forget upload of a finished weighing.
    Upload { tag: String, weight: f64 },
    ClearDisplay,
    /// Reset the rolling stability buffer.
    ClearBuffer,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionCfg {
    /// Minimum |weight| considered "something is on the scale".
    pub presence_threshold: f64,
    /// |weight| range considered "nothing is on the scale".
    pub zero_band: f64,
    /// Stddev threshold below which the stream counts as settling.
    pub stable_stddev: f64,
    /// The stddev must hold below threshold this long before capture.
    pub stable_min_ms: u64,
    /// Forward-progress fallback: force capture after this long with a
    /// load present but never settling.
    pub weighing_timeout_ms: u64,
    /// Abandoned session: no tag scanned and weight in the zero band for
    /// this long.
    pub no_id_zero_timeout_ms: u64,
    /// Displayed magnitudes below this are forced to exactly zero so the
    /// operator never sees "-0.00".
    pub display_zero_clamp: f64,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            presence_threshold: 0.05,
            zero_band: 0.03,
            stable_stddev: 0.03,
            stable_min_ms: 1500,
            weighing_timeout_ms: 15_000,
            no_id_zero_timeout_ms: 10_000,
            display_zero_clamp: 0.002,
        }
    }
}

pub struct SessionController {
    cfg: SessionCfg,
    state: SessionState,
    /// Captured once on settle (or forced capture); valid in
    /// AwaitingIdentity / AwaitingRemoval.
    stable_weight: Option<f64>,
    weighing_started_at: Option<u64>,
    stable_since: Option<u64>,
    zero_since: Option<u64>,
}

impl SessionController {
    pub fn new(cfg: SessionCfg) -> Self {
        Self {
            cfg,
            state: SessionState::Idle,
            stable_weight: None,
            weighing_started_at: None,
            stable_since: None,
            zero_since: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stable_weight(&self) -> Option<f64> {
        self.stable_weight
    }

    /// The runner polls the tag reader only while a scan is awaited.
    pub fn wants_tag(&self) -> bool {
        self.state == SessionState::AwaitingIdentity
    }

    /// External re-tare: reset to Idle and drop every timer, whatever the
    /// current state. The caller performs the tare itself and clears the
    /// buffer via the returned effects.
    pub fn reset(&mut self) -> Vec<Effect> {
        info!(state = ?self.state, "session reset (re-tare)");
        self.state = SessionState::Idle;
        self.stable_weight = None;
        self.weighing_started_at = None;
        self.stable_since = None;
        self.zero_since = None;
        vec![Effect::ClearBuffer, Effect::ClearDisplay]
    }

    /// Advance the machine by one sampling tick.
    pub fn tick(
        &mut self,
        weight: f64,
        stats: Stats,
        tag: Option<String>,
        now_ms: u64,
    ) -> Vec<Effect> {
        match self.state {
            SessionState::Idle => self.tick_idle(weight, now_ms),
            SessionState::Weighing => self.tick_weighing(weight, stats, now_ms),
            SessionState::AwaitingIdentity => self.tick_awaiting_identity(weight, tag, now_ms),
            SessionState::AwaitingRemoval => self.tick_awaiting_removal(weight, now_ms),
        }
    }

    fn tick_idle(&mut self, weight: f64, now_ms: u64) -> Vec<Effect> {
        if weight.abs() > self.cfg.presence_threshold {
            debug!(weight, "load detected");
            return self.enter_weighing(now_ms);
        }
        vec![Effect::ShowWeight(self.clamp_display(weight))]
    }

    fn enter_weighing(&mut self, now_ms: u64) -> Vec<Effect> {
        self.state = SessionState::Weighing;
        self.weighing_started_at = Some(now_ms);
        self.stable_since = None;
        self.zero_since = None;
        self.stable_weight = None;
        vec![Effect::ClearBuffer, Effect::ShowWeighing]
    }

    fn tick_weighing(&mut self, weight: f64, stats: Stats, now_ms: u64) -> Vec<Effect> {
        // Object removed before settling.
        if weight.abs() < self.cfg.presence_threshold {
            debug!(weight, "load removed before settling");
            self.state = SessionState::Idle;
            self.weighing_started_at = None;
            self.stable_since = None;
            return vec![Effect::ShowWeight(self.clamp_display(weight))];
        }

        if stats.stddev < self.cfg.stable_stddev {
            let since = *self.stable_since.get_or_insert(now_ms);
            if now_ms.saturating_sub(since) >= self.cfg.stable_min_ms {
                return self.capture(stats.mean, "settled");
            }
        } else {
            // Any excursion above threshold restarts the settle clock.
            self.stable_since = None;
        }

        // Forward-progress fallback for persistently noisy readings.
        if let Some(started) = self.weighing_started_at
            && now_ms.saturating_sub(started) >= self.cfg.weighing_timeout_ms
        {
            warn!(
                stddev = stats.stddev,
                mean = stats.mean,
                "weighing timeout, capturing noisy mean"
            );
            return self.capture(stats.mean, "forced");
        }

        vec![Effect::ShowWeight(self.clamp_display(weight))]
    }

    fn capture(&mut self, mean: f64, how: &'static str) -> Vec<Effect> {
        info!(weight = mean, how, "stable weight captured");
        self.state = SessionState::AwaitingIdentity;
        self.stable_weight = Some(mean);
        self.weighing_started_at = None;
        self.stable_since = None;
        self.zero_since = None;
        vec![
            Effect::ShowStable(self.clamp_display(mean)),
            Effect::PromptIdentity,
        ]
    }

    fn tick_awaiting_identity(
        &mut self,
        weight: f64,
        tag: Option<String>,
        now_ms: u64,
    ) -> Vec<Effect> {
        let stable = self.stable_weight.unwrap_or(0.0);

        // Removal check first: a drop into the zero band is the load being
        // taken away, not a new object.
        if weight.abs() < self.cfg.zero_band {
            let since = *self.zero_since.get_or_insert(now_ms);
            if now_ms.saturating_sub(since) >= self.cfg.no_id_zero_timeout_ms {
                info!("no tag scanned and load removed, abandoning session");
                self.state = SessionState::Idle;
                self.stable_weight = None;
                self.zero_since = None;
                return vec![Effect::ClearDisplay];
            }
            return vec![Effect::ShowStable(self.clamp_display(stable))];
        }
        self.zero_since = None;

        // A deviation beyond the presence threshold means a new object;
        // restart the full settle cycle.
        if (weight - stable).abs() > self.cfg.presence_threshold {
            debug!(weight, stable, "weight deviates from captured value, re-weighing");
            return self.enter_weighing(now_ms);
        }

        if let Some(tag) = tag.filter(|t| !t.is_empty()) {
            info!(tag = %tag, weight = stable, "tag scanned, requesting upload");
            self.state = SessionState::AwaitingRemoval;
            self.zero_since = None;
            return vec![
                Effect::Upload {
                    tag,
                    weight: stable,
                },
                Effect::ShowStable(self.clamp_display(stable)),
            ];
        }

        vec![
            Effect::ShowStable(self.clamp_display(stable)),
            Effect::PromptIdentity,
        ]
    }

    fn tick_awaiting_removal(&mut self, weight: f64, now_ms: u64) -> Vec<Effect> {
        let stable = self.stable_weight.unwrap_or(0.0);

        if weight.abs() < self.cfg.zero_band {
            debug!("load removed, session complete");
            self.state = SessionState::Idle;
            self.stable_weight = None;
            self.zero_since = None;
            return vec![Effect::ClearBuffer, Effect::ClearDisplay];
        }

        // Same re-weighing interrupt as AwaitingIdentity.
        if (weight - stable).abs() > self.cfg.presence_threshold {
            debug!(weight, stable, "new load before removal, re-weighing");
            return self.enter_weighing(now_ms);
        }

        vec![Effect::ShowStable(self.clamp_display(stable))]
    }

    /// Force near-zero magnitudes to exactly zero for display.
    fn clamp_display(&self, weight: f64) -> f64 {
        if weight.abs() < self.cfg.display_zero_clamp {
            0.0
        } else {
            weight
        }
    }
}
