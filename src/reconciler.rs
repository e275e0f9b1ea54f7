//! Selection-change reconciliation.
//!
//! Decides what a host selection-change notification should cause:
//! - a scan, when nothing else is going on
//! - nothing, when the change was caused by our own `selectNodes` command
//!   and the suppression window is still open
//! - a single follow-up scan, when a scan is already in flight
//!   (last request wins)
//!
//! Suppression is an expiring token rather than a flag: arming it returns a
//! [`SuppressionToken`] whose deadline the caller schedules, and releasing a
//! stale token is a no-op. If the host reports the change after the window
//! closes, the result is one redundant scan, which is accepted.

use tokio::time::{Duration, Instant};
use tracing::{debug, trace};

/// Default time the host is given to report our own selection change
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(500);

/// Observable state of the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    Idle,
    ScanInFlight,
    SuppressingOwnSelection,
}

/// What to do about a selection-change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionDecision {
    /// Start a scan now
    Scan,
    /// Caused by our own reselection; ignore
    Suppressed,
    /// A scan is running; one more will follow it
    Coalesced,
}

/// Handle to one armed suppression window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuppressionToken {
    generation: u64,
    deadline: Instant,
}

impl SuppressionToken {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Selection-change state machine
#[derive(Debug)]
pub struct SelectionReconciler {
    window: Duration,
    suppression: Option<SuppressionToken>,
    generation: u64,
    scanning: bool,
    pending_rescan: bool,
    suppressed_total: u64,
}

impl SelectionReconciler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            suppression: None,
            generation: 0,
            scanning: false,
            pending_rescan: false,
            suppressed_total: 0,
        }
    }

    pub fn state(&self) -> ReconcilerState {
        if self.suppression.is_some() {
            ReconcilerState::SuppressingOwnSelection
        } else if self.scanning {
            ReconcilerState::ScanInFlight
        } else {
            ReconcilerState::Idle
        }
    }

    /// Classify a host selection-change notification received at `now`
    pub fn on_selection_changed(&mut self, now: Instant) -> SelectionDecision {
        self.expire_if_due(now);

        if self.suppression.is_some() {
            self.suppressed_total += 1;
            debug!("Ignoring selection change caused by own reselection");
            return SelectionDecision::Suppressed;
        }

        if self.scanning {
            trace!("Scan in flight, coalescing selection change");
            self.pending_rescan = true;
            return SelectionDecision::Coalesced;
        }

        SelectionDecision::Scan
    }

    /// Mark a scan as started; `false` if one is already running, in which
    /// case a follow-up is queued instead
    pub fn begin_scan(&mut self) -> bool {
        if self.scanning {
            self.pending_rescan = true;
            return false;
        }
        self.scanning = true;
        true
    }

    /// Mark the running scan as finished; `true` if another should follow
    pub fn finish_scan(&mut self) -> bool {
        self.scanning = false;
        std::mem::take(&mut self.pending_rescan)
    }

    /// Open a suppression window before changing the host selection
    pub fn arm_suppression(&mut self, now: Instant) -> SuppressionToken {
        self.generation += 1;
        let token = SuppressionToken {
            generation: self.generation,
            deadline: now + self.window,
        };
        self.suppression = Some(token);
        trace!("Suppression armed until {:?}", token.deadline);
        token
    }

    /// Close the window opened by `token`, unless a newer one replaced it
    pub fn release(&mut self, token: SuppressionToken) {
        if self.suppression.map(|current| current.generation) == Some(token.generation) {
            self.suppression = None;
            trace!("Suppression released");
        }
    }

    /// The open suppression window, if any
    pub fn active_suppression(&self) -> Option<SuppressionToken> {
        self.suppression
    }

    /// Notifications swallowed so far
    pub fn suppressed_total(&self) -> u64 {
        self.suppressed_total
    }

    fn expire_if_due(&mut self, now: Instant) {
        if let Some(token) = self.suppression {
            if now >= token.deadline {
                self.suppression = None;
            }
        }
    }
}

impl Default for SelectionReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION_WINDOW)
    }
}
