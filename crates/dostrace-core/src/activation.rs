//! Activation and process-depth state machine.
//!
//! Tracing is either [`ActivationState::Inactive`] or
//! [`ActivationState::Active`]. While active, every program load pushes the
//! nesting depth and every normal termination pops it; when the depth falls
//! to zero the top-level traced program has exited and tracing switches off.
//!
//! Terminate-and-stay-resident exits have no operation here on purpose: a
//! TSR is not a returning child process and must never pop the depth.

/// Whether trace lines are currently being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationState {
    /// Not logging.
    #[default]
    Inactive,
    /// Logging.
    Active,
}

/// Result of a normal program termination while active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminateOutcome {
    /// Depth after the decrement, before clamping. May be negative when a
    /// program that started before activation exits.
    pub remaining: i32,
    /// Whether this termination switched tracing off.
    pub deactivated: bool,
}

/// Activation state plus nested-process depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Activation {
    state: ActivationState,
    depth: i32,
}

impl Activation {
    /// Inactive with zero depth.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> ActivationState {
        self.state
    }

    /// Check if tracing is active.
    pub fn is_active(&self) -> bool {
        self.state == ActivationState::Active
    }

    /// Current nesting depth. Only meaningful while active.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Switch to active with zero depth.
    ///
    /// Returns true if this call performed the transition.
    pub fn activate(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.state = ActivationState::Active;
        self.depth = 0;
        true
    }

    /// Record a program load. Ignored while inactive.
    pub fn push_exec(&mut self) {
        if self.is_active() {
            self.depth += 1;
        }
    }

    /// Record a normal program termination.
    ///
    /// Returns `None` while inactive. When the depth reaches zero or below
    /// the state becomes inactive and the depth is clamped to zero.
    pub fn terminate(&mut self) -> Option<TerminateOutcome> {
        if !self.is_active() {
            return None;
        }
        self.depth -= 1;
        let remaining = self.depth;
        let deactivated = remaining <= 0;
        if deactivated {
            self.deactivate();
        }
        Some(TerminateOutcome {
            remaining,
            deactivated,
        })
    }

    /// Switch off unconditionally and clear the depth.
    pub fn deactivate(&mut self) {
        self.state = ActivationState::Inactive;
        self.depth = 0;
    }
}
