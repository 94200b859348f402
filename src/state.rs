//! Generic scene state machine.
//!
//! States are vignette-specific enums; the transition discipline is shared:
//! a request whose target is the current state, or one the current state does
//! not permit, is silently dropped, and elapsed-time phases advance on their
//! scheduled time rather than on the tick that noticed them.

use std::fmt::Debug;

/// An enumerated scene state.
pub trait SceneState: Copy + Eq + Debug + 'static {
    /// Whether a transition from `self` to `target` is allowed.
    ///
    /// Requests for disallowed transitions are dropped without error.
    fn permits(self, _target: Self) -> bool {
        true
    }
}

/// What caused a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// A user control.
    Control,
    /// A timed phase ran out.
    Elapsed,
    /// A deferred callback or tween completion.
    Deferred,
    /// Requested by the vignette from its own frame logic.
    Internal,
}

/// A state change that has been applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateChange<S> {
    pub from: S,
    pub to: S,
    /// Scene time the new state is considered to have started.
    pub at: f32,
    pub trigger: Trigger,
}

/// Timed loop of phases: each state lasts a fixed time, then the next begins.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseCycle<S> {
    phases: Vec<(S, f32)>,
}

impl<S: SceneState> PhaseCycle<S> {
    /// Phases in order; the last one loops back to the first.
    pub fn new(phases: impl IntoIterator<Item = (S, f32)>) -> Self {
        Self {
            phases: phases.into_iter().collect(),
        }
    }

    pub fn duration_of(&self, state: S) -> Option<f32> {
        self.phases
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, d)| *d)
    }

    pub fn next_after(&self, state: S) -> Option<S> {
        let index = self.phases.iter().position(|(s, _)| *s == state)?;
        let next = (index + 1) % self.phases.len();
        Some(self.phases[next].0)
    }

    /// Length of one full loop.
    pub fn period(&self) -> f32 {
        self.phases.iter().map(|(_, d)| d).sum()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

/// Holds the single active state of a scene.
#[derive(Clone, Debug)]
pub struct StateMachine<S> {
    current: S,
    entered_at: f32,
    cycle: Option<PhaseCycle<S>>,
    transitions: u64,
}

impl<S: SceneState> StateMachine<S> {
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            entered_at: 0.0,
            cycle: None,
            transitions: 0,
        }
    }

    pub fn with_cycle(mut self, cycle: PhaseCycle<S>) -> Self {
        self.set_cycle(Some(cycle));
        self
    }

    pub fn set_cycle(&mut self, cycle: Option<PhaseCycle<S>>) {
        self.cycle = cycle.filter(|c| !c.is_empty());
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn is(&self, state: S) -> bool {
        self.current == state
    }

    pub fn entered_at(&self) -> f32 {
        self.entered_at
    }

    /// Seconds spent in the current state as of `now`.
    pub fn elapsed(&self, now: f32) -> f32 {
        (now - self.entered_at).max(0.0)
    }

    /// Number of transitions applied so far.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Move to `target` at time `now`.
    ///
    /// Returns `None` when the target is already current or not permitted.
    pub fn request(&mut self, target: S, now: f32, trigger: Trigger) -> Option<StateChange<S>> {
        if target == self.current || !self.current.permits(target) {
            return None;
        }
        Some(self.apply(target, now, trigger))
    }

    /// Apply the next elapsed-time phase change due at or before `now`.
    ///
    /// The new phase starts at its scheduled time, not at `now`, so ticks that
    /// overshoot a boundary do not accumulate drift. Call repeatedly to catch
    /// up after a long step.
    pub fn poll(&mut self, now: f32) -> Option<StateChange<S>> {
        let cycle = self.cycle.as_ref()?;
        let duration = cycle.duration_of(self.current)?;
        let due = self.entered_at + duration;
        if now < due {
            return None;
        }
        let next = cycle.next_after(self.current)?;
        if next == self.current {
            self.entered_at = due;
            return None;
        }
        Some(self.apply(next, due, Trigger::Elapsed))
    }

    fn apply(&mut self, target: S, at: f32, trigger: Trigger) -> StateChange<S> {
        let transition = StateChange {
            from: self.current,
            to: target,
            at,
            trigger,
        };
        self.current = target;
        self.entered_at = at;
        self.transitions += 1;
        transition
    }
}
