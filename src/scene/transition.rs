//! Navigation transitions and the easing curves shared with tweens.

use crate::render::{Color, Overlay};

use super::SceneId;

/// Easing functions for transitions and tweens.
///
/// These control the acceleration curve of an animation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed throughout.
    #[default]
    Linear,
    /// Start slow, accelerate.
    EaseIn,
    /// Start fast, decelerate.
    EaseOut,
    /// Start slow, speed up, then slow down.
    EaseInOut,
    /// Cubic variant of `EaseInOut` with a flatter start and end.
    InOutCubic,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Type of navigation effect between verses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionKind {
    /// Instant switch, no visual transition.
    Instant,
    /// Fade to a solid color, swap scenes, then fade back in.
    FadeToColor { color: Color },
}

/// Configuration for a verse switch.
///
/// # Example
///
/// ```
/// use vignette::{Easing, Transition};
///
/// let fade = Transition::fade_to_black(0.5).easing(Easing::Linear);
/// assert_eq!(fade.duration, 0.5);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub kind: TransitionKind,
    /// Total duration in seconds, half out and half in.
    pub duration: f32,
    pub easing: Easing,
}

impl Default for Transition {
    fn default() -> Self {
        Self::instant()
    }
}

impl Transition {
    pub fn instant() -> Self {
        Self {
            kind: TransitionKind::Instant,
            duration: 0.0,
            easing: Easing::Linear,
        }
    }

    pub fn fade_to_black(duration: f32) -> Self {
        Self::fade_to_color(Color::BLACK, duration)
    }

    pub fn fade_to_white(duration: f32) -> Self {
        Self::fade_to_color(Color::WHITE, duration)
    }

    pub fn fade_to_color(color: Color, duration: f32) -> Self {
        if duration <= 0.0 {
            return Self::instant();
        }
        Self {
            kind: TransitionKind::FadeToColor { color },
            duration,
            easing: Easing::EaseInOut,
        }
    }

    /// Fade to black for `duration`, or switch instantly when it is zero.
    pub fn from_fade_duration(duration: f32) -> Self {
        Self::fade_to_black(duration)
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// Phase of an active transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionPhase {
    /// Fading out the old scene (progress 0.0 = start, 1.0 = fully faded).
    FadingOut,
    /// Fully covered; the outgoing scene is disposed and the incoming one
    /// initialised here.
    Midpoint,
    /// Fading in the new scene (progress 0.0 = start, 1.0 = fully visible).
    FadingIn,
}

/// A transition in flight.
#[derive(Debug)]
pub struct ActiveTransition {
    pub transition: Transition,
    pub phase: TransitionPhase,
    /// Eased progress within the current phase.
    pub progress: f32,
    elapsed: f32,
    pub target: SceneId,
}

impl ActiveTransition {
    pub fn new(transition: Transition, target: SceneId) -> Self {
        let phase = match transition.kind {
            TransitionKind::Instant => TransitionPhase::Midpoint,
            TransitionKind::FadeToColor { .. } => TransitionPhase::FadingOut,
        };
        Self {
            transition,
            phase,
            progress: 0.0,
            elapsed: 0.0,
            target,
        }
    }

    /// Advance by `dt` seconds. Returns `true` when the transition is done.
    ///
    /// A fade stops at [`TransitionPhase::Midpoint`] until
    /// [`finish_midpoint`](Self::finish_midpoint) is called, so the host swaps
    /// scenes exactly once.
    pub fn advance(&mut self, dt: f32) -> bool {
        let half = self.transition.duration / 2.0;
        match self.phase {
            TransitionPhase::Midpoint => false,
            TransitionPhase::FadingOut => {
                self.elapsed += dt.max(0.0);
                let raw = fraction(self.elapsed, half);
                self.progress = self.transition.easing.apply(raw);
                if raw >= 1.0 {
                    self.phase = TransitionPhase::Midpoint;
                }
                false
            }
            TransitionPhase::FadingIn => {
                self.elapsed += dt.max(0.0);
                let raw = fraction(self.elapsed - half, half);
                self.progress = self.transition.easing.apply(raw);
                raw >= 1.0
            }
        }
    }

    /// Leave the midpoint after the swap. Returns `true` if nothing is left
    /// to animate.
    pub fn finish_midpoint(&mut self) -> bool {
        match self.transition.kind {
            TransitionKind::Instant => true,
            TransitionKind::FadeToColor { .. } => {
                self.phase = TransitionPhase::FadingIn;
                self.progress = 0.0;
                self.elapsed = self.transition.duration / 2.0;
                false
            }
        }
    }

    pub fn is_midpoint(&self) -> bool {
        self.phase == TransitionPhase::Midpoint
    }

    /// Overlay alpha for the current phase.
    pub fn overlay_alpha(&self) -> f32 {
        match self.phase {
            TransitionPhase::FadingOut => self.progress,
            TransitionPhase::Midpoint => 1.0,
            TransitionPhase::FadingIn => 1.0 - self.progress,
        }
    }

    pub fn overlay(&self) -> Option<Overlay> {
        match self.transition.kind {
            TransitionKind::Instant => None,
            TransitionKind::FadeToColor { color } => Some(Overlay {
                color,
                alpha: self.overlay_alpha(),
            }),
        }
    }
}

/// `elapsed / span` clamped to `[0, 1]`; an empty span is already done.
fn fraction(elapsed: f32, span: f32) -> f32 {
    if span > 0.0 {
        (elapsed / span).clamp(0.0, 1.0)
    } else {
        1.0
    }
}
