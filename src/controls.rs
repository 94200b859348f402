//! Symmetric control registry.
//!
//! A scene registers buttons and sliders through [`ControlPanel::register`]
//! and gets back a [`ControlToken`]. The token cannot be cloned or built any
//! other way, and [`ControlPanel::unregister`] consumes it, so each
//! registration is matched by exactly one release. Every registration also
//! allocates a listener in the scene's [`ResourceLedger`].

use crate::resources::{ResourceId, ResourceLedger};
use crate::render::ResourceKind;
use crate::scene::Generation;

/// Widget kind.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlKind {
    Button {
        label: String,
    },
    Slider {
        label: String,
        min: f32,
        max: f32,
        step: f32,
        initial: f32,
    },
}

impl ControlKind {
    pub fn button(label: impl Into<String>) -> Self {
        ControlKind::Button {
            label: label.into(),
        }
    }

    pub fn slider(label: impl Into<String>, min: f32, max: f32, step: f32, initial: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        ControlKind::Slider {
            label: label.into(),
            min,
            max,
            step,
            initial: initial.clamp(min, max),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ControlKind::Button { label } | ControlKind::Slider { label, .. } => label,
        }
    }

    /// Clamp and snap a raw slider value. Buttons ignore the value.
    fn resolve(&self, raw: ControlValue) -> ControlValue {
        match (self, raw) {
            (ControlKind::Button { .. }, _) => ControlValue::Pressed,
            (
                ControlKind::Slider {
                    min, max, step, ..
                },
                ControlValue::Value(v),
            ) => ControlValue::Value(snap(v, *min, *max, *step)),
            (ControlKind::Slider { initial, .. }, ControlValue::Pressed) => {
                ControlValue::Value(*initial)
            }
        }
    }
}

fn snap(value: f32, min: f32, max: f32, step: f32) -> f32 {
    if !value.is_finite() {
        return min;
    }
    let value = value.clamp(min, max);
    if step > 0.0 {
        (min + ((value - min) / step).round() * step).clamp(min, max)
    } else {
        value
    }
}

/// What a control reports when triggered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlValue {
    Pressed,
    Value(f32),
}

impl ControlValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ControlValue::Pressed => None,
            ControlValue::Value(v) => Some(*v),
        }
    }
}

/// Host-facing identifier of a registered control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(u64);

/// Proof of registration. Only [`ControlPanel::register`] creates one and
/// only [`ControlPanel::unregister`] consumes it.
#[derive(Debug)]
#[must_use = "a control token must be passed back to `unregister`"]
pub struct ControlToken {
    id: ControlId,
    owner: Generation,
    listener: ResourceId,
}

impl ControlToken {
    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn owner(&self) -> Generation {
        self.owner
    }
}

/// A registered control as the host sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlInfo {
    pub id: ControlId,
    pub owner: Generation,
    pub kind: ControlKind,
    /// Last resolved slider value; `None` for buttons.
    pub value: Option<f32>,
}

/// Registry of every live control, shared by all scenes through the
/// [`AppContext`](crate::AppContext).
#[derive(Debug, Default)]
pub struct ControlPanel {
    controls: Vec<ControlInfo>,
    next_id: u64,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        owner: Generation,
        kind: ControlKind,
        ledger: &mut ResourceLedger,
    ) -> ControlToken {
        let id = ControlId(self.next_id);
        self.next_id += 1;
        let listener = ledger.allocate(ResourceKind::Listener);
        let value = match &kind {
            ControlKind::Button { .. } => None,
            ControlKind::Slider { initial, .. } => Some(*initial),
        };
        tracing::trace!(?id, %owner, label = kind.label(), "control registered");
        self.controls.push(ControlInfo {
            id,
            owner,
            kind,
            value,
        });
        ControlToken {
            id,
            owner,
            listener,
        }
    }

    /// Remove a control and release its listener.
    pub fn unregister(&mut self, token: ControlToken, ledger: &mut ResourceLedger) -> bool {
        let before = self.controls.len();
        self.controls.retain(|c| c.id != token.id);
        let removed = self.controls.len() != before;
        let released = ledger.release(token.listener);
        removed && released
    }

    /// Resolve a host event for control `id`. Returns the owning generation
    /// and the clamped value, or `None` for an unknown control.
    pub fn resolve(&mut self, id: ControlId, raw: ControlValue) -> Option<(Generation, ControlValue)> {
        let control = self.controls.iter_mut().find(|c| c.id == id)?;
        let value = control.kind.resolve(raw);
        if let ControlValue::Value(v) = value {
            control.value = Some(v);
        }
        Some((control.owner, value))
    }

    pub fn controls(&self) -> &[ControlInfo] {
        &self.controls
    }

    pub fn find(&self, label: &str) -> Option<&ControlInfo> {
        self.controls.iter().find(|c| c.kind.label() == label)
    }

    pub fn owned_by(&self, owner: Generation) -> usize {
        self.controls.iter().filter(|c| c.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}
