//! The render surface boundary.
//!
//! The engine never rasterizes anything itself. Each frame it hands the
//! surface a [`FramePacket`] of GPU-ready instance data, and it forwards every
//! resource allocation and release as a [`ResourceCommand`] so the backend can
//! mirror the scene's [`ResourceLedger`](crate::ResourceLedger).

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::clock::Tick;
use crate::error::{VignetteError, VignetteResult};
use crate::resources::ResourceId;
use crate::scene::SceneId;
use crate::transform::Transform;

/// RGBA color, straight alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// Soft violet used for unresolved, probabilistic objects.
    pub const CLOUD: Color = Color::rgba(0.55, 0.45, 1.0, 0.6);
    /// Warm orange for "up" outcomes and particles.
    pub const UP: Color = Color::rgb(1.0, 0.55, 0.2);
    /// Cool cyan for "down" outcomes and antiparticles.
    pub const DOWN: Color = Color::rgb(0.2, 0.8, 1.0);
    pub const GOLD: Color = Color::rgb(1.0, 0.84, 0.35);

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Component-wise linear interpolation.
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Unit geometry a node is drawn with. The backend owns the actual meshes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Sphere,
    Cube,
    /// Unit segment along +Y, used for pair connectors.
    Segment,
    Petal,
    Ring,
}

/// Kind of resource tracked by the ledger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResourceKind {
    Geometry(Shape),
    Material(Color),
    /// A control subscription. Listeners never reach the render surface.
    Listener,
}

impl ResourceKind {
    /// Whether the render surface needs to hear about this resource.
    pub fn is_gpu(&self) -> bool {
        !matches!(self, ResourceKind::Listener)
    }
}

/// Resource traffic forwarded to the render surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResourceCommand {
    Upload { id: ResourceId, kind: ResourceKind },
    Release { id: ResourceId },
}

/// Per-instance data uploaded to the GPU each frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl InstanceRaw {
    pub fn new(transform: &Transform, color: Color) -> Self {
        Self {
            model: transform.matrix().to_cols_array_2d(),
            color: color.to_array(),
        }
    }
}

/// Full-screen tint drawn over the scene during a navigation fade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Overlay {
    pub color: Color,
    pub alpha: f32,
}

/// Everything the surface needs to draw one frame.
#[derive(Debug)]
pub struct FramePacket<'a> {
    /// Scene being shown, if any.
    pub scene: Option<&'a SceneId>,
    /// Clock of the shown scene.
    pub tick: Option<Tick>,
    pub instances: &'a [InstanceRaw],
    pub overlay: Option<Overlay>,
    /// Message shown instead of a scene after an initialization failure.
    pub fallback: Option<&'a str>,
}

impl FramePacket<'_> {
    /// Raw bytes of the instance buffer.
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.instances)
    }
}

/// Opaque render backend capability consumed by the engine.
pub trait RenderSurface {
    /// Attach the surface for a scene about to initialise.
    ///
    /// An error here is the one fault reported to the host.
    fn attach(&mut self, scene: &SceneId) -> VignetteResult<()>;

    /// Mirror a resource allocation or release.
    fn apply(&mut self, command: ResourceCommand);

    /// Draw a frame. Called by the host after every update.
    fn render_frame(&mut self, frame: &FramePacket<'_>);

    /// Called after a scene has been disposed.
    fn detach(&mut self, _scene: &SceneId) {}
}

/// Counters recorded by [`HeadlessSurface`].
#[derive(Clone, Debug, Default)]
pub struct SurfaceStats {
    pub attached: Option<SceneId>,
    pub attach_count: usize,
    pub frames: u64,
    pub uploads: usize,
    pub releases: usize,
    /// Releases of ids that were never uploaded or already released.
    pub bad_releases: usize,
    pub live: HashSet<ResourceId>,
    pub last_instance_count: usize,
    pub bytes_submitted: usize,
    pub last_overlay: Option<Overlay>,
    pub last_fallback: Option<String>,
}

/// Surface that draws nothing and records what it was asked to do.
///
/// Used by the headless runner and the test suite. The stats are shared
/// through an `Rc<RefCell<_>>` so they stay readable after the surface is
/// boxed into an [`AppContext`](crate::AppContext).
#[derive(Default)]
pub struct HeadlessSurface {
    stats: Rc<RefCell<SurfaceStats>>,
    refuse_attach: Option<String>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose `attach` always fails with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            stats: Rc::default(),
            refuse_attach: Some(reason.into()),
        }
    }

    pub fn stats(&self) -> Rc<RefCell<SurfaceStats>> {
        Rc::clone(&self.stats)
    }
}

impl RenderSurface for HeadlessSurface {
    fn attach(&mut self, scene: &SceneId) -> VignetteResult<()> {
        if let Some(reason) = &self.refuse_attach {
            return Err(VignetteError::surface_unavailable(reason.clone()));
        }
        let mut stats = self.stats.borrow_mut();
        stats.attached = Some(scene.clone());
        stats.attach_count += 1;
        Ok(())
    }

    fn apply(&mut self, command: ResourceCommand) {
        let mut stats = self.stats.borrow_mut();
        match command {
            ResourceCommand::Upload { id, .. } => {
                stats.uploads += 1;
                stats.live.insert(id);
            }
            ResourceCommand::Release { id } => {
                stats.releases += 1;
                if !stats.live.remove(&id) {
                    stats.bad_releases += 1;
                }
            }
        }
    }

    fn render_frame(&mut self, frame: &FramePacket<'_>) {
        let mut stats = self.stats.borrow_mut();
        stats.frames += 1;
        stats.last_instance_count = frame.instances.len();
        stats.bytes_submitted += frame.instance_bytes().len();
        stats.last_overlay = frame.overlay;
        stats.last_fallback = frame.fallback.map(str::to_owned);
    }

    fn detach(&mut self, scene: &SceneId) {
        let mut stats = self.stats.borrow_mut();
        if stats.attached.as_ref() == Some(scene) {
            stats.attached = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 80);
        let inst = InstanceRaw::new(&Transform::new(), Color::WHITE);
        assert_eq!(bytemuck::bytes_of(&inst).len(), 80);
        assert_eq!(inst.color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn color_lerp_clamps() {
        let c = Color::BLACK.lerp(Color::WHITE, 2.0);
        assert_eq!(c, Color::WHITE);
        assert_eq!(Color::UP.with_alpha(0.25).a, 0.25);
    }

    #[test]
    fn unavailable_surface_refuses_attach() {
        let mut surface = HeadlessSurface::unavailable("no adapter");
        let err = surface.attach(&SceneId::new("lotus")).unwrap_err();
        assert!(err.is_init_failure());
        assert_eq!(surface.stats().borrow().attach_count, 0);
    }
}
