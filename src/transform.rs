use glam::{Mat4, Quat, Vec3};

/// Position, rotation and scale of a scene node.
///
/// Transforms are stored as a component on every node in the
/// [`SceneGraph`](crate::SceneGraph) and converted to a model matrix when the
/// frame packet is built.
///
/// # Example
///
/// ```
/// use vignette::Transform;
/// use glam::Vec3;
///
/// let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0)).uniform_scale(0.5);
/// assert_eq!(t.scale, Vec3::splat(0.5));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// A thin segment stretched between two points, used for pair connectors.
    ///
    /// The unit shape is assumed to run along +Y from -0.5 to 0.5.
    pub fn segment(from: Vec3, to: Vec3, thickness: f32) -> Self {
        let delta = to - from;
        let length = delta.length();
        let rotation = if length > f32::EPSILON {
            Quat::from_rotation_arc(Vec3::Y, delta / length)
        } else {
            Quat::IDENTITY
        };
        Self {
            position: (from + to) * 0.5,
            rotation,
            scale: Vec3::new(thickness, length, thickness),
        }
    }

    /// Model matrix in scale-rotate-translate order.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_spans_both_endpoints() {
        let from = Vec3::new(-1.0, 0.0, 0.0);
        let to = Vec3::new(1.0, 0.0, 0.0);
        let t = Transform::segment(from, to, 0.05);

        assert_eq!(t.position, Vec3::ZERO);
        assert!((t.scale.y - 2.0).abs() < 1e-5);

        let tip = t.matrix().transform_point3(Vec3::new(0.0, 0.5, 0.0));
        assert!((tip - to).length() < 1e-4);
    }

    #[test]
    fn degenerate_segment_has_identity_rotation() {
        let t = Transform::segment(Vec3::ONE, Vec3::ONE, 0.1);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale.y, 0.0);
    }
}
