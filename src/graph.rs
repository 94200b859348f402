//! Scene graph store.
//!
//! Nodes live in a `hecs` world owned by exactly one scene. Adding a node
//! allocates its geometry and material in the scene's [`ResourceLedger`];
//! removing it releases them in the same call.

use hecs::{DynamicBundle, Entity, EntityBuilder, World};

use crate::components::{Appearance, NodeResources, Role, Tag, TimedObject};
use crate::render::{Color, InstanceRaw, ResourceKind, Shape};
use crate::resources::ResourceLedger;
use crate::scene::Generation;
use crate::transform::Transform;

/// Everything needed to add a node.
#[derive(Clone, Copy, Debug)]
pub struct NodeDesc {
    pub transform: Transform,
    pub appearance: Appearance,
    pub role: Role,
    pub tag: Tag,
}

impl NodeDesc {
    /// A static decoration.
    pub fn decoration(tag: &'static str, shape: Shape, color: Color, transform: Transform) -> Self {
        Self {
            transform,
            appearance: Appearance::new(shape, color),
            role: Role::Static,
            tag: Tag(tag),
        }
    }
}

/// Ownership tree of drawable nodes for one scene.
pub struct SceneGraph {
    world: World,
    ledger: ResourceLedger,
}

impl SceneGraph {
    pub fn new(generation: Generation) -> Self {
        Self {
            world: World::new(),
            ledger: ResourceLedger::new(generation),
        }
    }

    /// Add a node and allocate its resources.
    pub fn add(&mut self, node: NodeDesc) -> Entity {
        let mut builder = self.builder(node);
        self.world.spawn(builder.build())
    }

    /// Add a node carrying extra components.
    pub fn add_with(&mut self, node: NodeDesc, extra: impl DynamicBundle) -> Entity {
        let mut builder = self.builder(node);
        builder.add_bundle(extra);
        self.world.spawn(builder.build())
    }

    fn builder(&mut self, node: NodeDesc) -> EntityBuilder {
        let resources = NodeResources {
            geometry: self
                .ledger
                .allocate(ResourceKind::Geometry(node.appearance.shape)),
            material: self
                .ledger
                .allocate(ResourceKind::Material(node.appearance.color)),
        };
        let mut builder = EntityBuilder::new();
        builder
            .add(node.transform)
            .add(node.appearance)
            .add(resources)
            .add(node.role)
            .add(node.tag);
        builder
    }

    /// Remove a node and release its resources. Returns `false` if the node
    /// was already gone.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if !self.world.contains(entity) {
            return false;
        }
        self.dispose_resources(entity);
        self.world.despawn(entity).is_ok()
    }

    /// Release a node's resources without removing the node.
    ///
    /// The resources component is taken off the node, so a later `remove`
    /// does not release anything twice.
    pub fn dispose_resources(&mut self, entity: Entity) -> bool {
        match self.world.remove_one::<NodeResources>(entity) {
            Ok(resources) => {
                self.ledger.release(resources.geometry);
                self.ledger.release(resources.material);
                true
            }
            Err(_) => false,
        }
    }

    /// Remove every node. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let entities: Vec<Entity> = self.world.iter().map(|e| e.entity()).collect();
        for &entity in &entities {
            self.dispose_resources(entity);
        }
        self.world.clear();
        entities.len()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.len() == 0
    }

    pub fn role(&self, entity: Entity) -> Option<Role> {
        self.world.get::<&Role>(entity).ok().map(|r| *r)
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<&Transform>(entity).ok().map(|t| *t)
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform) -> bool {
        match self.world.get::<&mut Transform>(entity) {
            Ok(mut t) => {
                *t = transform;
                true
            }
            Err(_) => false,
        }
    }

    pub fn appearance(&self, entity: Entity) -> Option<Appearance> {
        self.world.get::<&Appearance>(entity).ok().map(|a| *a)
    }

    pub fn set_color(&mut self, entity: Entity, color: Color) -> bool {
        match self.world.get::<&mut Appearance>(entity) {
            Ok(mut a) => {
                a.color = color;
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_visible(&mut self, entity: Entity, visible: bool) -> bool {
        match self.world.get::<&mut Appearance>(entity) {
            Ok(mut a) => {
                a.visible = visible;
                true
            }
            Err(_) => false,
        }
    }

    /// Entities carrying `tag`, in no particular order.
    pub fn tagged(&self, tag: &str) -> Vec<Entity> {
        self.world
            .query::<&Tag>()
            .iter()
            .filter(|(_, t)| t.0 == tag)
            .map(|(e, _)| e)
            .collect()
    }

    pub fn count_tagged(&self, tag: &str) -> usize {
        self.world
            .query::<&Tag>()
            .iter()
            .filter(|(_, t)| t.0 == tag)
            .count()
    }

    /// Append one instance per visible node.
    pub fn collect_instances(&self, out: &mut Vec<InstanceRaw>) {
        let mut query = self
            .world
            .query::<(&Transform, &Appearance, Option<&TimedObject>)>();
        for (_, (transform, appearance, timed)) in query.iter() {
            if !appearance.visible {
                continue;
            }
            let fade = timed.map_or(1.0, TimedObject::fade);
            let color = appearance.color.with_alpha(appearance.color.a * fade);
            out.push(InstanceRaw::new(transform, color));
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn graph() -> SceneGraph {
        SceneGraph::new(Generation::FIRST)
    }

    fn stem() -> NodeDesc {
        NodeDesc::decoration("stem", Shape::Cube, Color::GOLD, Transform::new())
    }

    #[test]
    fn add_allocates_geometry_and_material() {
        let mut g = graph();
        g.add(stem());
        assert_eq!(g.ledger().allocated(), 2);
        assert_eq!(g.ledger().live_count(), 2);
    }

    #[test]
    fn remove_releases_once() {
        let mut g = graph();
        let e = g.add(stem());

        assert!(g.remove(e));
        assert!(!g.remove(e));
        assert_eq!(g.ledger().released(), 2);
        assert_eq!(g.ledger().rejected_releases(), 0);
    }

    #[test]
    fn dispose_resources_then_remove_does_not_double_release() {
        let mut g = graph();
        let e = g.add(stem());

        assert!(g.dispose_resources(e));
        assert!(!g.dispose_resources(e));
        assert!(g.remove(e));
        assert_eq!(g.ledger().released(), 2);
        assert_eq!(g.ledger().rejected_releases(), 0);
    }

    #[test]
    fn clear_balances_the_ledger() {
        let mut g = graph();
        for _ in 0..3 {
            g.add(stem());
        }
        assert_eq!(g.clear(), 3);
        assert!(g.is_empty());
        assert_eq!(g.ledger().allocated(), g.ledger().released());
    }

    #[test]
    fn hidden_nodes_are_not_drawn() {
        let mut g = graph();
        let a = g.add(stem());
        g.add(NodeDesc::decoration(
            "petal",
            Shape::Petal,
            Color::WHITE,
            Transform::from_position(Vec3::Y),
        ));
        g.set_visible(a, false);

        let mut out = Vec::new();
        g.collect_instances(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(g.count_tagged("petal"), 1);
        assert_eq!(g.tagged("stem"), vec![a]);
    }
}
