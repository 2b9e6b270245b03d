use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_2;

use giftbox_common::{AssetId, EntityId, Transform};
use giftbox_physics::{
    BodyDesc, BodyHandle, BodyState, ContactMaterial, GRAVITY, PhysicsWorld, Shape, StepConfig,
    StepReport,
};
use glam::{Quat, Vec3};

use crate::KernelError;

/// How an entity's mesh follows its body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncPolicy {
    /// World-space offset added to the body position. Compensates for a
    /// visual model whose origin differs from the collision shape's.
    pub offset: Vec3,
    /// Copy the body orientation onto the mesh.
    pub orientation: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            offset: Vec3::ZERO,
            orientation: true,
        }
    }
}

/// What the renderer draws for an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visual {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    Model(AssetId),
    /// Nothing to draw yet (model pending or failed).
    Hidden,
}

impl Visual {
    /// Default visual matching a collision shape one-to-one.
    pub fn for_shape(shape: &Shape) -> Self {
        match *shape {
            Shape::Box { half_extents } => Self::Box { half_extents },
            Shape::Sphere { radius } => Self::Sphere { radius },
            Shape::Plane => Self::Hidden,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The startup entity. Always present, never recycled.
    Primary,
    /// Created by the spawn interaction; subject to the pool cap.
    Spawned,
    /// Created directly through [`World::add_entity`].
    Added,
}

/// A dynamic object: a physics body paired one-to-one with a mesh transform.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    body: BodyHandle,
    shape: Shape,
    mesh: Transform,
    sync: SyncPolicy,
    visual: Visual,
    origin: Origin,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Visual transform as of the latest [`World::sync_meshes`].
    pub fn mesh(&self) -> &Transform {
        &self.mesh
    }

    pub fn sync(&self) -> SyncPolicy {
        self.sync
    }

    pub fn visual(&self) -> Visual {
        self.visual
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }
}

/// Blueprint for an entity with non-default sync or visual settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityDesc {
    pub position: Vec3,
    pub shape: Shape,
    pub mass: f32,
    pub sync: SyncPolicy,
    pub visual: Visual,
}

impl EntityDesc {
    pub fn new(position: Vec3, shape: Shape, mass: f32) -> Self {
        Self {
            position,
            shape,
            mass,
            sync: SyncPolicy::default(),
            visual: Visual::for_shape(&shape),
        }
    }
}

/// Parameters of the discrete spawn interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPolicy {
    pub position: Vec3,
    pub shape: Shape,
    pub mass: f32,
    /// How spawned meshes follow their bodies. The default offset lifts a
    /// box resting on the physics ground onto the visible floor at `y = 1`.
    pub sync: SyncPolicy,
    /// Maximum number of spawned entities alive at once. Spawning past the
    /// cap recycles the oldest one.
    pub cap: usize,
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        Self {
            position: Vec3::new(2.5, 5.0, 0.0),
            shape: Shape::cube(0.5),
            mass: 1.0,
            sync: SyncPolicy {
                offset: Vec3::new(0.0, 1.0, 0.0),
                orientation: true,
            },
            cap: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Created(EntityId),
    Recycled(EntityId),
}

impl SpawnOutcome {
    pub fn id(&self) -> EntityId {
        match *self {
            Self::Created(id) | Self::Recycled(id) => id,
        }
    }
}

/// Everything [`World::new`] needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub gravity: Vec3,
    pub material: ContactMaterial,
    pub step: StepConfig,
    pub ground_position: Vec3,
    pub ground_rotation: Quat,
    pub primary: EntityDesc,
    pub spawn: SpawnPolicy,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            material: ContactMaterial::default(),
            step: StepConfig::default(),
            ground_position: Vec3::ZERO,
            ground_rotation: Quat::from_axis_angle(Vec3::NEG_X, FRAC_PI_2),
            primary: EntityDesc {
                sync: SyncPolicy {
                    offset: Vec3::new(0.0, 0.5, 0.0),
                    orientation: true,
                },
                visual: Visual::Box {
                    half_extents: Vec3::splat(0.5),
                },
                ..EntityDesc::new(Vec3::new(0.0, 2.0, 0.0), Shape::cube(1.0), 1.0)
            },
            spawn: SpawnPolicy::default(),
        }
    }
}

/// The world state store: ordered entities, the static ground, and the
/// physics world that owns their bodies.
///
/// Index 0 of the entity list is always the primary entity.
pub struct World {
    physics: PhysicsWorld,
    step: StepConfig,
    ground: BodyHandle,
    entities: Vec<Entity>,
    spawn: SpawnPolicy,
    /// Spawned entity ids, oldest first.
    spawned: VecDeque<EntityId>,
    last_step: StepReport,
}

impl World {
    pub fn new(config: WorldConfig) -> Result<Self, KernelError> {
        if config.spawn.cap == 0 {
            return Err(KernelError::ZeroSpawnCap);
        }

        let mut physics = PhysicsWorld::new(config.gravity, config.material);
        let ground = physics.add_body(
            BodyDesc::new(Shape::Plane, 0.0, config.ground_position)
                .with_rotation(config.ground_rotation),
        )?;

        let mut world = Self {
            physics,
            step: config.step,
            ground,
            entities: Vec::new(),
            spawn: config.spawn,
            spawned: VecDeque::new(),
            last_step: StepReport::default(),
        };
        world.insert(config.primary, Origin::Primary)?;
        world.sync_meshes();
        Ok(world)
    }

    /// Create an entity with a body at `position` and append it.
    ///
    /// The mesh starts at the default transform and is corrected on the next
    /// [`World::sync_meshes`].
    pub fn add_entity(&mut self, position: Vec3, shape: Shape, mass: f32) -> Result<EntityId, KernelError> {
        self.insert(EntityDesc::new(position, shape, mass), Origin::Added)
    }

    fn insert(&mut self, desc: EntityDesc, origin: Origin) -> Result<EntityId, KernelError> {
        let body = self
            .physics
            .add_body(BodyDesc::new(desc.shape, desc.mass, desc.position))?;
        let id = EntityId::new();
        self.entities.push(Entity {
            id,
            body,
            shape: desc.shape,
            mesh: Transform::default(),
            sync: desc.sync,
            visual: desc.visual,
            origin,
        });
        Ok(id)
    }

    /// Entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn primary(&self) -> &Entity {
        // Inserted first in `new`, never removed.
        &self.entities[0]
    }

    pub fn spawned_count(&self) -> usize {
        self.spawned.len()
    }

    pub fn spawn_policy(&self) -> &SpawnPolicy {
        &self.spawn
    }

    pub fn step_config(&self) -> StepConfig {
        self.step
    }

    pub fn last_step(&self) -> StepReport {
        self.last_step
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn ground_state(&self) -> Option<BodyState> {
        self.physics.body(self.ground)
    }

    pub fn body_state(&self, id: EntityId) -> Option<BodyState> {
        self.entity(id).and_then(|e| self.physics.body(e.body))
    }

    pub fn set_visual(&mut self, id: EntityId, visual: Visual) -> Result<(), KernelError> {
        let entity = self
            .entities
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(KernelError::EntityNotFound(id))?;
        entity.visual = visual;
        Ok(())
    }

    /// Advance physics by `delta` seconds of wall time with the configured
    /// fixed step and substep cap.
    pub fn step(&mut self, delta: f32) -> StepReport {
        self.last_step = self.physics.step(
            self.step.fixed_time_step(),
            delta,
            self.step.max_substeps(),
        );
        self.last_step
    }

    /// Copy every body's pose onto its mesh. Returns the number of meshes
    /// written.
    pub fn sync_meshes(&mut self) -> usize {
        let mut synced = 0;
        for entity in &mut self.entities {
            let Some(state) = self.physics.body(entity.body) else {
                tracing::warn!(id = %entity.id.short(), "entity body missing from physics world");
                continue;
            };
            entity.mesh.position = state.position + entity.sync.offset;
            if entity.sync.orientation {
                entity.mesh.rotation = state.rotation;
            }
            synced += 1;
        }
        synced
    }

    /// The spawn interaction: one new entity from the spawn policy, or the
    /// oldest spawned one put back at the spawn point once the cap is reached.
    pub fn spawn(&mut self) -> Result<SpawnOutcome, KernelError> {
        if self.spawned.len() >= self.spawn.cap {
            if let Some(oldest) = self.spawned.pop_front() {
                let body = self
                    .entity(oldest)
                    .map(|e| e.body)
                    .ok_or(KernelError::EntityNotFound(oldest))?;
                self.physics.reset_body(body, self.spawn.position)?;
                self.spawned.push_back(oldest);
                tracing::info!(id = %oldest.short(), "spawn cap reached, recycled oldest entity");
                return Ok(SpawnOutcome::Recycled(oldest));
            }
        }

        let policy = self.spawn;
        let id = self.insert(
            EntityDesc {
                sync: policy.sync,
                ..EntityDesc::new(policy.position, policy.shape, policy.mass)
            },
            Origin::Spawned,
        )?;
        self.spawned.push_back(id);
        tracing::info!(id = %id.short(), total = self.entities.len(), "spawned entity");
        Ok(SpawnOutcome::Created(id))
    }

    /// Teleport an entity's body by `offset`, keeping its velocity.
    pub fn nudge(&mut self, id: EntityId, offset: Vec3) -> Result<(), KernelError> {
        let state = self.body_state(id).ok_or(KernelError::EntityNotFound(id))?;
        let body = self.entity(id).map(|e| e.body).ok_or(KernelError::EntityNotFound(id))?;
        self.physics.set_translation(body, state.position + offset)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn world() -> World {
        World::new(WorldConfig::default()).unwrap()
    }

    fn assert_synced(world: &World) {
        for e in world.entities() {
            let state = world.body_state(e.id()).unwrap();
            assert_eq!(e.mesh().position, state.position + e.sync().offset);
            if e.sync().orientation {
                assert_eq!(e.mesh().rotation, state.rotation);
            }
        }
    }

    #[test]
    fn starts_with_primary_and_ground() {
        let w = world();
        assert_eq!(w.entity_count(), 1);
        assert_eq!(w.primary().origin(), Origin::Primary);
        assert_eq!(
            w.body_state(w.primary().id()).unwrap().position,
            Vec3::new(0.0, 2.0, 0.0)
        );
        let ground = w.ground_state().unwrap();
        assert!(ground.fixed);
        assert_eq!(ground.mass, 0.0);
        assert_eq!(w.physics().body_count(), 2);
    }

    #[test]
    fn primary_mesh_carries_visual_offset() {
        let w = world();
        assert_eq!(w.primary().mesh().position, Vec3::new(0.0, 2.5, 0.0));
    }

    #[test]
    fn add_entity_appends_in_order_with_unsynced_mesh() {
        let mut w = world();
        let a = w.add_entity(Vec3::new(3.0, 4.0, 0.0), Shape::cube(0.5), 1.0).unwrap();
        let b = w
            .add_entity(Vec3::new(-3.0, 4.0, 0.0), Shape::Sphere { radius: 0.3 }, 2.0)
            .unwrap();
        let order: Vec<EntityId> = w.entities().map(|e| e.id()).collect();
        assert_eq!(order, vec![w.primary().id(), a, b]);
        assert_eq!(*w.entity(a).unwrap().mesh(), Transform::default());
        assert_eq!(
            w.entity(b).unwrap().visual(),
            Visual::Sphere { radius: 0.3 }
        );

        assert_eq!(w.sync_meshes(), 3);
        assert_eq!(w.entity(a).unwrap().mesh().position, Vec3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn add_entity_rejects_invalid_mass() {
        let mut w = world();
        assert!(matches!(
            w.add_entity(Vec3::ZERO, Shape::cube(0.5), -1.0),
            Err(KernelError::Physics(_))
        ));
        assert_eq!(w.entity_count(), 1);
    }

    #[test]
    fn sync_matches_bodies_every_frame() {
        let mut w = world();
        w.add_entity(Vec3::new(3.0, 3.0, 0.0), Shape::cube(0.5), 1.0).unwrap();
        for _ in 0..120 {
            w.step(DT);
            w.sync_meshes();
            assert_synced(&w);
        }
    }

    #[test]
    fn zero_delta_leaves_bodies_untouched() {
        let mut w = world();
        w.step(DT);
        w.sync_meshes();
        let before: Vec<Transform> = w.entities().map(|e| *e.mesh()).collect();
        let report = w.step(0.0);
        w.sync_meshes();
        let after: Vec<Transform> = w.entities().map(|e| *e.mesh()).collect();
        assert_eq!(report.substeps, 0);
        assert_eq!(before, after);
    }

    #[test]
    fn two_spawns_make_two_tracked_entities() {
        let mut w = world();
        let primary = w.primary().id();
        let first = w.spawn().unwrap();
        for _ in 0..30 {
            w.step(DT);
            w.sync_meshes();
        }
        let second = w.spawn().unwrap();
        assert!(matches!(first, SpawnOutcome::Created(_)));
        assert!(matches!(second, SpawnOutcome::Created(_)));
        assert_ne!(first.id(), second.id());
        assert_eq!(w.entity_count(), 3);
        assert_eq!(w.spawned_count(), 2);
        assert_eq!(w.primary().id(), primary);

        for _ in 0..30 {
            w.step(DT);
            w.sync_meshes();
        }
        assert_synced(&w);
        let a = w.entity(first.id()).unwrap().mesh().position;
        let b = w.entity(second.id()).unwrap().mesh().position;
        assert_ne!(a, b);
    }

    #[test]
    fn spawn_cap_recycles_oldest() {
        let mut w = World::new(WorldConfig {
            spawn: SpawnPolicy {
                cap: 2,
                ..SpawnPolicy::default()
            },
            ..WorldConfig::default()
        })
        .unwrap();
        let a = w.spawn().unwrap().id();
        for _ in 0..20 {
            w.step(DT);
        }
        let b = w.spawn().unwrap().id();
        let c = w.spawn().unwrap();
        assert_eq!(c, SpawnOutcome::Recycled(a));
        assert_eq!(w.entity_count(), 3);
        assert_eq!(w.spawned_count(), 2);
        let state = w.body_state(a).unwrap();
        assert_eq!(state.position, w.spawn_policy().position);
        assert_eq!(state.linear_velocity, Vec3::ZERO);

        // Next recycle takes the next oldest.
        assert_eq!(w.spawn().unwrap(), SpawnOutcome::Recycled(b));
    }

    #[test]
    fn only_spawn_creates_pooled_entities() {
        let mut w = World::new(WorldConfig {
            spawn: SpawnPolicy {
                cap: 2,
                ..SpawnPolicy::default()
            },
            ..WorldConfig::default()
        })
        .unwrap();
        for _ in 0..3 {
            w.spawn().unwrap();
            w.add_entity(Vec3::new(-3.0, 4.0, 0.0), Shape::cube(0.5), 1.0).unwrap();
        }
        let count = |origin| w.entities().filter(|e| e.origin() == origin).count();
        assert_eq!(count(Origin::Primary), 1);
        assert_eq!(count(Origin::Spawned), w.spawned_count());
        assert_eq!(count(Origin::Spawned), 2);
        assert_eq!(count(Origin::Added), 3);
    }

    #[test]
    fn zero_cap_is_rejected() {
        let config = WorldConfig {
            spawn: SpawnPolicy {
                cap: 0,
                ..SpawnPolicy::default()
            },
            ..WorldConfig::default()
        };
        assert!(matches!(World::new(config), Err(KernelError::ZeroSpawnCap)));
    }

    #[test]
    fn nudge_raises_primary() {
        let mut w = world();
        let id = w.primary().id();
        w.nudge(id, Vec3::new(0.0, 3.0, 0.0)).unwrap();
        assert_eq!(w.body_state(id).unwrap().position, Vec3::new(0.0, 5.0, 0.0));
        assert!(matches!(
            w.nudge(EntityId::new(), Vec3::Y),
            Err(KernelError::EntityNotFound(_))
        ));
    }

    #[test]
    fn set_visual_switches_to_model() {
        let mut w = world();
        let id = w.primary().id();
        w.set_visual(id, Visual::Model(AssetId(7))).unwrap();
        assert_eq!(w.primary().visual(), Visual::Model(AssetId(7)));
    }

    #[test]
    fn primary_comes_to_rest_above_ground() {
        let mut w = world();
        for _ in 0..(20 * 60) {
            w.step(DT);
            w.sync_meshes();
        }
        let state = w.body_state(w.primary().id()).unwrap();
        assert!(state.speed() < 0.05);
        assert!(state.position.y > 0.95);
        assert_eq!(w.primary().mesh().position.y, state.position.y + 0.5);
    }

    #[test]
    fn spawned_boxes_rest_on_visible_floor() {
        let mut w = world();
        let id = w.spawn().unwrap().id();
        for _ in 0..600 {
            w.step(DT);
            w.sync_meshes();
        }
        let half = match w.entity(id).unwrap().visual() {
            Visual::Box { half_extents } => half_extents.y,
            other => panic!("spawned visual is {other:?}"),
        };
        // Contact slop lets a resting body sink a few millimetres.
        let bottom = w.entity(id).unwrap().mesh().position.y - half;
        assert!(bottom > 0.99, "spawned box bottom at {bottom}");
        assert!(bottom < 1.05, "spawned box floats at {bottom}");
    }
}
