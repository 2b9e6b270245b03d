use giftbox_common::EntityId;
use giftbox_kernel::{Origin, Scene, World};
use glam::Vec3;

/// Scene inspector for developer tooling.
///
/// Provides read-only queries against the scene for debugging and the
/// debug panel.
pub struct WorldInspector;

impl WorldInspector {
    /// Produce a summary of the scene state.
    pub fn summary(scene: &Scene) -> SceneSummary {
        let world = &scene.world;
        let last = world.last_step();
        SceneSummary {
            simulated_time: world.physics().simulated_time(),
            substeps: world.physics().substeps_total(),
            last_substeps: last.substeps,
            entity_count: world.entity_count(),
            spawned_count: world.spawned_count(),
            spawn_cap: world.spawn_policy().cap,
            light_position: scene.light.position,
        }
    }

    /// Mesh and body state of one entity.
    pub fn inspect_entity(world: &World, id: EntityId) -> Option<EntityInfo> {
        let entity = world.entity(id)?;
        let body = world.body_state(id)?;
        Some(EntityInfo {
            id,
            origin: entity.origin(),
            mesh_position: entity.mesh().position,
            body_position: body.position,
            speed: body.speed(),
            sleeping: body.sleeping,
        })
    }

    /// List all entity IDs in creation order.
    pub fn list_entities(world: &World) -> Vec<EntityId> {
        world.entities().map(|e| e.id()).collect()
    }
}

/// Summary of scene state for the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSummary {
    pub simulated_time: f64,
    pub substeps: u64,
    pub last_substeps: u32,
    pub entity_count: usize,
    pub spawned_count: usize,
    pub spawn_cap: usize,
    pub light_position: Vec3,
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scene: t={:.3}s substeps={} entities={} spawned={}/{} light=({:.2}, {:.2}, {:.2})",
            self.simulated_time,
            self.substeps,
            self.entity_count,
            self.spawned_count,
            self.spawn_cap,
            self.light_position.x,
            self.light_position.y,
            self.light_position.z,
        )
    }
}

/// Detailed info about a single entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub id: EntityId,
    pub origin: Origin,
    pub mesh_position: Vec3,
    pub body_position: Vec3,
    pub speed: f32,
    pub sleeping: bool,
}

impl std::fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entity [{}] {:?} mesh=({:.2}, {:.2}, {:.2}) speed={:.2}{}",
            self.id.short(),
            self.origin,
            self.mesh_position.x,
            self.mesh_position.y,
            self.mesh_position.z,
            self.speed,
            if self.sleeping { " (asleep)" } else { "" },
        )
    }
}
