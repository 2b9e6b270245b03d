//! World kernel: the entity store pairing physics bodies with mesh transforms,
//! the frame clock, and the visual-only parts of the scene.
//!
//! # Invariants
//! - Bodies are mutated only by the physics collaborator; meshes only by
//!   [`World::sync_meshes`].
//! - After `sync_meshes`, every mesh position equals its body position plus
//!   the entity's visual offset, exactly.
//! - Entities are never removed. Spawned entities are bounded by the spawn
//!   pool cap and recycled oldest-first.

pub mod clock;
pub mod light;
pub mod scene;
pub mod world;

pub use clock::{Clock, FrameTime};
pub use light::{OrbitLight, orbit_position};
pub use scene::{
    DEFAULT_FLOOR_TINT, PRIMARY_BOX_GREY, Prop, PropKind, Scene, SceneLighting, Surface,
    TextureSlot, default_props,
};
pub use world::{
    Entity, EntityDesc, Origin, SpawnOutcome, SpawnPolicy, SyncPolicy, Visual, World, WorldConfig,
};

use giftbox_common::EntityId;

/// Errors from world operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("physics: {0}")]
    Physics(#[from] giftbox_physics::PhysicsError),
    #[error("entity {0:?} not found")]
    EntityNotFound(EntityId),
    #[error("spawn pool cap must be at least 1")]
    ZeroSpawnCap,
}
