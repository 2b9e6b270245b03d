//! Physics collaborator: rigid bodies under constant gravity, stepped in fixed
//! substeps from wall-clock deltas.
//!
//! # Invariants
//! - A single `step` call never runs more than `max_substeps` substeps.
//!   Accumulated time the cap cannot cover is discarded, not queued.
//! - Negative, NaN, or infinite deltas are treated as zero.
//! - Mass 0 bodies are fixed. Contact response never displaces them.
//!
//! Contact resolution is delegated to rapier3d. This crate owns the
//! accumulator, the typed material parameters, and the glam boundary.

mod body;
mod convert;
mod material;
mod world;

pub use body::{BodyDesc, BodyHandle, BodyState, Shape};
pub use material::{ContactMaterial, StepConfig};
pub use world::{PhysicsWorld, StepReport};

/// Standard gravity used by the scene, in m/s^2.
pub const GRAVITY: glam::Vec3 = glam::Vec3::new(0.0, -9.82, 0.0);

/// Errors from physics configuration and body construction.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PhysicsError {
    #[error("{name} must lie in [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f32 },
    #[error("fixed time step must be positive and finite, got {0}")]
    InvalidTimeStep(f32),
    #[error("max substeps must be at least 1")]
    ZeroSubsteps,
    #[error("mass must be finite and non-negative, got {0}")]
    InvalidMass(f32),
    #[error("degenerate shape: {0}")]
    DegenerateShape(String),
    #[error("unknown body handle")]
    UnknownBody,
}
