use glam::{Quat, Vec3};
use rapier3d::prelude::{ColliderBuilder, RigidBodyHandle, Vector};

use crate::PhysicsError;

/// Collision shape of a body, in body-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Infinite plane through the body origin with local normal +Z.
    /// Rotate the body to orient it.
    Plane,
}

impl Shape {
    pub fn cube(half_extent: f32) -> Self {
        Self::Box {
            half_extents: Vec3::splat(half_extent),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PhysicsError> {
        match *self {
            Self::Box { half_extents } => {
                if !half_extents.is_finite() || half_extents.min_element() <= 0.0 {
                    return Err(PhysicsError::DegenerateShape(format!(
                        "box half extents {half_extents}"
                    )));
                }
            }
            Self::Sphere { radius } => {
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(PhysicsError::DegenerateShape(format!(
                        "sphere radius {radius}"
                    )));
                }
            }
            Self::Plane => {}
        }
        Ok(())
    }

    pub(crate) fn collider_builder(&self) -> ColliderBuilder {
        match *self {
            Self::Box { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Self::Sphere { radius } => ColliderBuilder::ball(radius),
            Self::Plane => ColliderBuilder::halfspace(Vector::z_axis()),
        }
    }
}

/// Everything needed to insert a body: shape, mass, initial pose.
///
/// A mass of 0 makes the body fixed (immovable, unaffected by gravity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub shape: Shape,
    pub mass: f32,
    pub position: Vec3,
    pub rotation: Quat,
}

impl BodyDesc {
    pub fn new(shape: Shape, mass: f32, position: Vec3) -> Self {
        Self {
            shape,
            mass,
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.mass == 0.0
    }

    pub(crate) fn validate(&self) -> Result<(), PhysicsError> {
        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(PhysicsError::InvalidMass(self.mass));
        }
        if matches!(self.shape, Shape::Plane) && !self.is_fixed() {
            return Err(PhysicsError::DegenerateShape(
                "planes must be static (mass 0)".into(),
            ));
        }
        self.shape.validate()
    }
}

/// Opaque reference to a body inside a [`crate::PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) RigidBodyHandle);

/// Snapshot of a body's physical state after the latest step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub fixed: bool,
    pub sleeping: bool,
}

impl BodyState {
    pub fn speed(&self) -> f32 {
        self.linear_velocity.length()
    }
}
