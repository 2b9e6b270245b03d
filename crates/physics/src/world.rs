use glam::Vec3;
use rapier3d::prelude::*;

use crate::body::{BodyDesc, BodyHandle, BodyState};
use crate::convert::{from_rotation, from_vector, to_isometry, to_rotation, to_vector};
use crate::material::ContactMaterial;
use crate::PhysicsError;

/// Outcome of a single [`PhysicsWorld::step`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Fixed substeps actually integrated.
    pub substeps: u32,
    /// Simulated time advanced by this call.
    pub advanced: f32,
    /// Wall time dropped because the substep cap was reached.
    pub discarded: f32,
}

/// Rigid-body world: rapier sets plus the fixed-step accumulator.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    material: ContactMaterial,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    accumulator: f32,
    simulated_time: f64,
    substeps_total: u64,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec3, material: ContactMaterial) -> Self {
        Self {
            gravity: to_vector(gravity),
            material,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            accumulator: 0.0,
            simulated_time: 0.0,
            substeps_total: 0,
        }
    }

    pub fn gravity(&self) -> Vec3 {
        from_vector(&self.gravity)
    }

    pub fn material(&self) -> ContactMaterial {
        self.material
    }

    /// Total simulated time integrated since creation, in seconds.
    pub fn simulated_time(&self) -> f64 {
        self.simulated_time
    }

    pub fn substeps_total(&self) -> u64 {
        self.substeps_total
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Insert a body with a single collider carrying the world material.
    pub fn add_body(&mut self, desc: BodyDesc) -> Result<BodyHandle, PhysicsError> {
        desc.validate()?;

        let builder = if desc.is_fixed() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic().ccd_enabled(true)
        };
        let handle = self
            .bodies
            .insert(builder.position(to_isometry(desc.position, desc.rotation)));

        let mut collider = desc
            .shape
            .collider_builder()
            .friction(self.material.friction())
            .restitution(self.material.restitution());
        if !desc.is_fixed() {
            collider = collider.mass(desc.mass);
        }
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        tracing::debug!(shape = ?desc.shape, mass = desc.mass, position = %desc.position, "body added");
        Ok(BodyHandle(handle))
    }

    pub fn body(&self, handle: BodyHandle) -> Option<BodyState> {
        self.bodies.get(handle.0).map(|b| BodyState {
            position: from_vector(b.translation()),
            rotation: from_rotation(b.rotation()),
            linear_velocity: from_vector(b.linvel()),
            angular_velocity: from_vector(b.angvel()),
            mass: if b.is_fixed() { 0.0 } else { b.mass() },
            fixed: b.is_fixed(),
            sleeping: b.is_sleeping(),
        })
    }

    /// Teleport a body, keeping its velocity and orientation.
    pub fn set_translation(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), PhysicsError> {
        let body = self.bodies.get_mut(handle.0).ok_or(PhysicsError::UnknownBody)?;
        body.set_translation(to_vector(position), true);
        Ok(())
    }

    /// Put a body back at rest at the given position with identity rotation.
    pub fn reset_body(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), PhysicsError> {
        let body = self.bodies.get_mut(handle.0).ok_or(PhysicsError::UnknownBody)?;
        body.set_translation(to_vector(position), false);
        body.set_rotation(to_rotation(glam::Quat::IDENTITY), false);
        body.set_linvel(Vector::zeros(), false);
        body.set_angvel(Vector::zeros(), true);
        Ok(())
    }

    /// Advance the world by `elapsed_delta` seconds of wall time, integrating
    /// whole `fixed_time_step` substeps, at most `max_substeps` of them.
    ///
    /// Leftover time below one substep carries over to the next call. When the
    /// cap is reached, everything beyond that remainder is dropped.
    pub fn step(&mut self, fixed_time_step: f32, elapsed_delta: f32, max_substeps: u32) -> StepReport {
        if !fixed_time_step.is_finite() || fixed_time_step <= 0.0 || max_substeps == 0 {
            tracing::warn!(fixed_time_step, max_substeps, "ignoring step with invalid parameters");
            return StepReport::default();
        }

        self.accumulator += sanitize_delta(elapsed_delta);

        let mut report = StepReport::default();
        while self.accumulator >= fixed_time_step && report.substeps < max_substeps {
            self.integrate(fixed_time_step);
            self.accumulator -= fixed_time_step;
            report.substeps += 1;
            report.advanced += fixed_time_step;
        }

        if self.accumulator >= fixed_time_step {
            let kept = self.accumulator % fixed_time_step;
            report.discarded = self.accumulator - kept;
            self.accumulator = kept;
            tracing::debug!(discarded = report.discarded, "substep cap reached");
        }

        report
    }

    fn integrate(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.simulated_time += dt as f64;
        self.substeps_total += 1;
    }
}

/// Negative, NaN, and infinite deltas become zero.
fn sanitize_delta(delta: f32) -> f32 {
    if delta.is_finite() && delta > 0.0 {
        delta
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GRAVITY, Shape};
    use glam::Quat;
    use std::f32::consts::FRAC_PI_2;

    const DT: f32 = 1.0 / 60.0;

    fn scene() -> (PhysicsWorld, BodyHandle, BodyHandle) {
        let mut world = PhysicsWorld::new(GRAVITY, ContactMaterial::default());
        let ground = world
            .add_body(
                BodyDesc::new(Shape::Plane, 0.0, Vec3::ZERO)
                    .with_rotation(Quat::from_axis_angle(Vec3::NEG_X, FRAC_PI_2)),
            )
            .unwrap();
        let gift = world
            .add_body(BodyDesc::new(Shape::cube(1.0), 1.0, Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();
        (world, ground, gift)
    }

    #[test]
    fn sanitize_clamps_bad_deltas() {
        assert_eq!(sanitize_delta(-1.0), 0.0);
        assert_eq!(sanitize_delta(f32::NAN), 0.0);
        assert_eq!(sanitize_delta(f32::INFINITY), 0.0);
        assert_eq!(sanitize_delta(0.25), 0.25);
    }

    #[test]
    fn zero_delta_does_not_move_bodies() {
        let (mut world, _, gift) = scene();
        let before = world.body(gift).unwrap();
        let report = world.step(DT, 0.0, 3);
        assert_eq!(report.substeps, 0);
        assert_eq!(world.body(gift).unwrap().position, before.position);
        assert_eq!(world.body(gift).unwrap().rotation, before.rotation);
    }

    #[test]
    fn negative_and_nan_deltas_are_ignored() {
        let (mut world, _, gift) = scene();
        let before = world.body(gift).unwrap().position;
        assert_eq!(world.step(DT, -5.0, 3).substeps, 0);
        assert_eq!(world.step(DT, f32::NAN, 3).substeps, 0);
        assert_eq!(world.body(gift).unwrap().position, before);
        assert_eq!(world.simulated_time(), 0.0);
    }

    #[test]
    fn long_stall_is_capped_and_discarded() {
        let (mut world, _, _) = scene();
        let report = world.step(DT, 10.0, 3);
        assert_eq!(report.substeps, 3);
        assert!((world.simulated_time() - 3.0 * DT as f64).abs() < 1e-6);
        assert!(report.discarded > 9.9);

        // Nothing was queued: a zero delta afterwards integrates nothing.
        assert_eq!(world.step(DT, 0.0, 3).substeps, 0);
        assert!((world.simulated_time() - 3.0 * DT as f64).abs() < 1e-6);
    }

    #[test]
    fn partial_substeps_accumulate() {
        let (mut world, _, _) = scene();
        assert_eq!(world.step(DT, DT * 0.6, 3).substeps, 0);
        assert_eq!(world.step(DT, DT * 0.6, 3).substeps, 1);
    }

    #[test]
    fn gravity_pulls_dynamic_body_down() {
        let (mut world, _, gift) = scene();
        for _ in 0..5 {
            world.step(DT, DT, 3);
        }
        assert!(world.body(gift).unwrap().position.y < 2.0);
    }

    #[test]
    fn ground_is_never_displaced() {
        let (mut world, ground, _) = scene();
        let before = world.body(ground).unwrap();
        for _ in 0..240 {
            world.step(DT, DT, 3);
        }
        let after = world.body(ground).unwrap();
        assert!(after.fixed);
        assert_eq!(after.position, before.position);
        assert_eq!(after.rotation, before.rotation);
    }

    #[test]
    fn box_settles_above_ground() {
        let (mut world, _, gift) = scene();
        let mut contact_seen = false;
        for _ in 0..(20 * 60) {
            world.step(DT, DT, 3);
            let y = world.body(gift).unwrap().position.y;
            // Half extent is 1, so the resting centre sits at y = 1.
            if y < 1.05 {
                contact_seen = true;
            }
            if contact_seen {
                assert!(y > 0.85, "box sank into the ground: y = {y}");
            }
        }
        let state = world.body(gift).unwrap();
        assert!(contact_seen);
        assert!(state.speed() < 0.05, "still moving: {}", state.speed());
        assert!((state.position.y - 1.0).abs() < 0.05, "rest height {}", state.position.y);
    }

    #[test]
    fn reset_body_stops_motion() {
        let (mut world, _, gift) = scene();
        for _ in 0..20 {
            world.step(DT, DT, 3);
        }
        world.reset_body(gift, Vec3::new(0.0, 5.0, 0.0)).unwrap();
        let state = world.body(gift).unwrap();
        assert_eq!(state.position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(state.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn invalid_step_parameters_are_a_no_op() {
        let (mut world, _, _) = scene();
        assert_eq!(world.step(0.0, 1.0, 3), StepReport::default());
        assert_eq!(world.step(DT, 1.0, 0), StepReport::default());
    }
}
