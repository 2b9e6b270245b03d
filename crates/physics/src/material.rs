use crate::PhysicsError;

/// Friction and restitution shared by every contact pair in the world.
///
/// Both fields are constrained to `[0, 1]`; construct through [`ContactMaterial::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactMaterial {
    friction: f32,
    restitution: f32,
}

impl ContactMaterial {
    pub fn new(friction: f32, restitution: f32) -> Result<Self, PhysicsError> {
        Ok(Self {
            friction: unit_range("friction", friction)?,
            restitution: unit_range("restitution", restitution)?,
        })
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }
}

impl Default for ContactMaterial {
    fn default() -> Self {
        Self {
            friction: 0.1,
            restitution: 0.7,
        }
    }
}

fn unit_range(name: &'static str, value: f32) -> Result<f32, PhysicsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(PhysicsError::OutOfUnitRange { name, value })
    }
}

/// Substep granularity and cap for [`crate::PhysicsWorld::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepConfig {
    fixed_time_step: f32,
    max_substeps: u32,
}

impl StepConfig {
    pub fn new(fixed_time_step: f32, max_substeps: u32) -> Result<Self, PhysicsError> {
        if !fixed_time_step.is_finite() || fixed_time_step <= 0.0 {
            return Err(PhysicsError::InvalidTimeStep(fixed_time_step));
        }
        if max_substeps == 0 {
            return Err(PhysicsError::ZeroSubsteps);
        }
        Ok(Self {
            fixed_time_step,
            max_substeps,
        })
    }

    pub fn fixed_time_step(&self) -> f32 {
        self.fixed_time_step
    }

    pub fn max_substeps(&self) -> u32 {
        self.max_substeps
    }

    /// Largest slice of simulated time a single step call can cover.
    pub fn max_advance(&self) -> f32 {
        self.fixed_time_step * self.max_substeps as f32
    }
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: 1.0 / 60.0,
            max_substeps: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_material_matches_scene() {
        let m = ContactMaterial::default();
        assert_eq!(m.friction(), 0.1);
        assert_eq!(m.restitution(), 0.7);
    }

    #[test]
    fn material_rejects_out_of_range() {
        assert!(ContactMaterial::new(1.5, 0.5).is_err());
        assert_eq!(
            ContactMaterial::new(0.5, -0.1),
            Err(PhysicsError::OutOfUnitRange {
                name: "restitution",
                value: -0.1
            })
        );
        assert!(ContactMaterial::new(f32::NAN, 0.5).is_err());
        assert!(ContactMaterial::new(0.0, 1.0).is_ok());
    }

    #[test]
    fn step_config_validation() {
        assert!(StepConfig::new(0.0, 3).is_err());
        assert!(StepConfig::new(-1.0, 3).is_err());
        assert_eq!(StepConfig::new(1.0 / 60.0, 0), Err(PhysicsError::ZeroSubsteps));
        let cfg = StepConfig::default();
        assert!((cfg.max_advance() - 0.05).abs() < 1e-6);
    }
}
