use glam::{Mat4, Vec3};
use std::f32::consts::PI;

/// Orbit camera circling a target, with damped rotate and zoom input.
///
/// Input accumulates as pending deltas; each [`OrbitCamera::update`] applies a
/// `damping` fraction of what is pending and decays the rest, so motion eases
/// out over several frames.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    /// Azimuth around +Y, measured from +Z.
    pub theta: f32,
    /// Polar angle from +Y.
    pub phi: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub damping: f32,
    pub sensitivity: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_zoom: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_at(Vec3::new(0.0, 4.0, 6.0), Vec3::ZERO)
    }
}

impl OrbitCamera {
    const PHI_LIMIT: f32 = 1e-3;

    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let radius = offset.length().max(1e-3);
        Self {
            target,
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            fov: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
            damping: 0.05,
            sensitivity: 0.005,
            min_radius: 1.0,
            max_radius: 50.0,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_zoom: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        self.target
            + self.radius
                * Vec3::new(
                    sin_phi * self.theta.sin(),
                    self.phi.cos(),
                    sin_phi * self.theta.cos(),
                )
    }

    /// Queue a drag of `dx`, `dy` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.pending_theta -= dx * self.sensitivity;
        self.pending_phi -= dy * self.sensitivity;
    }

    /// Queue a zoom; positive moves toward the target.
    pub fn zoom(&mut self, amount: f32) {
        self.pending_zoom += amount;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// Advance the damping state by one frame. Returns true while the camera
    /// is still moving.
    pub fn update(&mut self) -> bool {
        let d = self.damping.clamp(0.0, 1.0);
        self.theta += self.pending_theta * d;
        self.phi = (self.phi + self.pending_phi * d).clamp(Self::PHI_LIMIT, PI - Self::PHI_LIMIT);
        self.radius = (self.radius * (1.0 - self.pending_zoom * d))
            .clamp(self.min_radius, self.max_radius);

        self.pending_theta *= 1.0 - d;
        self.pending_phi *= 1.0 - d;
        self.pending_zoom *= 1.0 - d;

        let moving = self.pending_theta.abs() > 1e-6
            || self.pending_phi.abs() > 1e-6
            || self.pending_zoom.abs() > 1e-6;
        if !moving {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
            self.pending_zoom = 0.0;
        }
        moving
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}
