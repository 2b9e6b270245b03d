use glam::Vec3;

/// Position on the sun's analytic orbit at `elapsed` seconds.
pub fn orbit_position(elapsed: f64, radius: f32, height: f32) -> Vec3 {
    Vec3::new(
        (elapsed.sin() as f32) * radius,
        height,
        (elapsed.cos() as f32) * radius,
    )
}

/// Point light riding on the visible sun sphere.
///
/// Visual-only: driven by elapsed time, never by physics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitLight {
    pub radius: f32,
    pub height: f32,
    pub sun_radius: f32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vec3,
}

impl Default for OrbitLight {
    fn default() -> Self {
        let radius = 4.0;
        let height = 2.0;
        Self {
            radius,
            height,
            sun_radius: 0.3,
            color: [1.0, 1.0, 0.0],
            intensity: 0.5,
            position: orbit_position(0.0, radius, height),
        }
    }
}

impl OrbitLight {
    pub fn update(&mut self, elapsed: f64) {
        self.position = orbit_position(elapsed, self.radius, self.height);
    }
}
