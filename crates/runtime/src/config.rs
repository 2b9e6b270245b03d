use rand::Rng;
use std::path::{Path, PathBuf};

use giftbox_kernel::{
    EntityDesc, OrbitLight, SpawnPolicy, SyncPolicy, TextureSlot, Visual, WorldConfig,
};
use giftbox_physics::{ContactMaterial, GRAVITY, PhysicsError, Shape, StepConfig};
use giftbox_render::OrbitCamera;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Errors from loading or validating an [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Physics(#[from] PhysicsError),
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f32,
    },
    #[error("spawn cap must be at least 1")]
    ZeroSpawnCap,
}

/// Rigid-body world parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    /// Constant acceleration applied to every dynamic body.
    pub gravity: Vec3,
    /// Contact friction, in `[0, 1]`.
    pub friction: f32,
    /// Contact restitution, in `[0, 1]`.
    pub restitution: f32,
    /// Seconds per substep.
    pub fixed_time_step: f32,
    /// Substep cap per frame.
    pub max_substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            friction: 0.1,
            restitution: 0.7,
            fixed_time_step: 1.0 / 60.0,
            max_substeps: 3,
        }
    }
}

/// The startup box (the "gift").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrimaryConfig {
    pub position: Vec3,
    /// Collision box half extent.
    pub half_extent: f32,
    pub mass: f32,
    /// Added to the body position when syncing the mesh.
    pub visual_offset: Vec3,
    /// Half extent of the box drawn when no model is shown.
    pub visual_half_extent: f32,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 0.0),
            half_extent: 1.0,
            mass: 1.0,
            visual_offset: Vec3::new(0.0, 0.5, 0.0),
            visual_half_extent: 0.5,
        }
    }
}

/// The spawn interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawnConfig {
    pub position: Vec3,
    pub half_extent: f32,
    pub mass: f32,
    /// Added to each spawned body position when syncing its mesh.
    pub visual_offset: Vec3,
    /// Spawned entities alive at once before the oldest is recycled.
    pub cap: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        let policy = SpawnPolicy::default();
        Self {
            position: policy.position,
            half_extent: 0.5,
            mass: policy.mass,
            visual_offset: policy.sync.offset,
            cap: policy.cap,
        }
    }
}

/// The orbiting sun and its point light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightConfig {
    pub radius: f32,
    pub height: f32,
    pub sun_radius: f32,
    pub intensity: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        let light = OrbitLight::default();
        Self {
            radius: light.radius,
            height: light.height,
            sun_radius: light.sun_radius,
            intensity: light.intensity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Fraction of pending orbit input applied per frame, in `(0, 1]`.
    pub damping: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 4.0, 6.0),
            target: Vec3::ZERO,
            fov_degrees: 75.0,
            damping: 0.05,
        }
    }
}

/// The 9x9 floor plane under the mirror.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FloorConfig {
    /// RGB tint in `[0, 1]`. Unset picks a random tint at startup.
    pub tint: Option<[f32; 3]>,
}

/// Image files for scene surfaces. Each loads in the background; a surface
/// keeps its flat colour until its image arrives, and for good if it fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextureConfig {
    /// Colour map for the primary box.
    pub box_map: Option<PathBuf>,
    /// Colour map for the floor, multiplied by its tint.
    pub floor_map: Option<PathBuf>,
}

impl TextureConfig {
    pub fn path(&self, slot: TextureSlot) -> Option<&Path> {
        match slot {
            TextureSlot::Box => self.box_map.as_deref(),
            TextureSlot::Floor => self.floor_map.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "giftbox".into(),
            width: 1280,
            height: 720,
        }
    }
}

/// Full application configuration. Every field has a default, so a YAML file
/// only needs the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub physics: PhysicsConfig,
    pub primary: PrimaryConfig,
    pub spawn: SpawnConfig,
    pub light: LightConfig,
    pub camera: CameraConfig,
    pub window: WindowConfig,
    pub floor: FloorConfig,
    pub textures: TextureConfig,
    /// glTF/GLB file drawn in place of the primary box once loaded.
    pub model: Option<PathBuf>,
}

impl AppConfig {
    /// Read, parse, and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&text)?;
        tracing::info!(path = %path.as_ref().display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world_config()?;
        let light = &self.light;
        non_negative("light.radius", light.radius)?;
        positive("light.sun_radius", light.sun_radius)?;
        non_negative("light.intensity", light.intensity)?;
        let camera = &self.camera;
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(ConfigError::OutOfRange {
                field: "camera.fov_degrees",
                expected: "in (0, 180)",
                value: camera.fov_degrees,
            });
        }
        if !(camera.damping > 0.0 && camera.damping <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "camera.damping",
                expected: "in (0, 1]",
                value: camera.damping,
            });
        }
        if let Some(tint) = self.floor.tint {
            for value in tint {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::OutOfRange {
                        field: "floor.tint",
                        expected: "in [0, 1]",
                        value,
                    });
                }
            }
        }
        if camera.position.distance(camera.target) < 1e-3 {
            return Err(ConfigError::OutOfRange {
                field: "camera.position",
                expected: "away from camera.target",
                value: camera.position.distance(camera.target),
            });
        }
        Ok(())
    }

    /// Typed world parameters, rejecting anything the world cannot use.
    pub fn world_config(&self) -> Result<WorldConfig, ConfigError> {
        let physics = &self.physics;
        finite("physics.gravity", physics.gravity)?;
        let material = ContactMaterial::new(physics.friction, physics.restitution)?;
        let step = StepConfig::new(physics.fixed_time_step, physics.max_substeps)?;

        let primary = &self.primary;
        finite("primary.position", primary.position)?;
        finite("primary.visual_offset", primary.visual_offset)?;
        positive("primary.half_extent", primary.half_extent)?;
        positive("primary.mass", primary.mass)?;
        positive("primary.visual_half_extent", primary.visual_half_extent)?;

        let spawn = &self.spawn;
        finite("spawn.position", spawn.position)?;
        finite("spawn.visual_offset", spawn.visual_offset)?;
        positive("spawn.half_extent", spawn.half_extent)?;
        positive("spawn.mass", spawn.mass)?;
        if spawn.cap == 0 {
            return Err(ConfigError::ZeroSpawnCap);
        }

        Ok(WorldConfig {
            gravity: physics.gravity,
            material,
            step,
            primary: EntityDesc {
                sync: SyncPolicy {
                    offset: primary.visual_offset,
                    orientation: true,
                },
                visual: Visual::Box {
                    half_extents: Vec3::splat(primary.visual_half_extent),
                },
                ..EntityDesc::new(primary.position, Shape::cube(primary.half_extent), primary.mass)
            },
            spawn: SpawnPolicy {
                position: spawn.position,
                shape: Shape::cube(spawn.half_extent),
                mass: spawn.mass,
                sync: SyncPolicy {
                    offset: spawn.visual_offset,
                    orientation: true,
                },
                cap: spawn.cap,
            },
            ..WorldConfig::default()
        })
    }

    pub fn orbit_light(&self) -> OrbitLight {
        let mut light = OrbitLight {
            radius: self.light.radius,
            height: self.light.height,
            sun_radius: self.light.sun_radius,
            intensity: self.light.intensity,
            ..OrbitLight::default()
        };
        light.update(0.0);
        light
    }

    /// RGBA floor tint: the configured one, or a fresh random colour.
    pub fn floor_tint(&self) -> [f32; 4] {
        let [r, g, b] = self.floor.tint.unwrap_or_else(|| {
            let mut rng = rand::thread_rng();
            [rng.r#gen(), rng.r#gen(), rng.r#gen()]
        });
        [r, g, b, 1.0]
    }

    pub fn camera(&self) -> OrbitCamera {
        let mut camera = OrbitCamera::looking_at(self.camera.position, self.camera.target);
        camera.fov = self.camera.fov_degrees.to_radians();
        camera.damping = self.camera.damping;
        camera.set_viewport(self.window.width, self.window.height);
        camera
    }
}

fn finite(field: &'static str, value: Vec3) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "finite",
            value: value.length(),
        })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "positive",
            value,
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "non-negative",
            value,
        })
    }
}
