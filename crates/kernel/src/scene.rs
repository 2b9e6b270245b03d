use std::f32::consts::FRAC_PI_2;

use giftbox_common::{AssetId, Transform};
use glam::{Quat, Vec3};

use crate::light::OrbitLight;
use crate::world::World;

/// Static, purely visual scene furniture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropKind {
    /// Flat textured plane, `size` by `size`.
    Plane { size: f32 },
    /// Planar reflector, `size` by `size`. Reflects dynamic meshes across its plane.
    Mirror { size: f32 },
}

/// Tint of the floor when none is configured.
pub const DEFAULT_FLOOR_TINT: [f32; 4] = [0.45, 0.3, 0.6, 1.0];

/// Flat colour of the primary box while it has no texture.
pub const PRIMARY_BOX_GREY: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

/// Scene surfaces that can carry an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureSlot {
    /// Colour map of the primary box.
    Box,
    /// Colour map of the floor plane, multiplied by its tint.
    Floor,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 2] = [TextureSlot::Box, TextureSlot::Floor];

    pub fn name(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Floor => "floor",
        }
    }
}

/// Colour and optional texture of a drawn surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub color: [f32; 4],
    pub texture: Option<AssetId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub name: String,
    pub kind: PropKind,
    pub transform: Transform,
    pub color: [f32; 4],
    pub texture: Option<AssetId>,
}

impl Prop {
    /// A horizontal prop (plane geometry rotated to face +Y) at `height`.
    pub fn horizontal(name: &str, kind: PropKind, height: f32, color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Transform {
                position: Vec3::new(0.0, height, 0.0),
                rotation: Quat::from_rotation_x(-FRAC_PI_2),
                ..Transform::default()
            },
            color,
            texture: None,
        }
    }

    pub fn surface(&self) -> Surface {
        Surface {
            color: self.color,
            texture: self.texture,
        }
    }
}

/// Lights that do not move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLighting {
    pub ambient: f32,
    pub directional_position: Vec3,
    pub directional_intensity: f32,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            ambient: 1.0,
            directional_position: Vec3::new(3.0, 3.0, 3.0),
            directional_intensity: 0.5,
        }
    }
}

/// The visual scene graph handed to renderers: the world's meshes plus props
/// and lights.
pub struct Scene {
    pub world: World,
    pub light: OrbitLight,
    pub props: Vec<Prop>,
    pub lighting: SceneLighting,
    /// Colour map of the primary box, once loaded.
    pub box_texture: Option<AssetId>,
}

impl Scene {
    pub fn new(world: World) -> Self {
        Self {
            world,
            light: OrbitLight::default(),
            props: default_props(DEFAULT_FLOOR_TINT),
            lighting: SceneLighting::default(),
            box_texture: None,
        }
    }

    /// The primary box: plain grey until its texture arrives, then the
    /// texture unmodified.
    pub fn primary_surface(&self) -> Surface {
        match self.box_texture {
            Some(id) => Surface {
                color: [1.0; 4],
                texture: Some(id),
            },
            None => Surface {
                color: PRIMARY_BOX_GREY,
                texture: None,
            },
        }
    }

    /// Attach a loaded texture to `slot`. Returns false when the scene has
    /// no surface for it.
    pub fn set_texture(&mut self, slot: TextureSlot, id: Option<AssetId>) -> bool {
        match slot {
            TextureSlot::Box => {
                self.box_texture = id;
                true
            }
            TextureSlot::Floor => match self
                .props
                .iter_mut()
                .find(|p| matches!(p.kind, PropKind::Plane { .. }))
            {
                Some(floor) => {
                    floor.texture = id;
                    true
                }
                None => false,
            },
        }
    }
}

/// The tinted floor just under a mirror at y = 1.
pub fn default_props(floor_tint: [f32; 4]) -> Vec<Prop> {
    vec![
        Prop::horizontal("floor", PropKind::Plane { size: 9.0 }, 0.99, floor_tint),
        Prop::horizontal(
            "mirror",
            PropKind::Mirror { size: 5.0 },
            1.0,
            [0.5, 0.5, 0.5, 1.0],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldConfig;

    #[test]
    fn horizontal_prop_faces_up() {
        let prop = Prop::horizontal("p", PropKind::Plane { size: 1.0 }, 1.0, [1.0; 4]);
        let normal = prop.transform.rotation * Vec3::Z;
        assert!(normal.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn default_scene_has_floor_and_mirror() {
        let scene = Scene::new(World::new(WorldConfig::default()).unwrap());
        assert_eq!(scene.props.len(), 2);
        assert!(scene
            .props
            .iter()
            .any(|p| matches!(p.kind, PropKind::Mirror { size } if size == 5.0)));
        assert_eq!(scene.lighting.ambient, 1.0);
        assert_eq!(scene.primary_surface().color, PRIMARY_BOX_GREY);
    }

    #[test]
    fn textures_attach_to_their_slots() {
        let mut scene = Scene::new(World::new(WorldConfig::default()).unwrap());
        assert!(scene.set_texture(TextureSlot::Box, Some(AssetId(1))));
        assert!(scene.set_texture(TextureSlot::Floor, Some(AssetId(2))));

        assert_eq!(
            scene.primary_surface(),
            Surface {
                color: [1.0; 4],
                texture: Some(AssetId(1)),
            }
        );
        let floor = scene.props.iter().find(|p| p.name == "floor").unwrap();
        assert_eq!(floor.texture, Some(AssetId(2)));
        assert_eq!(floor.color, DEFAULT_FLOOR_TINT);
        let mirror = scene.props.iter().find(|p| p.name == "mirror").unwrap();
        assert_eq!(mirror.texture, None);

        scene.props.clear();
        assert!(!scene.set_texture(TextureSlot::Floor, Some(AssetId(2))));
    }
}
