use std::collections::BTreeMap;
use std::fmt::Write;

use giftbox_assets::{Model, Texture};
use giftbox_common::AssetId;
use giftbox_kernel::{Origin, PropKind, Scene, Visual};

use crate::camera::OrbitCamera;

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// A renderer reads the scene and the camera and produces output. It never
/// mutates the scene; world truth is kernel-owned.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame of the scene as seen from `camera`.
    fn render(&mut self, scene: &Scene, camera: &OrbitCamera) -> Self::Output;

    /// The drawable surface changed size.
    fn set_viewport_size(&mut self, width: u32, height: u32);

    /// Make a loaded model drawable under its asset id.
    fn upload_model(&mut self, model: &Model);

    /// Make a decoded texture sampleable under its asset id.
    fn upload_texture(&mut self, texture: &Texture);
}

/// Debug text renderer: a readable dump of the scene per frame.
///
/// Useful for the CLI, logging, and testing the render interface.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    viewport: (u32, u32),
    frames: u64,
    models: BTreeMap<AssetId, String>,
    textures: BTreeMap<AssetId, String>,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    fn texture_suffix(&self, texture: Option<AssetId>) -> String {
        match texture {
            Some(id) => match self.textures.get(&id) {
                Some(name) => format!(" textured {name}"),
                None => " textured ?".to_string(),
            },
            None => String::new(),
        }
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&mut self, scene: &Scene, camera: &OrbitCamera) -> String {
        self.frames += 1;
        let world = &scene.world;
        let eye = camera.position();
        let sun = scene.light.position;

        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Frame {} (sim t={:.3}s, substeps={}) ===",
            self.frames,
            world.physics().simulated_time(),
            world.physics().substeps_total()
        );
        let _ = writeln!(
            out,
            "Entities: {} (spawned {})",
            world.entity_count(),
            world.spawned_count()
        );
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) fov={:.0} viewport={}x{}",
            eye.x,
            eye.y,
            eye.z,
            camera.fov.to_degrees(),
            self.viewport.0,
            self.viewport.1
        );
        let _ = writeln!(out, "Sun: pos=({:.2}, {:.2}, {:.2})", sun.x, sun.y, sun.z);

        for prop in &scene.props {
            let kind = match prop.kind {
                PropKind::Plane { size } => format!("plane {size}x{size}"),
                PropKind::Mirror { size } => format!("mirror {size}x{size}"),
            };
            let _ = writeln!(
                out,
                "  prop {} {} y={:.2}{}",
                prop.name,
                kind,
                prop.transform.position.y,
                self.texture_suffix(prop.texture)
            );
        }

        for entity in world.entities() {
            let p = entity.mesh().position;
            let origin = match entity.origin() {
                Origin::Primary => "primary",
                Origin::Spawned => "spawned",
                Origin::Added => "added",
            };
            let visual = match entity.visual() {
                Visual::Box { .. } if entity.origin() == Origin::Primary => {
                    format!("box{}", self.texture_suffix(scene.primary_surface().texture))
                }
                Visual::Box { .. } => "box".to_string(),
                Visual::Sphere { .. } => "sphere".to_string(),
                Visual::Model(id) => self
                    .models
                    .get(&id)
                    .map(|name| format!("model {name}"))
                    .unwrap_or_else(|| "model ?".to_string()),
                Visual::Hidden => "hidden".to_string(),
            };
            let _ = writeln!(
                out,
                "  [{}] {origin} {visual} pos=({:.2}, {:.2}, {:.2})",
                entity.id().short(),
                p.x,
                p.y,
                p.z
            );
        }

        out
    }

    fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn upload_model(&mut self, model: &Model) {
        tracing::debug!(model = %model.name, "model registered for text output");
        self.models.insert(model.id, model.name.clone());
    }

    fn upload_texture(&mut self, texture: &Texture) {
        tracing::debug!(texture = %texture.name, "texture registered for text output");
        self.textures.insert(texture.id, texture.name.clone());
    }
}
