use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use giftbox_assets::{
    Asset, AssetLoader, AssetStore, LoadState, Model, Pending, PendingModel, PendingTexture,
    Texture,
};
use giftbox_common::AssetId;
use giftbox_input::{Action, InputMap};
use giftbox_kernel::{Clock, KernelError, Scene, TextureSlot, Visual, World, default_props};
use giftbox_render::OrbitCamera;
use glam::Vec3;

use crate::RuntimeError;
use crate::config::AppConfig;

/// How far the jump action lifts the primary body.
pub const JUMP_HEIGHT: f32 = 3.0;

/// Where an optional model or texture load stands.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetStatus {
    /// Nothing configured; the surface keeps its built-in look.
    None,
    Pending(PathBuf),
    Ready { id: AssetId, name: String },
    /// The load failed; the surface falls back to its built-in look.
    Failed(String),
}

/// Assets resolved this frame that the renderer has not seen yet.
#[derive(Debug, Default)]
pub(crate) struct Uploads {
    pub model: Option<Arc<Model>>,
    pub textures: Vec<Arc<Texture>>,
}

/// Everything the synchronization loop reads and writes, owned by the host.
pub struct AppState {
    pub scene: Scene,
    pub camera: OrbitCamera,
    pub clock: Clock,
    pub input: InputMap,
    pub show_debug_panel: bool,
    assets: AssetStore,
    pending_model: Option<PendingModel>,
    pending_textures: Vec<(TextureSlot, PendingTexture)>,
    model: AssetStatus,
    textures: BTreeMap<TextureSlot, AssetStatus>,
    fallback_visual: Visual,
    pending_viewport: Option<(u32, u32)>,
    frames: u64,
}

impl AppState {
    /// Build the scene from `config` and start the model and texture loads,
    /// if any.
    pub fn new(config: &AppConfig, clock: Clock) -> Result<Self, RuntimeError> {
        config.validate()?;
        let world = World::new(config.world_config()?)?;
        let mut scene = Scene::new(world);
        scene.light = config.orbit_light();
        scene.props = default_props(config.floor_tint());

        let loader = AssetLoader::new();
        let primary = scene.world.primary().id();
        let fallback_visual = scene.world.primary().visual();
        let (pending_model, model) = match &config.model {
            Some(path) => {
                scene.world.set_visual(primary, Visual::Hidden)?;
                (
                    Some(loader.load_model(path)),
                    AssetStatus::Pending(path.clone()),
                )
            }
            None => (None, AssetStatus::None),
        };

        let mut pending_textures = Vec::new();
        let mut textures = BTreeMap::new();
        for slot in TextureSlot::ALL {
            let status = match config.textures.path(slot) {
                Some(path) => {
                    pending_textures.push((slot, loader.load_texture(path)));
                    AssetStatus::Pending(path.to_path_buf())
                }
                None => AssetStatus::None,
            };
            textures.insert(slot, status);
        }

        tracing::info!(
            entities = scene.world.entity_count(),
            model = ?config.model,
            textures = pending_textures.len(),
            "scene ready"
        );

        Ok(Self {
            scene,
            camera: config.camera(),
            clock,
            input: InputMap::default(),
            show_debug_panel: true,
            assets: AssetStore::new(),
            pending_model,
            pending_textures,
            model,
            textures,
            fallback_visual,
            pending_viewport: Some((config.window.width, config.window.height)),
            frames: 0,
        })
    }

    pub fn model_status(&self) -> &AssetStatus {
        &self.model
    }

    pub fn texture_status(&self, slot: TextureSlot) -> &AssetStatus {
        self.textures.get(&slot).unwrap_or(&AssetStatus::None)
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    /// Frames completed by [`crate::tick`].
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Block until every configured load resolves. Results are applied at
    /// the start of the next frame, like polled ones.
    pub fn wait_for_assets(&mut self) {
        if let Some(pending) = &mut self.pending_model {
            pending.wait();
        }
        for (_, pending) in &mut self.pending_textures {
            pending.wait();
        }
    }

    /// Apply a discrete action. Called between frames.
    pub fn handle_action(&mut self, action: Action) -> Result<(), KernelError> {
        match action {
            Action::Spawn => {
                self.scene.world.spawn()?;
            }
            Action::Jump => {
                let primary = self.scene.world.primary().id();
                self.scene.world.nudge(primary, Vec3::Y * JUMP_HEIGHT)?;
                tracing::info!(height = JUMP_HEIGHT, "primary jumped");
            }
            Action::ToggleDebugPanel => {
                self.show_debug_panel = !self.show_debug_panel;
                tracing::debug!(visible = self.show_debug_panel, "debug panel toggled");
            }
            Action::Resize { width, height } => {
                if width == 0 || height == 0 {
                    tracing::debug!(width, height, "ignoring resize to an empty surface");
                    return Ok(());
                }
                self.camera.set_viewport(width, height);
                self.pending_viewport = Some((width, height));
                tracing::info!(width, height, "viewport resized");
            }
            Action::Noop => {}
        }
        Ok(())
    }

    /// Look up `key` in the input map and apply its action. Unbound keys do
    /// nothing.
    pub fn handle_key(&mut self, key: &str) -> Result<Action, KernelError> {
        let action = self.input.action_for(key);
        self.handle_action(action)?;
        Ok(action)
    }

    pub(crate) fn take_viewport(&mut self) -> Option<(u32, u32)> {
        self.pending_viewport.take()
    }

    pub(crate) fn finish_frame(&mut self) {
        self.frames += 1;
    }

    /// Check outstanding loads without blocking. Returns what the frame
    /// that resolved them should upload.
    pub(crate) fn poll_assets(&mut self) -> Uploads {
        let mut uploads = Uploads::default();

        if let Some(resolved) = self.pending_model.as_mut().and_then(resolve) {
            self.pending_model = None;
            let primary = self.scene.world.primary().id();
            match resolved {
                Ok(model) => {
                    let id = self.assets.insert(Arc::clone(&model));
                    if let Err(e) = self.scene.world.set_visual(primary, Visual::Model(id)) {
                        tracing::warn!(error = %e, "could not attach model to primary");
                    }
                    self.model = AssetStatus::Ready {
                        id,
                        name: model.name.clone(),
                    };
                    uploads.model = Some(model);
                }
                Err(reason) => {
                    tracing::warn!(%reason, "continuing without model");
                    if let Err(e) = self.scene.world.set_visual(primary, self.fallback_visual) {
                        tracing::warn!(error = %e, "could not restore primary visual");
                    }
                    self.model = AssetStatus::Failed(reason);
                }
            }
        }

        let mut still_pending = Vec::with_capacity(self.pending_textures.len());
        for (slot, mut pending) in std::mem::take(&mut self.pending_textures) {
            let Some(resolved) = resolve(&mut pending) else {
                still_pending.push((slot, pending));
                continue;
            };
            let status = match resolved {
                Ok(texture) => {
                    let id = self.assets.insert_texture(Arc::clone(&texture));
                    if self.scene.set_texture(slot, Some(id)) {
                        tracing::info!(slot = slot.name(), texture = %texture.name, "texture applied");
                    } else {
                        tracing::warn!(slot = slot.name(), "scene has no surface for texture");
                    }
                    let status = AssetStatus::Ready {
                        id,
                        name: texture.name.clone(),
                    };
                    uploads.textures.push(texture);
                    status
                }
                Err(reason) => {
                    tracing::warn!(slot = slot.name(), %reason, "keeping flat colour");
                    AssetStatus::Failed(reason)
                }
            };
            self.textures.insert(slot, status);
        }
        self.pending_textures = still_pending;

        uploads
    }
}

/// The finished result of a load, or `None` while it is still running.
fn resolve<T: Asset>(pending: &mut Pending<T>) -> Option<Result<Arc<T>, String>> {
    match pending.poll() {
        LoadState::Pending => None,
        LoadState::Loaded(asset) => Some(Ok(Arc::clone(asset))),
        LoadState::Failed(err) => Some(Err(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FloorConfig, TextureConfig};
    use giftbox_kernel::PRIMARY_BOX_GREY;

    fn state() -> AppState {
        AppState::new(&AppConfig::default(), Clock::manual()).unwrap()
    }

    #[test]
    fn starts_with_box_primary_and_no_model() {
        let state = state();
        assert_eq!(state.model_status(), &AssetStatus::None);
        assert_eq!(state.texture_status(TextureSlot::Box), &AssetStatus::None);
        assert_eq!(state.scene.world.entity_count(), 1);
        assert!(matches!(state.scene.world.primary().visual(), Visual::Box { .. }));
        assert!(state.show_debug_panel);
    }

    #[test]
    fn spawn_action_adds_entities() {
        let mut state = state();
        state.handle_action(Action::Spawn).unwrap();
        state.handle_action(Action::Spawn).unwrap();
        assert_eq!(state.scene.world.entity_count(), 3);
        assert_eq!(state.scene.world.spawned_count(), 2);
    }

    #[test]
    fn jump_lifts_primary() {
        let mut state = state();
        let id = state.scene.world.primary().id();
        let before = state.scene.world.body_state(id).unwrap().position;
        state.handle_action(Action::Jump).unwrap();
        let after = state.scene.world.body_state(id).unwrap().position;
        assert_eq!(after, before + Vec3::new(0.0, JUMP_HEIGHT, 0.0));
    }

    #[test]
    fn keys_route_through_input_map() {
        let mut state = state();
        assert_eq!(state.handle_key("Space").unwrap(), Action::Spawn);
        assert_eq!(state.handle_key("KeyQ").unwrap(), Action::Noop);
        assert_eq!(state.handle_key("F1").unwrap(), Action::ToggleDebugPanel);
        assert_eq!(state.scene.world.entity_count(), 2);
        assert!(!state.show_debug_panel);
    }

    #[test]
    fn resize_updates_camera_and_queues_viewport() {
        let mut state = state();
        state.take_viewport();
        state
            .handle_action(Action::Resize {
                width: 800,
                height: 400,
            })
            .unwrap();
        assert_eq!(state.camera.aspect, 2.0);
        assert_eq!(state.take_viewport(), Some((800, 400)));
    }

    #[test]
    fn empty_resize_is_ignored() {
        let mut state = state();
        state.take_viewport();
        let aspect = state.camera.aspect;
        state
            .handle_action(Action::Resize {
                width: 0,
                height: 0,
            })
            .unwrap();
        assert_eq!(state.camera.aspect, aspect);
        assert_eq!(state.take_viewport(), None);
    }

    #[test]
    fn configured_model_hides_primary_until_loaded() {
        let config = AppConfig {
            model: Some("/definitely/not/here.glb".into()),
            ..AppConfig::default()
        };
        let state = AppState::new(&config, Clock::manual()).unwrap();
        assert!(matches!(state.model_status(), AssetStatus::Pending(_)));
        assert_eq!(state.scene.world.primary().visual(), Visual::Hidden);
    }

    #[test]
    fn failed_model_restores_box() {
        let config = AppConfig {
            model: Some("/definitely/not/here.glb".into()),
            ..AppConfig::default()
        };
        let mut state = AppState::new(&config, Clock::manual()).unwrap();
        state.wait_for_assets();
        assert!(state.poll_assets().model.is_none());
        assert!(matches!(state.model_status(), AssetStatus::Failed(_)));
        assert!(matches!(state.scene.world.primary().visual(), Visual::Box { .. }));
        assert!(state.assets().is_empty());
    }

    #[test]
    fn failed_texture_keeps_flat_colours() {
        let config = AppConfig {
            textures: TextureConfig {
                box_map: Some("/definitely/not/here.jpg".into()),
                floor_map: Some("/definitely/not/here.png".into()),
            },
            floor: FloorConfig {
                tint: Some([0.2, 0.4, 0.6]),
            },
            ..AppConfig::default()
        };
        let mut state = AppState::new(&config, Clock::manual()).unwrap();
        assert!(matches!(
            state.texture_status(TextureSlot::Floor),
            AssetStatus::Pending(_)
        ));
        state.wait_for_assets();
        let uploads = state.poll_assets();

        assert!(uploads.textures.is_empty());
        for slot in TextureSlot::ALL {
            assert!(matches!(state.texture_status(slot), AssetStatus::Failed(_)));
        }
        assert_eq!(state.scene.primary_surface().color, PRIMARY_BOX_GREY);
        let floor = state.scene.props.iter().find(|p| p.name == "floor").unwrap();
        assert_eq!(floor.surface().color, [0.2, 0.4, 0.6, 1.0]);
        assert_eq!(floor.texture, None);
        assert_eq!(state.assets().texture_count(), 0);
    }
}
