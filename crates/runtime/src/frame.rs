use glam::Vec3;
use serde::Serialize;

use giftbox_render::Renderer;

use crate::app::AppState;

/// What one invocation of [`tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    /// Seconds since the clock started.
    pub elapsed: f64,
    /// Sanitized wall-clock delta fed to physics.
    pub delta: f32,
    pub substeps: u32,
    /// Stalled time dropped by the substep cap.
    pub discarded: f32,
    pub simulated_time: f64,
    pub synced: usize,
    pub entity_count: usize,
    pub light_position: Vec3,
    pub primary_position: Vec3,
    pub model_uploaded: bool,
    pub textures_uploaded: usize,
}

/// One frame of the synchronization loop.
///
/// Reads the clock, moves the sun, steps physics, copies every body pose onto
/// its mesh, eases the camera, and renders. Pending viewport changes and
/// freshly loaded models and textures are handed to the renderer first.
pub fn tick<R: Renderer>(state: &mut AppState, renderer: &mut R) -> (FrameReport, R::Output) {
    let span = tracing::debug_span!("frame", n = state.frames() + 1);
    let _guard = span.enter();

    if let Some((width, height)) = state.take_viewport() {
        renderer.set_viewport_size(width, height);
    }
    let uploads = state.poll_assets();
    if let Some(model) = &uploads.model {
        renderer.upload_model(model);
    }
    for texture in &uploads.textures {
        renderer.upload_texture(texture);
    }

    let time = state.clock.tick();
    state.scene.light.update(time.elapsed);
    let step = state.scene.world.step(time.delta);
    let synced = state.scene.world.sync_meshes();
    state.camera.update();

    if step.discarded > 0.0 {
        tracing::debug!(
            delta = time.delta,
            discarded = step.discarded,
            "substep cap reached, dropping stalled time"
        );
    }

    let output = renderer.render(&state.scene, &state.camera);
    state.finish_frame();

    let world = &state.scene.world;
    let report = FrameReport {
        frame: state.frames(),
        elapsed: time.elapsed,
        delta: time.delta,
        substeps: step.substeps,
        discarded: step.discarded,
        simulated_time: world.physics().simulated_time(),
        synced,
        entity_count: world.entity_count(),
        light_position: state.scene.light.position,
        primary_position: world.primary().mesh().position,
        model_uploaded: uploads.model.is_some(),
        textures_uploaded: uploads.textures.len(),
    };
    tracing::trace!(
        substeps = report.substeps,
        entities = report.entity_count,
        "frame done"
    );
    (report, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AssetStatus;
    use crate::config::{AppConfig, TextureConfig};
    use giftbox_input::Action;
    use giftbox_kernel::{Clock, PRIMARY_BOX_GREY, TextureSlot, Visual, orbit_position};
    use giftbox_render::DebugTextRenderer;
    use std::io::Write;

    const DT: f64 = 1.0 / 60.0;

    fn state() -> AppState {
        AppState::new(&AppConfig::default(), Clock::manual()).unwrap()
    }

    fn run(state: &mut AppState, renderer: &mut DebugTextRenderer, frames: usize) {
        for _ in 0..frames {
            state.clock.advance(DT);
            tick(state, renderer);
        }
    }

    fn assert_synced(state: &AppState) {
        let world = &state.scene.world;
        for e in world.entities() {
            let body = world.body_state(e.id()).unwrap();
            assert_eq!(e.mesh().position, body.position + e.sync().offset);
            assert_eq!(e.mesh().rotation, body.rotation);
        }
    }

    #[test]
    fn zero_delta_still_renders_and_moves_light() {
        let mut state = state();
        let mut renderer = DebugTextRenderer::new();
        state.clock.advance(1.0);
        tick(&mut state, &mut renderer);

        let id = state.scene.world.primary().id();
        let before = state.scene.world.body_state(id).unwrap();
        let (report, output) = tick(&mut state, &mut renderer);

        assert_eq!(report.delta, 0.0);
        assert_eq!(report.substeps, 0);
        assert_eq!(state.scene.world.body_state(id).unwrap(), before);
        assert_eq!(report.light_position, orbit_position(1.0, 4.0, 2.0));
        assert!(output.contains("Frame 2"));
        assert_eq!(renderer.frames_rendered(), 2);
    }

    #[test]
    fn meshes_track_bodies_every_frame() {
        let mut state = state();
        let mut renderer = DebugTextRenderer::new();
        state.handle_action(Action::Spawn).unwrap();
        for _ in 0..120 {
            state.clock.advance(DT);
            let (report, _) = tick(&mut state, &mut renderer);
            assert_eq!(report.synced, state.scene.world.entity_count());
            assert_synced(&state);
        }
    }

    #[test]
    fn long_stall_advances_at_most_the_substep_cap() {
        let mut state = state();
        let mut renderer = DebugTextRenderer::new();
        state.clock.advance(10.0);
        let (report, _) = tick(&mut state, &mut renderer);

        let step = state.scene.world.step_config();
        assert_eq!(report.substeps, step.max_substeps());
        let expected = f64::from(step.fixed_time_step()) * f64::from(step.max_substeps());
        assert!((report.simulated_time - expected).abs() < 1e-9);
        assert!(report.discarded > 9.9);
    }

    #[test]
    fn primary_settles_on_ground_without_sinking() {
        let mut state = state();
        let mut renderer = DebugTextRenderer::new();
        let id = state.scene.world.primary().id();
        for _ in 0..600 {
            state.clock.advance(DT);
            tick(&mut state, &mut renderer);
            let body = state.scene.world.body_state(id).unwrap();
            // Bottom face of the unit half-extent box stays above the plane.
            assert!(body.position.y - 1.0 > -0.05, "sank to {}", body.position.y);
        }
        let body = state.scene.world.body_state(id).unwrap();
        assert!((body.position.y - 1.0).abs() < 0.05);
        assert!(body.speed() < 0.05);
    }

    #[test]
    fn spawns_fall_independently_of_primary() {
        let mut alone = state();
        let mut with_spawns = state();
        let mut renderer = DebugTextRenderer::new();

        with_spawns.handle_action(Action::Spawn).unwrap();
        run(&mut with_spawns, &mut renderer, 30);
        with_spawns.handle_action(Action::Spawn).unwrap();
        run(&mut alone, &mut renderer, 30);

        let ids: Vec<_> = with_spawns.scene.world.entities().map(|e| e.id()).collect();
        assert_eq!(ids.len(), 3);
        let start: Vec<_> = ids
            .iter()
            .map(|id| with_spawns.scene.world.entity(*id).unwrap().mesh().position)
            .collect();

        run(&mut with_spawns, &mut renderer, 30);
        run(&mut alone, &mut renderer, 30);

        for (id, before) in ids.iter().zip(&start).skip(1) {
            let now = with_spawns.scene.world.entity(*id).unwrap().mesh().position;
            assert!(now.y < before.y, "spawned entity did not fall");
        }
        let primary = with_spawns.scene.world.primary().mesh().position;
        let reference = alone.scene.world.primary().mesh().position;
        assert!(primary.abs_diff_eq(reference, 1e-4));
    }

    #[test]
    fn settled_spawn_sits_on_the_mirror() {
        let mut state = state();
        let mut renderer = DebugTextRenderer::new();
        let id = state.scene.world.spawn().unwrap().id();
        run(&mut state, &mut renderer, 600);

        let floor = state
            .scene
            .props
            .iter()
            .map(|p| p.transform.position.y)
            .fold(f32::MIN, f32::max);
        let entity = state.scene.world.entity(id).unwrap();
        let Visual::Box { half_extents } = entity.visual() else {
            panic!("spawned entity is not a box");
        };
        let bottom = entity.mesh().position.y - half_extents.y;
        assert!(bottom >= floor - 0.01, "bottom {bottom} under floor {floor}");
    }

    #[test]
    fn spawn_cap_bounds_entity_count() {
        let config = AppConfig::from_yaml("spawn:\n  cap: 3\n").unwrap();
        let mut state = AppState::new(&config, Clock::manual()).unwrap();
        let mut renderer = DebugTextRenderer::new();
        for _ in 0..10 {
            state.handle_action(Action::Spawn).unwrap();
            run(&mut state, &mut renderer, 5);
        }
        assert_eq!(state.scene.world.entity_count(), 4);
        assert_synced(&state);
    }

    #[test]
    fn resize_reaches_renderer_before_render() {
        let mut state = state();
        let mut renderer = DebugTextRenderer::new();
        tick(&mut state, &mut renderer);
        assert_eq!(renderer.viewport(), (1280, 720));

        state
            .handle_action(Action::Resize {
                width: 640,
                height: 480,
            })
            .unwrap();
        let (_, output) = tick(&mut state, &mut renderer);
        assert!(output.contains("viewport=640x480"));
    }

    #[test]
    fn failed_model_keeps_simulation_running() {
        let config = AppConfig {
            model: Some("/definitely/not/here.glb".into()),
            ..AppConfig::default()
        };
        let mut state = AppState::new(&config, Clock::manual()).unwrap();
        let mut renderer = DebugTextRenderer::new();
        state.wait_for_assets();
        run(&mut state, &mut renderer, 30);

        let (report, _) = tick(&mut state, &mut renderer);
        assert!(!report.model_uploaded);
        assert!(report.primary_position.y < 2.5);
        assert!(matches!(state.scene.world.primary().visual(), Visual::Box { .. }));
    }

    #[test]
    fn failed_textures_keep_simulation_running() {
        let config = AppConfig {
            textures: TextureConfig {
                box_map: Some("/definitely/not/here.jpg".into()),
                floor_map: None,
            },
            ..AppConfig::default()
        };
        let mut state = AppState::new(&config, Clock::manual()).unwrap();
        let mut renderer = DebugTextRenderer::new();
        state.wait_for_assets();
        run(&mut state, &mut renderer, 30);

        let (report, output) = tick(&mut state, &mut renderer);
        assert_eq!(report.textures_uploaded, 0);
        assert!(report.primary_position.y < 2.5);
        assert_eq!(state.scene.primary_surface().color, PRIMARY_BOX_GREY);
        assert!(output.contains("primary box pos="));
    }

    #[test]
    fn loaded_textures_are_uploaded_once_and_applied() {
        let dir = tempfile::tempdir().unwrap();
        let color = dir.path().join("color.png");
        let normal = dir.path().join("normal.png");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([180, 120, 60, 255]))
            .save(&color)
            .unwrap();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([128, 128, 255, 255]))
            .save(&normal)
            .unwrap();

        let config = AppConfig {
            textures: TextureConfig {
                box_map: Some(color),
                floor_map: Some(normal),
            },
            ..AppConfig::default()
        };
        let mut state = AppState::new(&config, Clock::manual()).unwrap();
        let mut renderer = DebugTextRenderer::new();
        state.wait_for_assets();

        state.clock.advance(DT);
        let (first, output) = tick(&mut state, &mut renderer);
        state.clock.advance(DT);
        let (second, _) = tick(&mut state, &mut renderer);

        assert_eq!(first.textures_uploaded, 2);
        assert_eq!(second.textures_uploaded, 0);
        assert_eq!(state.assets().texture_count(), 2);
        assert!(matches!(
            state.texture_status(TextureSlot::Box),
            AssetStatus::Ready { name, .. } if name == "color"
        ));
        assert_eq!(state.scene.primary_surface().color, [1.0; 4]);
        assert!(output.contains("primary box textured color"));
        assert!(output.contains("prop floor plane 9x9 y=0.99 textured normal"));
    }

    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
        }]
    }"#;

    #[test]
    fn loaded_model_is_uploaded_once_and_drawn() {
        let mut file = tempfile::Builder::new().suffix(".gltf").tempfile().unwrap();
        file.write_all(TRIANGLE_GLTF.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = AppConfig {
            model: Some(file.path().to_path_buf()),
            ..AppConfig::default()
        };
        let mut state = AppState::new(&config, Clock::manual()).unwrap();
        let mut renderer = DebugTextRenderer::new();
        state.wait_for_assets();

        state.clock.advance(DT);
        let (first, output) = tick(&mut state, &mut renderer);
        state.clock.advance(DT);
        let (second, _) = tick(&mut state, &mut renderer);

        assert!(first.model_uploaded);
        assert!(!second.model_uploaded);
        assert!(matches!(state.scene.world.primary().visual(), Visual::Model(_)));
        assert_eq!(state.assets().len(), 1);
        let stem = file.path().file_stem().unwrap().to_str().unwrap();
        assert!(output.contains(&format!("primary model {stem}")));
    }
}
