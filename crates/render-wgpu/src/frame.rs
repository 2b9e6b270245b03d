use giftbox_assets::{Model, Texture};
use giftbox_kernel::Scene;
use giftbox_render::{OrbitCamera, Renderer};

use crate::gpu::WgpuRenderer;

/// What one GPU frame drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub instances: u32,
    pub reflected: u32,
    pub draw_calls: u32,
}

/// One frame's worth of GPU access, exposed through the [`Renderer`] trait.
///
/// The surface texture is acquired by the host before the frame and
/// presented after it, so overlays can draw on the same view in between.
pub struct WgpuFrame<'a> {
    pub renderer: &'a mut WgpuRenderer,
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub view: &'a wgpu::TextureView,
}

impl Renderer for WgpuFrame<'_> {
    type Output = FrameStats;

    fn render(&mut self, scene: &Scene, camera: &OrbitCamera) -> FrameStats {
        self.renderer
            .render(self.device, self.queue, self.view, scene, camera)
    }

    fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.renderer.resize(self.device, width, height);
    }

    fn upload_model(&mut self, model: &Model) {
        self.renderer.upload_model(self.device, model);
    }

    fn upload_texture(&mut self, texture: &Texture) {
        self.renderer
            .upload_texture(self.device, self.queue, texture);
    }
}
