//! wgpu render backend for the giftbox scene.
//!
//! Draws the tinted (optionally textured) floor, a stencil-masked mirror reflecting every dynamic
//! mesh, instanced boxes, loaded models, and the emissive sun that carries the
//! point light.
//!
//! # Invariants
//! - Renderer never mutates scene state.
//! - Camera motion is not part of the simulation.
//! - Reflections are drawn only inside the mirror's stencil footprint.

mod context;
mod frame;
mod gpu;
mod mesh;
mod shaders;

pub use context::GpuContext;
pub use frame::{FrameStats, WgpuFrame};
pub use gpu::WgpuRenderer;

/// Errors from GPU setup and presentation.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no compatible GPU adapter")]
    NoAdapter,
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("surface creation failed: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
