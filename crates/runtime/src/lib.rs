//! Runtime: configuration, owned application state, and the per-frame
//! synchronization loop that copies physics results onto meshes and renders.
//!
//! # Invariants
//! - All mutable state lives in [`AppState`], owned by the host and passed by
//!   `&mut` into [`tick`]. There are no globals.
//! - Actions are applied between frames, never during one.
//! - Model and texture loads never block a frame; results are polled at
//!   frame start.

mod app;
mod config;
mod frame;

pub use app::{AppState, AssetStatus, JUMP_HEIGHT};
pub use config::{
    AppConfig, CameraConfig, ConfigError, FloorConfig, LightConfig, PhysicsConfig, PrimaryConfig,
    SpawnConfig, TextureConfig, WindowConfig,
};
pub use frame::{FrameReport, tick};

/// Errors from building or driving the application state.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("world: {0}")]
    Kernel(#[from] giftbox_kernel::KernelError),
}
