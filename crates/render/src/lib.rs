//! Rendering adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers read the scene; they never mutate world truth.
//! - Camera motion lives outside the kernel and never feeds back into physics.
//!
//! The debug text renderer gives headless hosts and tests something to render
//! into; the wgpu backend implements the same trait.

mod camera;
mod renderer;

pub use camera::OrbitCamera;
pub use renderer::{DebugTextRenderer, Renderer};
