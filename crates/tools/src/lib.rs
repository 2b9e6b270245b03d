//! Developer tooling: read-only scene inspection for debug panels and the CLI.
//!
//! # Invariants
//! - Inspection never mutates the scene.

mod inspector;

pub use inspector::{EntityInfo, SceneSummary, WorldInspector};
