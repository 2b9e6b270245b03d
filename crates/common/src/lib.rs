//! Shared types for the giftbox scene: entity ids, transforms, asset ids.

pub mod types;

pub use types::{AssetId, EntityId, Transform};
