//! Input: raw key names mapped to the small set of actions the scene reacts to.
//!
//! # Invariants
//! - Hosts translate platform events into [`Action`]s; nothing downstream sees
//!   raw key codes.
//! - Actions are queued by the host and applied between frames.

pub mod action;

pub use action::{Action, InputMap};
