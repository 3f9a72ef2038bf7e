//! wgpu backend for orbitview.
//!
//! [`WgpuContext`] acquires the adapter, device and surface once and
//! implements [`orbitview_render::DeviceContext`] on top of them. Shader text
//! for every scene variant lives in [`shaders`].
//!
//! # Invariants
//! - The surface keeps its initial configuration for the whole run.
//! - Creation errors are captured through error scopes and returned, never
//!   left to the uncaptured-error handler.

mod gpu;
pub mod shaders;

pub use gpu::{WgpuContext, WgpuFrame};
pub use shaders::shaders_for;
