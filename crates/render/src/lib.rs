//! Frame pipeline for the orbitview test scene.
//!
//! Setup uploads the mesh, creates the camera uniform and builds the render
//! pipeline; each tick recomputes the camera, records one pass and submits.
//! Everything talks to the GPU through [`DeviceContext`], so a backend (or
//! the [`RecordingDevice`] fake) plugs in without touching the core.
//!
//! # Invariants
//! - Resources are created once in `setup` and never destroyed or resized.
//! - The uniform write for a tick is queued before that tick's submission.
//! - A failed surface acquisition drops only the current frame.

mod camera;
mod device;
mod error;
mod frame;
mod geometry;
mod pipeline;
mod recording;
mod scene;

pub use camera::{CameraUniform, OrbitCamera, Uniforms};
pub use device::{
    BufferDescriptor, BufferUsage, ColorFormat, CompareFunction, DepthFormat, DepthState,
    DeviceContext, DeviceLimits, DrawCall, PassRecord, PipelineDescriptor, ShaderSet,
    ShaderSource,
};
pub use error::{
    PipelineCompilationError, RenderError, ResourceAllocationError, SurfaceAcquisitionError,
    UnsupportedCapabilityError,
};
pub use frame::{DEPTH_CLEAR, FrameContext, FrameOutcome, FrameRenderer, FrameResources};
pub use geometry::GeometryStore;
pub use pipeline::{PipelineBuilder, ScenePipeline};
pub use recording::{DeviceEvent, RecordedFrame, RecordingDevice, ResourceId};
pub use scene::{DEPTH_FORMAT, FrameStats, TestScene};

pub fn crate_info() -> &'static str {
    "orbitview-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
