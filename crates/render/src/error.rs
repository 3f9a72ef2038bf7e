use orbitview_common::MeshError;

/// The device refused to create a buffer or texture.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to allocate {label} ({size} bytes): {reason}")]
pub struct ResourceAllocationError {
    pub label: String,
    pub size: u64,
    pub reason: String,
}

/// Shader compilation or pipeline/layout validation failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to build {label}: {reason}")]
pub struct PipelineCompilationError {
    pub label: String,
    pub reason: String,
}

/// The host cannot provide the graphics capability at all.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("graphics capability unavailable: {0}")]
pub struct UnsupportedCapabilityError(pub String);

/// The current presentable image could not be acquired for this tick.
///
/// Always recoverable: the frame is dropped and the next tick tries again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceAcquisitionError {
    #[error("surface lost")]
    Lost,
    #[error("surface outdated")]
    Outdated,
    #[error("timed out waiting for surface image")]
    Timeout,
    #[error("out of memory acquiring surface image")]
    OutOfMemory,
    #[error("surface error: {0}")]
    Other(String),
}

/// Fatal setup errors. No partially built scene survives one of these.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedCapabilityError),
    #[error(transparent)]
    ResourceAllocation(#[from] ResourceAllocationError),
    #[error(transparent)]
    PipelineCompilation(#[from] PipelineCompilationError),
    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),
}
