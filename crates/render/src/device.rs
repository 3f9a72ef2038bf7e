use crate::error::{PipelineCompilationError, ResourceAllocationError, SurfaceAcquisitionError};
use orbitview_common::VertexLayout;
use std::fmt;

/// Buffer usage flags the core needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferUsage {
    pub vertex: bool,
    pub index: bool,
    pub uniform: bool,
    pub copy_dst: bool,
}

impl BufferUsage {
    pub const VERTEX: Self = Self {
        vertex: true,
        index: false,
        uniform: false,
        copy_dst: true,
    };
    pub const INDEX: Self = Self {
        vertex: false,
        index: true,
        uniform: false,
        copy_dst: true,
    };
    pub const UNIFORM: Self = Self {
        vertex: false,
        index: false,
        uniform: true,
        copy_dst: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub size: u64,
    pub usage: BufferUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_buffer_size: u64,
    pub max_texture_dimension_2d: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_buffer_size: 256 << 20,
            max_texture_dimension_2d: 8192,
        }
    }
}

/// Presentable color formats the surface may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba8Unorm,
    Rgba8UnormSrgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFormat {
    Depth32Float,
    Depth24Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Less,
    LessEqual,
    Always,
}

/// Depth-stencil stage of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    pub format: DepthFormat,
    pub write_enabled: bool,
    pub compare: CompareFunction,
}

impl DepthState {
    /// Write-enabled, nearer-fragment-wins depth test.
    pub fn less(format: DepthFormat) -> Self {
        Self {
            format,
            write_enabled: true,
            compare: CompareFunction::Less,
        }
    }
}

/// WGSL text for one shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: &'static str,
    pub code: &'static str,
    pub entry_point: &'static str,
}

/// Vertex and fragment stages for one scene variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSet {
    pub vertex: ShaderSource,
    pub fragment: ShaderSource,
}

/// Everything needed to create the render pipeline. Immutable once built.
pub struct PipelineDescriptor<'a, D: DeviceContext + ?Sized> {
    pub label: &'a str,
    pub vertex_layout: &'a VertexLayout,
    pub vertex_shader: &'a D::ShaderModule,
    pub vertex_entry: &'a str,
    pub fragment_shader: &'a D::ShaderModule,
    pub fragment_entry: &'a str,
    pub color_format: ColorFormat,
    pub depth: Option<DepthState>,
    pub uniform_layout: Option<&'a D::BindGroupLayout>,
    pub cull_back_faces: bool,
}

/// The single draw a frame issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    Vertices(u32),
    Indexed(u32),
}

impl DrawCall {
    pub fn count(self) -> u32 {
        match self {
            Self::Vertices(n) | Self::Indexed(n) => n,
        }
    }
}

impl fmt::Display for DrawCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertices(n) => write!(f, "draw({n})"),
            Self::Indexed(n) => write!(f, "draw_indexed({n})"),
        }
    }
}

/// One render pass, fully described before any command is recorded.
///
/// Backends replay it in order: begin (clear color, clear depth), set
/// pipeline, vertex buffer at slot 0, index buffer, bind group 0, draw, end.
pub struct PassRecord<'a, D: DeviceContext + ?Sized> {
    pub label: &'a str,
    pub clear_color: [f64; 4],
    pub depth: Option<(&'a D::DepthTarget, f32)>,
    pub pipeline: &'a D::Pipeline,
    pub vertex_buffer: &'a D::Buffer,
    pub index_buffer: Option<&'a D::Buffer>,
    pub bind_group: Option<&'a D::BindGroup>,
    pub draw: DrawCall,
}

/// The graphics device, its queue and the presentable surface.
///
/// Constructed once by the host and passed by reference to every component.
/// All calls happen on the owning thread; work submitted through
/// [`DeviceContext::write_buffer`] and [`DeviceContext::submit`] executes in
/// submission order.
pub trait DeviceContext {
    type Buffer;
    type ShaderModule;
    type BindGroupLayout;
    type BindGroup;
    type Pipeline;
    type DepthTarget;
    type Frame;

    fn limits(&self) -> DeviceLimits;

    /// Preferred color format of the surface.
    fn surface_format(&self) -> ColorFormat;

    /// Surface dimensions at configuration time, in physical pixels.
    fn surface_size(&self) -> (u32, u32);

    fn create_buffer(
        &self,
        desc: &BufferDescriptor<'_>,
    ) -> Result<Self::Buffer, ResourceAllocationError>;

    /// Queue a write of `data` into `buffer` at `offset`.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    fn create_depth_target(
        &self,
        label: &str,
        format: DepthFormat,
        width: u32,
        height: u32,
    ) -> Result<Self::DepthTarget, ResourceAllocationError>;

    fn create_shader_module(
        &self,
        source: &ShaderSource,
    ) -> Result<Self::ShaderModule, PipelineCompilationError>;

    /// Layout with a single uniform buffer at binding 0, vertex stage only.
    fn create_uniform_layout(
        &self,
        label: &str,
    ) -> Result<Self::BindGroupLayout, PipelineCompilationError>;

    fn create_uniform_bind_group(
        &self,
        label: &str,
        layout: &Self::BindGroupLayout,
        buffer: &Self::Buffer,
    ) -> Result<Self::BindGroup, ResourceAllocationError>;

    fn create_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_, Self>,
    ) -> Result<Self::Pipeline, PipelineCompilationError>;

    /// Acquire the current presentable image and open a command sequence.
    fn acquire_frame(&self) -> Result<Self::Frame, SurfaceAcquisitionError>;

    fn record_pass(&self, frame: &mut Self::Frame, pass: &PassRecord<'_, Self>);

    /// Submit the recorded commands and present the image.
    fn submit(&self, frame: Self::Frame);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_call_display() {
        assert_eq!(DrawCall::Vertices(3).to_string(), "draw(3)");
        assert_eq!(DrawCall::Indexed(36).to_string(), "draw_indexed(36)");
        assert_eq!(DrawCall::Indexed(36).count(), 36);
    }

    #[test]
    fn less_depth_writes() {
        let state = DepthState::less(DepthFormat::Depth32Float);
        assert!(state.write_enabled);
        assert_eq!(state.compare, CompareFunction::Less);
    }
}
