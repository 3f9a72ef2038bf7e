//! In-memory [`DeviceContext`] that records every call instead of talking to
//! a GPU. Used by the tests and by the headless CLI trace.

use crate::device::{
    BufferDescriptor, BufferUsage, ColorFormat, DepthFormat, DepthState, DeviceContext,
    DeviceLimits, DrawCall, PassRecord, PipelineDescriptor, ShaderSource,
};
use crate::error::{PipelineCompilationError, ResourceAllocationError, SurfaceAcquisitionError};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Opaque handle for anything the recording device creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An acquired surface image. Consumed by `submit`.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordedFrame {
    pub index: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    CreateBuffer {
        id: ResourceId,
        label: String,
        size: u64,
        usage: BufferUsage,
    },
    WriteBuffer {
        buffer: ResourceId,
        offset: u64,
        len: usize,
    },
    CreateDepthTarget {
        id: ResourceId,
        format: DepthFormat,
        width: u32,
        height: u32,
    },
    CreateShaderModule {
        id: ResourceId,
        label: String,
    },
    CreateUniformLayout {
        id: ResourceId,
    },
    CreateBindGroup {
        id: ResourceId,
        buffer: ResourceId,
    },
    CreatePipeline {
        id: ResourceId,
        label: String,
        stride: u64,
        depth: Option<DepthState>,
        uniforms: bool,
        cull_back_faces: bool,
    },
    AcquireFrame {
        frame: u64,
    },
    AcquireFailed(SurfaceAcquisitionError),
    BeginPass {
        clear_color: [f64; 4],
        depth_clear: Option<f32>,
    },
    SetPipeline {
        pipeline: ResourceId,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: ResourceId,
    },
    SetIndexBuffer {
        buffer: ResourceId,
    },
    SetBindGroup {
        index: u32,
    },
    Draw(DrawCall),
    EndPass,
    Submit {
        frame: u64,
    },
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateBuffer {
                id,
                label,
                size,
                usage,
            } => write!(f, "create_buffer {id} \"{label}\" size={size} usage={usage:?}"),
            Self::WriteBuffer {
                buffer,
                offset,
                len,
            } => write!(f, "write_buffer {buffer} offset={offset} len={len}"),
            Self::CreateDepthTarget {
                id,
                format,
                width,
                height,
            } => write!(f, "create_depth_target {id} {format:?} {width}x{height}"),
            Self::CreateShaderModule { id, label } => {
                write!(f, "create_shader_module {id} \"{label}\"")
            }
            Self::CreateUniformLayout { id } => write!(f, "create_uniform_layout {id}"),
            Self::CreateBindGroup { id, buffer } => {
                write!(f, "create_bind_group {id} buffer={buffer}")
            }
            Self::CreatePipeline {
                id,
                label,
                stride,
                depth,
                uniforms,
                cull_back_faces,
            } => write!(
                f,
                "create_render_pipeline {id} \"{label}\" stride={stride} depth={depth:?} uniforms={uniforms} cull={cull_back_faces}"
            ),
            Self::AcquireFrame { frame } => write!(f, "acquire_frame {frame}"),
            Self::AcquireFailed(err) => write!(f, "acquire_frame failed: {err}"),
            Self::BeginPass {
                clear_color,
                depth_clear,
            } => write!(f, "begin_pass clear={clear_color:?} depth_clear={depth_clear:?}"),
            Self::SetPipeline { pipeline } => write!(f, "  set_pipeline {pipeline}"),
            Self::SetVertexBuffer { slot, buffer } => {
                write!(f, "  set_vertex_buffer slot={slot} {buffer}")
            }
            Self::SetIndexBuffer { buffer } => write!(f, "  set_index_buffer {buffer} u32"),
            Self::SetBindGroup { index } => write!(f, "  set_bind_group {index}"),
            Self::Draw(draw) => write!(f, "  {draw}"),
            Self::EndPass => write!(f, "end_pass"),
            Self::Submit { frame } => write!(f, "submit {frame}"),
        }
    }
}

#[derive(Default)]
struct State {
    next_id: u32,
    next_frame: u64,
    submitted: u64,
    events: Vec<DeviceEvent>,
    buffers: HashMap<ResourceId, (BufferUsage, Vec<u8>)>,
    acquire_failures: VecDeque<SurfaceAcquisitionError>,
}

impl State {
    fn alloc(&mut self) -> ResourceId {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Device fake with a fixed surface size and format.
pub struct RecordingDevice {
    width: u32,
    height: u32,
    format: ColorFormat,
    limits: DeviceLimits,
    rejected_shaders: Vec<String>,
    state: RefCell<State>,
}

impl RecordingDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: ColorFormat::Bgra8UnormSrgb,
            limits: DeviceLimits::default(),
            rejected_shaders: Vec::new(),
            state: RefCell::new(State::default()),
        }
    }

    pub fn with_max_buffer_size(mut self, size: u64) -> Self {
        self.limits.max_buffer_size = size;
        self
    }

    /// Make shader creation fail for the module with this label.
    pub fn rejecting_shader(mut self, label: &str) -> Self {
        self.rejected_shaders.push(label.to_string());
        self
    }

    /// Queue a failure for the next `acquire_frame` call.
    pub fn fail_next_acquire(&self, err: SurfaceAcquisitionError) {
        self.state.borrow_mut().acquire_failures.push_back(err);
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Current contents of a buffer, empty if unknown.
    pub fn buffer_contents(&self, buffer: &ResourceId) -> Vec<u8> {
        self.state
            .borrow()
            .buffers
            .get(buffer)
            .map(|(_, data)| data.clone())
            .unwrap_or_default()
    }

    pub fn buffer_usage(&self, buffer: &ResourceId) -> Option<BufferUsage> {
        self.state.borrow().buffers.get(buffer).map(|(usage, _)| *usage)
    }

    pub fn submitted_frames(&self) -> u64 {
        self.state.borrow().submitted
    }

    /// Recorded events rendered one per line.
    pub fn trace(&self) -> String {
        let mut out = String::new();
        for event in &self.state.borrow().events {
            out.push_str(&event.to_string());
            out.push('\n');
        }
        out
    }

    fn push(&self, event: DeviceEvent) {
        self.state.borrow_mut().events.push(event);
    }
}

impl DeviceContext for RecordingDevice {
    type Buffer = ResourceId;
    type ShaderModule = ResourceId;
    type BindGroupLayout = ResourceId;
    type BindGroup = ResourceId;
    type Pipeline = ResourceId;
    type DepthTarget = ResourceId;
    type Frame = RecordedFrame;

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn surface_format(&self) -> ColorFormat {
        self.format
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_buffer(
        &self,
        desc: &BufferDescriptor<'_>,
    ) -> Result<ResourceId, ResourceAllocationError> {
        if desc.size > self.limits.max_buffer_size {
            return Err(ResourceAllocationError {
                label: desc.label.to_string(),
                size: desc.size,
                reason: "rejected by recording device".into(),
            });
        }
        let mut state = self.state.borrow_mut();
        let id = state.alloc();
        state
            .buffers
            .insert(id, (desc.usage, vec![0; desc.size as usize]));
        state.events.push(DeviceEvent::CreateBuffer {
            id,
            label: desc.label.to_string(),
            size: desc.size,
            usage: desc.usage,
        });
        Ok(id)
    }

    fn write_buffer(&self, buffer: &ResourceId, offset: u64, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        if let Some((_, contents)) = state.buffers.get_mut(buffer) {
            let start = offset as usize;
            let end = start + data.len();
            assert!(end <= contents.len(), "write past end of buffer {buffer}");
            contents[start..end].copy_from_slice(data);
        }
        state.events.push(DeviceEvent::WriteBuffer {
            buffer: *buffer,
            offset,
            len: data.len(),
        });
    }

    fn create_depth_target(
        &self,
        label: &str,
        format: DepthFormat,
        width: u32,
        height: u32,
    ) -> Result<ResourceId, ResourceAllocationError> {
        let max = self.limits.max_texture_dimension_2d;
        if width > max || height > max {
            return Err(ResourceAllocationError {
                label: label.to_string(),
                size: width as u64 * height as u64 * 4,
                reason: format!("dimension exceeds {max}"),
            });
        }
        let mut state = self.state.borrow_mut();
        let id = state.alloc();
        state.events.push(DeviceEvent::CreateDepthTarget {
            id,
            format,
            width,
            height,
        });
        Ok(id)
    }

    fn create_shader_module(
        &self,
        source: &ShaderSource,
    ) -> Result<ResourceId, PipelineCompilationError> {
        if self.rejected_shaders.iter().any(|l| l == source.label) {
            return Err(PipelineCompilationError {
                label: source.label.to_string(),
                reason: "rejected by recording device".into(),
            });
        }
        let mut state = self.state.borrow_mut();
        let id = state.alloc();
        state.events.push(DeviceEvent::CreateShaderModule {
            id,
            label: source.label.to_string(),
        });
        Ok(id)
    }

    fn create_uniform_layout(&self, _label: &str) -> Result<ResourceId, PipelineCompilationError> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc();
        state.events.push(DeviceEvent::CreateUniformLayout { id });
        Ok(id)
    }

    fn create_uniform_bind_group(
        &self,
        _label: &str,
        _layout: &ResourceId,
        buffer: &ResourceId,
    ) -> Result<ResourceId, ResourceAllocationError> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc();
        state.events.push(DeviceEvent::CreateBindGroup {
            id,
            buffer: *buffer,
        });
        Ok(id)
    }

    fn create_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_, Self>,
    ) -> Result<ResourceId, PipelineCompilationError> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc();
        state.events.push(DeviceEvent::CreatePipeline {
            id,
            label: desc.label.to_string(),
            stride: desc.vertex_layout.array_stride,
            depth: desc.depth,
            uniforms: desc.uniform_layout.is_some(),
            cull_back_faces: desc.cull_back_faces,
        });
        Ok(id)
    }

    fn acquire_frame(&self) -> Result<RecordedFrame, SurfaceAcquisitionError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.acquire_failures.pop_front() {
            state.events.push(DeviceEvent::AcquireFailed(err.clone()));
            return Err(err);
        }
        let index = state.next_frame;
        state.next_frame += 1;
        state.events.push(DeviceEvent::AcquireFrame { frame: index });
        Ok(RecordedFrame { index })
    }

    fn record_pass(&self, _frame: &mut RecordedFrame, pass: &PassRecord<'_, Self>) {
        self.push(DeviceEvent::BeginPass {
            clear_color: pass.clear_color,
            depth_clear: pass.depth.map(|(_, clear)| clear),
        });
        self.push(DeviceEvent::SetPipeline {
            pipeline: *pass.pipeline,
        });
        self.push(DeviceEvent::SetVertexBuffer {
            slot: 0,
            buffer: *pass.vertex_buffer,
        });
        if let Some(index) = pass.index_buffer {
            self.push(DeviceEvent::SetIndexBuffer { buffer: *index });
        }
        if pass.bind_group.is_some() {
            self.push(DeviceEvent::SetBindGroup { index: 0 });
        }
        self.push(DeviceEvent::Draw(pass.draw));
        self.push(DeviceEvent::EndPass);
    }

    fn submit(&self, frame: RecordedFrame) {
        let mut state = self.state.borrow_mut();
        state.submitted += 1;
        state.events.push(DeviceEvent::Submit { frame: frame.index });
    }
}

/// Placeholder shader pair; the recording device never compiles it.
#[cfg(test)]
pub(crate) fn test_shaders() -> crate::device::ShaderSet {
    crate::device::ShaderSet {
        vertex: ShaderSource {
            label: "test vertex",
            code: "@vertex fn vs_main() {}",
            entry_point: "vs_main",
        },
        fragment: ShaderSource {
            label: "test fragment",
            code: "@fragment fn fs_main() {}",
            entry_point: "fs_main",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_acquire_failure_is_consumed_once() {
        let device = RecordingDevice::new(4, 4);
        device.fail_next_acquire(SurfaceAcquisitionError::Timeout);
        assert_eq!(
            device.acquire_frame(),
            Err(SurfaceAcquisitionError::Timeout)
        );
        assert_eq!(device.acquire_frame(), Ok(RecordedFrame { index: 0 }));
    }

    #[test]
    fn failed_acquire_shows_in_trace() {
        let device = RecordingDevice::new(4, 4);
        device.fail_next_acquire(SurfaceAcquisitionError::Outdated);
        assert!(device.acquire_frame().is_err());
        assert_eq!(
            device.events(),
            vec![DeviceEvent::AcquireFailed(SurfaceAcquisitionError::Outdated)]
        );
        assert_eq!(device.trace(), "acquire_frame failed: surface outdated\n");
    }

    #[test]
    fn writes_land_at_offset() {
        let device = RecordingDevice::new(4, 4);
        let buffer = device
            .create_buffer(&BufferDescriptor {
                label: "b",
                size: 8,
                usage: BufferUsage::UNIFORM,
            })
            .unwrap();
        device.write_buffer(&buffer, 4, &[1, 2, 3, 4]);
        assert_eq!(device.buffer_contents(&buffer), vec![0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn trace_lists_one_event_per_line() {
        let device = RecordingDevice::new(4, 4);
        let frame = device.acquire_frame().unwrap();
        device.submit(frame);
        assert_eq!(device.trace(), "acquire_frame 0\nsubmit 0\n");
    }
}
