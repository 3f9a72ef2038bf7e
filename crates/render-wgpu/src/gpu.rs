use orbitview_common::{VertexFormat, VertexLayout};
use orbitview_render::{
    BufferDescriptor, BufferUsage, ColorFormat, CompareFunction, DepthFormat, DeviceContext,
    DeviceLimits, DrawCall, PassRecord, PipelineCompilationError, PipelineDescriptor,
    ResourceAllocationError, ShaderSource, SurfaceAcquisitionError, UnsupportedCapabilityError,
};

/// One acquired surface image with its command encoder.
///
/// Presented when handed back to `DeviceContext::submit`.
pub struct WgpuFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

/// wgpu device, queue and configured surface.
///
/// The surface configuration is fixed at creation; acquisition failures
/// reapply it so the next tick can succeed.
pub struct WgpuContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    format: ColorFormat,
    adapter_info: wgpu::AdapterInfo,
}

impl WgpuContext {
    /// Create a device for `target` and configure its surface at the given
    /// physical size.
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, UnsupportedCapabilityError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| UnsupportedCapabilityError(format!("create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| UnsupportedCapabilityError("no suitable GPU adapter".into()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("orbitview_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| UnsupportedCapabilityError(format!("request device: {e}")))?;

        let caps = surface.get_capabilities(&adapter);
        let (texture_format, format) = choose_surface_format(&caps).ok_or_else(|| {
            UnsupportedCapabilityError(format!(
                "no supported surface format among {:?}",
                caps.formats
            ))
        })?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: texture_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let adapter_info = adapter.get_info();
        tracing::info!(
            backend = adapter_info.backend.to_str(),
            adapter = %adapter_info.name,
            format = ?texture_format,
            width = config.width,
            height = config.height,
            "GPU initialized"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            format,
            adapter_info,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Run `f` inside validation and out-of-memory error scopes.
    fn scoped<T>(&self, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        (value, validation.or(oom))
    }
}

impl DeviceContext for WgpuContext {
    type Buffer = wgpu::Buffer;
    type ShaderModule = wgpu::ShaderModule;
    type BindGroupLayout = wgpu::BindGroupLayout;
    type BindGroup = wgpu::BindGroup;
    type Pipeline = wgpu::RenderPipeline;
    type DepthTarget = wgpu::TextureView;
    type Frame = WgpuFrame;

    fn limits(&self) -> DeviceLimits {
        let limits = self.device.limits();
        DeviceLimits {
            max_buffer_size: limits.max_buffer_size,
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
        }
    }

    fn surface_format(&self) -> ColorFormat {
        self.format
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn create_buffer(
        &self,
        desc: &BufferDescriptor<'_>,
    ) -> Result<wgpu::Buffer, ResourceAllocationError> {
        let (buffer, err) = self.scoped(|| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(desc.label),
                size: desc.size,
                usage: buffer_usages(desc.usage),
                mapped_at_creation: false,
            })
        });
        match err {
            None => Ok(buffer),
            Some(e) => Err(ResourceAllocationError {
                label: desc.label.to_string(),
                size: desc.size,
                reason: e.to_string(),
            }),
        }
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn create_depth_target(
        &self,
        label: &str,
        format: DepthFormat,
        width: u32,
        height: u32,
    ) -> Result<wgpu::TextureView, ResourceAllocationError> {
        let (texture, err) = self.scoped(|| {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: depth_format(format),
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        });
        if let Some(e) = err {
            return Err(ResourceAllocationError {
                label: label.to_string(),
                size: width as u64 * height as u64 * 4,
                reason: e.to_string(),
            });
        }
        Ok(texture.create_view(&Default::default()))
    }

    fn create_shader_module(
        &self,
        source: &ShaderSource,
    ) -> Result<wgpu::ShaderModule, PipelineCompilationError> {
        let (module, err) = self.scoped(|| {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(source.label),
                    source: wgpu::ShaderSource::Wgsl(source.code.into()),
                })
        });
        compiled(source.label, module, err)
    }

    fn create_uniform_layout(
        &self,
        label: &str,
    ) -> Result<wgpu::BindGroupLayout, PipelineCompilationError> {
        let (layout, err) = self.scoped(|| {
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(label),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                })
        });
        compiled(label, layout, err)
    }

    fn create_uniform_bind_group(
        &self,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> Result<wgpu::BindGroup, ResourceAllocationError> {
        let (bind_group, err) = self.scoped(|| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        });
        match err {
            None => Ok(bind_group),
            Some(e) => Err(ResourceAllocationError {
                label: label.to_string(),
                size: buffer.size(),
                reason: e.to_string(),
            }),
        }
    }

    fn create_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_, Self>,
    ) -> Result<wgpu::RenderPipeline, PipelineCompilationError> {
        let attributes = vertex_attributes(desc.vertex_layout);
        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> =
            desc.uniform_layout.into_iter().collect();

        let (pipeline, err) = self.scoped(|| {
            let layout = self
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(desc.label),
                    bind_group_layouts: &bind_group_layouts,
                    push_constant_ranges: &[],
                });

            self.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(desc.label),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: desc.vertex_shader,
                        entry_point: Some(desc.vertex_entry),
                        compilation_options: Default::default(),
                        buffers: &[wgpu::VertexBufferLayout {
                            array_stride: desc.vertex_layout.array_stride,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &attributes,
                        }],
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: desc.fragment_shader,
                        entry_point: Some(desc.fragment_entry),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: texture_format(desc.color_format),
                            blend: Some(wgpu::BlendState::REPLACE),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: desc.cull_back_faces.then_some(wgpu::Face::Back),
                        ..Default::default()
                    },
                    depth_stencil: desc.depth.map(|d| wgpu::DepthStencilState {
                        format: depth_format(d.format),
                        depth_write_enabled: d.write_enabled,
                        depth_compare: compare_function(d.compare),
                        stencil: Default::default(),
                        bias: Default::default(),
                    }),
                    multisample: Default::default(),
                    multiview: None,
                    cache: None,
                })
        });
        compiled(desc.label, pipeline, err)
    }

    fn acquire_frame(&self) -> Result<WgpuFrame, SurfaceAcquisitionError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(e) => {
                let err = match e {
                    wgpu::SurfaceError::Lost => SurfaceAcquisitionError::Lost,
                    wgpu::SurfaceError::Outdated => SurfaceAcquisitionError::Outdated,
                    wgpu::SurfaceError::Timeout => SurfaceAcquisitionError::Timeout,
                    wgpu::SurfaceError::OutOfMemory => SurfaceAcquisitionError::OutOfMemory,
                    other => SurfaceAcquisitionError::Other(other.to_string()),
                };
                if matches!(
                    err,
                    SurfaceAcquisitionError::Lost | SurfaceAcquisitionError::Outdated
                ) {
                    self.surface.configure(&self.device, &self.config);
                }
                return Err(err);
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        Ok(WgpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    fn record_pass(&self, frame: &mut WgpuFrame, record: &PassRecord<'_, Self>) {
        let [r, g, b, a] = record.clear_color;
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(record.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: record.depth.map(|(view, clear)| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            ..Default::default()
        });

        pass.set_pipeline(record.pipeline);
        pass.set_vertex_buffer(0, record.vertex_buffer.slice(..));
        if let Some(index) = record.index_buffer {
            pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
        }
        if let Some(bind_group) = record.bind_group {
            pass.set_bind_group(0, bind_group, &[]);
        }
        match record.draw {
            DrawCall::Vertices(n) => pass.draw(0..n, 0..1),
            DrawCall::Indexed(n) => pass.draw_indexed(0..n, 0, 0..1),
        }
    }

    fn submit(&self, frame: WgpuFrame) {
        let WgpuFrame {
            surface_texture,
            view,
            encoder,
        } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }
}

fn compiled<T>(
    label: &str,
    value: T,
    err: Option<wgpu::Error>,
) -> Result<T, PipelineCompilationError> {
    match err {
        None => Ok(value),
        Some(e) => Err(PipelineCompilationError {
            label: label.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn buffer_usages(usage: BufferUsage) -> wgpu::BufferUsages {
    let mut out = wgpu::BufferUsages::empty();
    if usage.vertex {
        out |= wgpu::BufferUsages::VERTEX;
    }
    if usage.index {
        out |= wgpu::BufferUsages::INDEX;
    }
    if usage.uniform {
        out |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.copy_dst {
        out |= wgpu::BufferUsages::COPY_DST;
    }
    out
}

fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes
        .iter()
        .map(|a| wgpu::VertexAttribute {
            format: match a.format {
                VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
                VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            },
            offset: a.offset,
            shader_location: a.shader_location,
        })
        .collect()
}

fn texture_format(format: ColorFormat) -> wgpu::TextureFormat {
    match format {
        ColorFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        ColorFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        ColorFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        ColorFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

fn depth_format(format: DepthFormat) -> wgpu::TextureFormat {
    match format {
        DepthFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        DepthFormat::Depth24Plus => wgpu::TextureFormat::Depth24Plus,
    }
}

fn compare_function(compare: CompareFunction) -> wgpu::CompareFunction {
    match compare {
        CompareFunction::Less => wgpu::CompareFunction::Less,
        CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunction::Always => wgpu::CompareFunction::Always,
    }
}

/// Prefer an sRGB format, then any other format the core can describe.
fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
) -> Option<(wgpu::TextureFormat, ColorFormat)> {
    const PREFERENCE: [ColorFormat; 4] = [
        ColorFormat::Bgra8UnormSrgb,
        ColorFormat::Rgba8UnormSrgb,
        ColorFormat::Bgra8Unorm,
        ColorFormat::Rgba8Unorm,
    ];
    PREFERENCE
        .into_iter()
        .map(|f| (texture_format(f), f))
        .find(|(tf, _)| caps.formats.contains(tf))
}
