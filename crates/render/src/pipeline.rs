use crate::device::{
    ColorFormat, DepthFormat, DepthState, DeviceContext, PipelineDescriptor, ShaderSet,
};
use crate::error::PipelineCompilationError;
use orbitview_common::VertexLayout;

/// The scene's render pipeline plus the state it was built with.
pub struct ScenePipeline<D: DeviceContext> {
    pipeline: D::Pipeline,
    color_format: ColorFormat,
    depth: Option<DepthState>,
    uses_uniforms: bool,
}

impl<D: DeviceContext> ScenePipeline<D> {
    pub fn pipeline(&self) -> &D::Pipeline {
        &self.pipeline
    }

    pub fn color_format(&self) -> ColorFormat {
        self.color_format
    }

    pub fn depth(&self) -> Option<DepthState> {
        self.depth
    }

    pub fn uses_uniforms(&self) -> bool {
        self.uses_uniforms
    }
}

/// Assembles shader stages, vertex layout and depth configuration into one
/// immutable pipeline.
pub struct PipelineBuilder<'a, D: DeviceContext> {
    label: &'a str,
    vertex_layout: &'a VertexLayout,
    shaders: &'a ShaderSet,
    color_format: ColorFormat,
    depth_format: Option<DepthFormat>,
    uniform_layout: Option<&'a D::BindGroupLayout>,
    cull_back_faces: bool,
}

impl<'a, D: DeviceContext> PipelineBuilder<'a, D> {
    pub fn new(
        label: &'a str,
        vertex_layout: &'a VertexLayout,
        shaders: &'a ShaderSet,
        color_format: ColorFormat,
    ) -> Self {
        Self {
            label,
            vertex_layout,
            shaders,
            color_format,
            depth_format: None,
            uniform_layout: None,
            cull_back_faces: false,
        }
    }

    /// Enable a write-enabled `Less` depth test against `format`.
    pub fn depth(mut self, format: Option<DepthFormat>) -> Self {
        self.depth_format = format;
        self
    }

    /// Bind the camera uniform layout at group 0.
    pub fn uniforms(mut self, layout: Option<&'a D::BindGroupLayout>) -> Self {
        self.uniform_layout = layout;
        self
    }

    pub fn cull_back_faces(mut self, cull: bool) -> Self {
        self.cull_back_faces = cull;
        self
    }

    pub fn build(self, device: &D) -> Result<ScenePipeline<D>, PipelineCompilationError> {
        let vertex_module = device.create_shader_module(&self.shaders.vertex)?;
        let fragment_module = device.create_shader_module(&self.shaders.fragment)?;
        let depth = self.depth_format.map(DepthState::less);

        let pipeline = device.create_render_pipeline(&PipelineDescriptor {
            label: self.label,
            vertex_layout: self.vertex_layout,
            vertex_shader: &vertex_module,
            vertex_entry: self.shaders.vertex.entry_point,
            fragment_shader: &fragment_module,
            fragment_entry: self.shaders.fragment.entry_point,
            color_format: self.color_format,
            depth,
            uniform_layout: self.uniform_layout,
            cull_back_faces: self.cull_back_faces,
        })?;

        tracing::debug!(
            label = self.label,
            stride = self.vertex_layout.array_stride,
            depth = ?depth,
            uniforms = self.uniform_layout.is_some(),
            "render pipeline built"
        );

        Ok(ScenePipeline {
            pipeline,
            color_format: self.color_format,
            depth,
            uses_uniforms: self.uniform_layout.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::CompareFunction;
    use crate::recording::{DeviceEvent, RecordingDevice, test_shaders};
    use orbitview_common::{cube, triangle};

    fn builder<'a>(
        label: &'a str,
        layout: &'a VertexLayout,
        shaders: &'a ShaderSet,
        format: ColorFormat,
    ) -> PipelineBuilder<'a, RecordingDevice> {
        PipelineBuilder::new(label, layout, shaders, format)
    }

    #[test]
    fn triangle_pipeline_has_no_depth_or_uniforms() {
        let device = RecordingDevice::new(800, 600);
        let layout = triangle().vertex_layout();
        let shaders = test_shaders();
        let built = builder("triangle", &layout, &shaders, device.surface_format())
            .build(&device)
            .ok()
            .expect("pipeline");
        assert_eq!(built.depth(), None);
        assert!(!built.uses_uniforms());

        let created = device
            .events()
            .into_iter()
            .find_map(|e| match e {
                DeviceEvent::CreatePipeline {
                    stride, uniforms, ..
                } => Some((stride, uniforms)),
                _ => None,
            })
            .unwrap();
        assert_eq!(created, (8, false));
    }

    #[test]
    fn cube_pipeline_depth_tests_with_less() {
        let device = RecordingDevice::new(800, 600);
        let layout = cube().vertex_layout();
        let shaders = test_shaders();
        let uniform_layout = device.create_uniform_layout("camera").unwrap();
        let built = builder("cube", &layout, &shaders, device.surface_format())
            .depth(Some(DepthFormat::Depth32Float))
            .uniforms(Some(&uniform_layout))
            .cull_back_faces(true)
            .build(&device)
            .ok()
            .expect("pipeline");

        let depth = built.depth().unwrap();
        assert!(depth.write_enabled);
        assert_eq!(depth.compare, CompareFunction::Less);
        assert!(built.uses_uniforms());
    }

    #[test]
    fn shader_failure_surfaces_as_compilation_error() {
        let shaders = test_shaders();
        let device = RecordingDevice::new(800, 600).rejecting_shader(shaders.fragment.label);
        let layout = triangle().vertex_layout();
        let err = builder("triangle", &layout, &shaders, device.surface_format())
            .build(&device)
            .err()
            .expect("build should fail");
        assert_eq!(err.label, shaders.fragment.label);
        assert!(
            !device
                .events()
                .iter()
                .any(|e| matches!(e, DeviceEvent::CreatePipeline { .. }))
        );
    }
}
