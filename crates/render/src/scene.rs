use crate::camera::CameraUniform;
use crate::device::{DepthFormat, DeviceContext, ShaderSet};
use crate::error::RenderError;
use crate::frame::{FrameContext, FrameOutcome, FrameRenderer, FrameResources};
use crate::geometry::GeometryStore;
use crate::pipeline::{PipelineBuilder, ScenePipeline};
use orbitview_common::SceneConfig;

/// Depth format used whenever a scene enables depth testing.
pub const DEPTH_FORMAT: DepthFormat = DepthFormat::Depth32Float;

/// Running totals for a scene's ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub presented: u64,
    pub dropped: u64,
}

/// One fully built test scene: geometry, camera, pipeline and the frame
/// renderer that draws them.
///
/// `setup` either returns a complete scene or an error; `draw` is the only
/// per-tick entry point and never schedules itself.
pub struct TestScene<D: DeviceContext> {
    config: SceneConfig,
    geometry: GeometryStore<D>,
    camera: Option<CameraUniform<D>>,
    pipeline: ScenePipeline<D>,
    depth_target: Option<D::DepthTarget>,
    renderer: FrameRenderer,
    stats: FrameStats,
}

impl<D: DeviceContext> TestScene<D> {
    pub fn setup(device: &D, config: &SceneConfig, shaders: &ShaderSet) -> Result<Self, RenderError> {
        let mesh = config.build_mesh()?;
        let geometry = GeometryStore::upload(device, &mesh)?;

        let (width, height) = device.surface_size();
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let camera = match config.camera {
            Some(params) => Some(CameraUniform::init(device, params, aspect)?),
            None => None,
        };

        let depth_format = config.depth_test.then_some(DEPTH_FORMAT);
        let pipeline = PipelineBuilder::<D>::new(
            mesh.name(),
            geometry.vertex_layout(),
            shaders,
            device.surface_format(),
        )
        .depth(depth_format)
        .uniforms(camera.as_ref().map(CameraUniform::bind_group_layout))
        .cull_back_faces(config.depth_test && mesh.is_closed())
        .build(device)?;

        let depth_target = match depth_format {
            Some(format) => Some(device.create_depth_target("depth target", format, width, height)?),
            None => None,
        };

        tracing::info!(
            mesh = mesh.name(),
            draw = %geometry.draw_call(),
            depth = config.depth_test,
            camera = camera.is_some(),
            aspect,
            "scene setup complete"
        );

        Ok(Self {
            config: config.clone(),
            geometry,
            camera,
            pipeline,
            depth_target,
            renderer: FrameRenderer::new(config.clear_color),
            stats: FrameStats::default(),
        })
    }

    /// Render one tick at `time` milliseconds.
    pub fn draw(&mut self, device: &D, time: f64) -> FrameOutcome {
        let outcome = self.renderer.render(
            device,
            FrameResources {
                geometry: &self.geometry,
                pipeline: &self.pipeline,
                camera: self.camera.as_mut(),
                depth_target: self.depth_target.as_ref(),
            },
            FrameContext::at(time),
        );
        match outcome {
            FrameOutcome::Presented(_) => self.stats.presented += 1,
            FrameOutcome::Dropped(_) => self.stats.dropped += 1,
        }
        outcome
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn geometry(&self) -> &GeometryStore<D> {
        &self.geometry
    }

    pub fn camera(&self) -> Option<&CameraUniform<D>> {
        self.camera.as_ref()
    }

    pub fn pipeline(&self) -> &ScenePipeline<D> {
        &self.pipeline
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DrawCall;
    use crate::error::SurfaceAcquisitionError;
    use crate::recording::{DeviceEvent, RecordingDevice, test_shaders};
    use orbitview_common::{
        CameraParams, MeshData, MeshError, MeshKind, PositionComponents, ScenePreset,
    };

    fn culls(device: &RecordingDevice) -> bool {
        device
            .events()
            .into_iter()
            .find_map(|e| match e {
                DeviceEvent::CreatePipeline {
                    cull_back_faces, ..
                } => Some(cull_back_faces),
                _ => None,
            })
            .unwrap()
    }

    fn setup(device: &RecordingDevice, preset: ScenePreset) -> TestScene<RecordingDevice> {
        TestScene::setup(device, &preset.config(), &test_shaders())
            .ok()
            .expect("scene setup")
    }

    #[test]
    fn triangle_draws_three_vertices_without_depth() {
        let device = RecordingDevice::new(640, 480);
        let mut scene = setup(&device, ScenePreset::Triangle);
        assert!(scene.camera().is_none());
        device.clear_events();

        assert_eq!(scene.draw(&device, 0.0), FrameOutcome::Presented(DrawCall::Vertices(3)));
        let events = device.events();
        assert!(events.contains(&DeviceEvent::BeginPass {
            clear_color: SceneConfig::BLACK,
            depth_clear: None,
        }));
        assert!(events.contains(&DeviceEvent::Draw(DrawCall::Vertices(3))));
        assert!(!events.iter().any(|e| matches!(
            e,
            DeviceEvent::SetIndexBuffer { .. } | DeviceEvent::SetBindGroup { .. }
        )));
    }

    #[test]
    fn cube_draws_indexed_with_depth() {
        let device = RecordingDevice::new(640, 480);
        let mut scene = setup(&device, ScenePreset::Cube);
        assert!(scene.pipeline().depth().is_some());
        device.clear_events();

        assert_eq!(
            scene.draw(&device, 16.0),
            FrameOutcome::Presented(DrawCall::Indexed(36))
        );
        let events = device.events();
        assert!(events.contains(&DeviceEvent::SetBindGroup { index: 0 }));
        assert!(events.contains(&DeviceEvent::Draw(DrawCall::Indexed(36))));
        assert!(events.iter().any(|e| matches!(
            e,
            DeviceEvent::BeginPass {
                depth_clear: Some(_),
                ..
            }
        )));
    }

    #[test]
    fn aspect_ratio_comes_from_initial_surface() {
        let device = RecordingDevice::new(1600, 900);
        let scene = setup(&device, ScenePreset::CubeNoDepth);
        let camera = scene.camera().unwrap().camera();
        assert!((camera.aspect() - 16.0 / 9.0).abs() < 1e-6);
        assert!(scene.pipeline().depth().is_none());
    }

    #[test]
    fn dropped_frame_does_not_block_the_next() {
        let device = RecordingDevice::new(640, 480);
        let mut scene = setup(&device, ScenePreset::Cube);
        device.fail_next_acquire(SurfaceAcquisitionError::Outdated);
        device.clear_events();

        assert_eq!(
            scene.draw(&device, 100.0),
            FrameOutcome::Dropped(SurfaceAcquisitionError::Outdated)
        );
        assert!(!device.events().iter().any(|e| matches!(e, DeviceEvent::Draw(_))));

        assert!(scene.draw(&device, 116.0).is_presented());
        assert_eq!(
            scene.stats(),
            FrameStats {
                presented: 1,
                dropped: 1
            }
        );
        assert_eq!(device.submitted_frames(), 1);
    }

    #[test]
    fn repeated_setup_allocates_identical_buffers() {
        let sizes = |device: &RecordingDevice| {
            device
                .events()
                .into_iter()
                .filter_map(|e| match e {
                    DeviceEvent::CreateBuffer { size, .. } => Some(size),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        let first = RecordingDevice::new(640, 480);
        let second = RecordingDevice::new(640, 480);
        setup(&first, ScenePreset::Cube);
        setup(&second, ScenePreset::Cube);
        assert_eq!(sizes(&first), sizes(&second));
        assert_eq!(sizes(&first), vec![160, 144, 64]);
    }

    #[test]
    fn setup_failure_returns_no_scene() {
        let shaders = test_shaders();
        let device = RecordingDevice::new(640, 480).rejecting_shader(shaders.vertex.label);
        let result = TestScene::setup(&device, &ScenePreset::Cube.config(), &shaders);
        assert!(matches!(result, Err(RenderError::PipelineCompilation(_))));
    }

    #[test]
    fn only_closed_depth_tested_meshes_cull_back_faces() {
        let device = RecordingDevice::new(640, 480);
        setup(&device, ScenePreset::Cube);
        assert!(culls(&device));

        // a single-sided triangle orbited from behind must stay visible
        let config = SceneConfig {
            depth_test: true,
            camera: Some(CameraParams::default()),
            ..ScenePreset::Triangle.config()
        };
        let device = RecordingDevice::new(640, 480);
        TestScene::setup(&device, &config, &test_shaders())
            .ok()
            .expect("scene setup");
        assert!(!culls(&device));

        let device = RecordingDevice::new(640, 480);
        setup(&device, ScenePreset::CubeNoDepth);
        assert!(!culls(&device));
    }

    #[test]
    fn invalid_custom_mesh_aborts_setup() {
        let config = SceneConfig {
            mesh: MeshKind::Custom,
            custom_mesh: Some(MeshData {
                name: "broken".into(),
                components: PositionComponents::Two,
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                uvs: None,
                indices: Some(vec![0, 1, 7]),
            }),
            ..ScenePreset::Triangle.config()
        };
        let device = RecordingDevice::new(640, 480);
        let result = TestScene::setup(&device, &config, &test_shaders());
        assert!(matches!(
            result,
            Err(RenderError::Mesh(MeshError::IndexOutOfRange { value: 7, .. }))
        ));
        assert!(device.events().is_empty());
    }
}
