use crate::camera::CameraUniform;
use crate::device::{DeviceContext, DrawCall, PassRecord};
use crate::error::SurfaceAcquisitionError;
use crate::geometry::GeometryStore;
use crate::pipeline::ScenePipeline;

/// Depth value the depth attachment is cleared to each frame.
pub const DEPTH_CLEAR: f32 = 1.0;

/// Time value handed to the renderer by the scheduler for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Milliseconds, as reported by the display-refresh or timer source.
    pub time: f64,
}

impl FrameContext {
    pub fn at(time: f64) -> Self {
        Self { time }
    }
}

/// What happened to one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Presented(DrawCall),
    /// The surface image could not be acquired; nothing was drawn.
    Dropped(SurfaceAcquisitionError),
}

impl FrameOutcome {
    pub fn is_presented(&self) -> bool {
        matches!(self, Self::Presented(_))
    }
}

/// Borrowed view of every resource a frame touches.
pub struct FrameResources<'a, D: DeviceContext> {
    pub geometry: &'a GeometryStore<D>,
    pub pipeline: &'a ScenePipeline<D>,
    pub camera: Option<&'a mut CameraUniform<D>>,
    pub depth_target: Option<&'a D::DepthTarget>,
}

/// Per-frame orchestrator. Owns nothing but its clear color.
#[derive(Debug, Clone, Copy)]
pub struct FrameRenderer {
    clear_color: [f64; 4],
}

impl FrameRenderer {
    pub fn new(clear_color: [f64; 4]) -> Self {
        Self { clear_color }
    }

    pub fn clear_color(&self) -> [f64; 4] {
        self.clear_color
    }

    /// Render one tick: upload the camera, acquire, record, submit.
    pub fn render<D: DeviceContext>(
        &self,
        device: &D,
        resources: FrameResources<'_, D>,
        frame: FrameContext,
    ) -> FrameOutcome {
        let FrameResources {
            geometry,
            pipeline,
            camera,
            depth_target,
        } = resources;

        let bind_group = match camera {
            Some(camera) => {
                camera.update(device, frame.time);
                Some(camera.bind_group())
            }
            None => None,
        };

        let mut target = match device.acquire_frame() {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(time = frame.time, "frame dropped: {e}");
                return FrameOutcome::Dropped(e);
            }
        };

        let draw = geometry.draw_call();
        device.record_pass(
            &mut target,
            &PassRecord {
                label: "scene pass",
                clear_color: self.clear_color,
                depth: depth_target.map(|view| (view, DEPTH_CLEAR)),
                pipeline: pipeline.pipeline(),
                vertex_buffer: geometry.vertex_buffer(),
                index_buffer: geometry.index_buffer(),
                bind_group,
                draw,
            },
        );
        device.submit(target);

        tracing::trace!(time = frame.time, %draw, "frame submitted");
        FrameOutcome::Presented(draw)
    }
}
