use crate::device::{BufferDescriptor, BufferUsage, DeviceContext};
use crate::error::RenderError;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use orbitview_common::CameraParams;

/// GPU layout of the per-frame uniform: one column-major view-projection.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub view_proj: [[f32; 4]; 4],
}

impl Uniforms {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn from_matrix(m: Mat4) -> Self {
        Self {
            view_proj: m.to_cols_array_2d(),
        }
    }
}

/// Camera circling the origin at a fixed radius and height.
///
/// The projection is fixed at construction. Only the orbit angle changes,
/// and it is always `angular_speed * time` with no wrapping.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    params: CameraParams,
    aspect: f32,
    projection: Mat4,
    angle: f64,
}

impl OrbitCamera {
    pub const TARGET: Vec3 = Vec3::ZERO;
    pub const UP: Vec3 = Vec3::Y;

    pub fn new(params: CameraParams, aspect: f32) -> Self {
        let projection = Mat4::perspective_rh(
            params.fov_degrees.to_radians(),
            aspect,
            params.near,
            params.far,
        );
        Self {
            params,
            aspect,
            projection,
            angle: 0.0,
        }
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn angle_at(&self, time: f64) -> f64 {
        self.params.angular_speed * time
    }

    /// Move the camera to its position at `time`.
    pub fn advance(&mut self, time: f64) {
        self.angle = self.angle_at(time);
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn eye_at_angle(&self, angle: f64) -> Vec3 {
        let r = self.params.orbit_radius as f64;
        Vec3::new(
            (r * angle.cos()) as f32,
            self.params.eye_height,
            (r * angle.sin()) as f32,
        )
    }

    pub fn eye(&self) -> Vec3 {
        self.eye_at_angle(self.angle)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Self::TARGET, Self::UP)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

/// Owns the orbit camera, the uniform buffer and the bind group exposing it
/// at group 0 to the vertex stage.
pub struct CameraUniform<D: DeviceContext> {
    camera: OrbitCamera,
    buffer: D::Buffer,
    layout: D::BindGroupLayout,
    bind_group: D::BindGroup,
}

impl<D: DeviceContext> CameraUniform<D> {
    pub fn init(device: &D, params: CameraParams, aspect: f32) -> Result<Self, RenderError> {
        let camera = OrbitCamera::new(params, aspect);
        let buffer = device.create_buffer(&BufferDescriptor {
            label: "camera uniforms",
            size: Uniforms::SIZE,
            usage: BufferUsage::UNIFORM,
        })?;
        device.write_buffer(
            &buffer,
            0,
            bytemuck::bytes_of(&Uniforms::from_matrix(camera.view_projection())),
        );
        let layout = device.create_uniform_layout("camera bind group layout")?;
        let bind_group = device.create_uniform_bind_group("camera bind group", &layout, &buffer)?;

        tracing::debug!(
            aspect,
            fov_degrees = params.fov_degrees,
            radius = params.orbit_radius,
            "camera uniform ready"
        );

        Ok(Self {
            camera,
            buffer,
            layout,
            bind_group,
        })
    }

    /// Recompute the view-projection for `time` and queue it for upload.
    pub fn update(&mut self, device: &D, time: f64) -> Mat4 {
        self.camera.advance(time);
        let vp = self.camera.view_projection();
        device.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&Uniforms::from_matrix(vp)));
        vp
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn buffer(&self) -> &D::Buffer {
        &self.buffer
    }

    pub fn bind_group_layout(&self) -> &D::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &D::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingDevice;
    use glam::Vec4;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn camera() -> OrbitCamera {
        OrbitCamera::new(CameraParams::default(), 16.0 / 9.0)
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn angle_follows_time() {
        let cam = camera();
        assert_eq!(cam.angle_at(0.0), 0.0);
        assert!((cam.angle_at(250.0) - 1.0).abs() < 1e-12);
        // no wrap past 2*pi
        assert!(cam.angle_at(10_000.0) > 2.0 * PI);
    }

    #[test]
    fn eye_traces_the_orbit() {
        let cam = camera();
        let r = cam.params().orbit_radius;
        let h = cam.params().eye_height;
        assert!(close(cam.eye_at_angle(0.0), Vec3::new(r, h, 0.0)));
        assert!(close(cam.eye_at_angle(FRAC_PI_2), Vec3::new(0.0, h, r)));
        for step in 0..16 {
            let theta = step as f64 * 0.7;
            let expected = Vec3::new(
                r * (theta.cos() as f32),
                h,
                r * (theta.sin() as f32),
            );
            assert!(close(cam.eye_at_angle(theta), expected));
        }
    }

    #[test]
    fn view_projection_is_projection_times_view() {
        let mut cam = camera();
        let projection = cam.projection_matrix();
        for time in [0.0, 16.7, 250.0, 9_000.0] {
            cam.advance(time);
            assert_eq!(cam.projection_matrix(), projection);
            assert_eq!(cam.view_projection(), projection * cam.view_matrix());
        }
    }

    #[test]
    fn origin_projects_to_screen_centre() {
        let mut cam = camera();
        cam.advance(123.0);
        let clip = cam.view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn nearer_point_on_a_ray_has_smaller_depth() {
        let cam = camera();
        let vp = cam.view_projection();
        let eye = cam.eye();
        let dir = (OrbitCamera::TARGET - eye).normalize();
        let project = |p: Vec3| {
            let clip = vp * p.extend(1.0);
            clip.truncate() / clip.w
        };
        let near = project(eye + dir * 3.5);
        let far = project(eye + dir * 4.5);
        assert!((near.x - far.x).abs() < 1e-4 && (near.y - far.y).abs() < 1e-4);
        // Less comparison keeps the nearer fragment
        assert!(near.z < far.z);
    }

    #[test]
    fn update_writes_matrix_bytes() {
        let device = RecordingDevice::new(1600, 900);
        let mut uniform = CameraUniform::init(&device, CameraParams::default(), 16.0 / 9.0)
            .ok()
            .expect("camera init");
        let vp = uniform.update(&device, 250.0);
        assert!((uniform.camera().angle() - 1.0).abs() < 1e-12);

        let bytes = device.buffer_contents(uniform.buffer());
        assert_eq!(bytes.len() as u64, Uniforms::SIZE);
        assert_eq!(bytes, bytemuck::bytes_of(&Uniforms::from_matrix(vp)));
    }

    #[test]
    fn uniform_is_sixty_four_bytes() {
        assert_eq!(Uniforms::SIZE, 64);
    }
}
