use crate::device::{BufferDescriptor, BufferUsage, DeviceContext, DrawCall};
use crate::error::ResourceAllocationError;
use orbitview_common::{Mesh, VertexLayout};

/// Device-resident copy of the scene's single mesh.
///
/// Buffers are sized exactly to the mesh data and written once at upload.
pub struct GeometryStore<D: DeviceContext> {
    vertex_buffer: D::Buffer,
    index_buffer: Option<D::Buffer>,
    vertex_layout: VertexLayout,
    draw: DrawCall,
    vertex_bytes: u64,
    index_bytes: Option<u64>,
}

impl<D: DeviceContext> GeometryStore<D> {
    pub fn upload(device: &D, mesh: &Mesh) -> Result<Self, ResourceAllocationError> {
        let vertex_data = mesh.vertex_bytes();
        let vertex_buffer = create_filled(
            device,
            &format!("{} vertices", mesh.name()),
            BufferUsage::VERTEX,
            &vertex_data,
        )?;

        let index_data = mesh.index_bytes();
        let index_buffer = match &index_data {
            Some(data) => Some(create_filled(
                device,
                &format!("{} indices", mesh.name()),
                BufferUsage::INDEX,
                data,
            )?),
            None => None,
        };

        let draw = match mesh.index_count() {
            Some(n) => DrawCall::Indexed(n),
            None => DrawCall::Vertices(mesh.vertex_count()),
        };

        tracing::debug!(
            mesh = mesh.name(),
            vertex_bytes = vertex_data.len(),
            index_bytes = index_data.as_ref().map(Vec::len),
            "uploaded mesh"
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_layout: mesh.vertex_layout(),
            draw,
            vertex_bytes: vertex_data.len() as u64,
            index_bytes: index_data.map(|d| d.len() as u64),
        })
    }

    pub fn vertex_buffer(&self) -> &D::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> Option<&D::Buffer> {
        self.index_buffer.as_ref()
    }

    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.vertex_layout
    }

    pub fn draw_call(&self) -> DrawCall {
        self.draw
    }

    pub fn vertex_bytes(&self) -> u64 {
        self.vertex_bytes
    }

    pub fn index_bytes(&self) -> Option<u64> {
        self.index_bytes
    }
}

fn create_filled<D: DeviceContext>(
    device: &D,
    label: &str,
    usage: BufferUsage,
    data: &[u8],
) -> Result<D::Buffer, ResourceAllocationError> {
    let size = data.len() as u64;
    let max = device.limits().max_buffer_size;
    if size > max {
        return Err(ResourceAllocationError {
            label: label.to_string(),
            size,
            reason: format!("exceeds device max_buffer_size of {max}"),
        });
    }
    let buffer = device.create_buffer(&BufferDescriptor { label, size, usage })?;
    device.write_buffer(&buffer, 0, data);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DeviceEvent, RecordingDevice};
    use orbitview_common::{cube, triangle};

    #[test]
    fn triangle_upload_is_vertex_only() {
        let device = RecordingDevice::new(800, 600);
        let store = GeometryStore::upload(&device, &triangle()).unwrap();
        assert_eq!(store.draw_call(), DrawCall::Vertices(3));
        assert!(store.index_buffer().is_none());
        assert_eq!(store.vertex_bytes(), 24);
        assert_eq!(device.buffer_contents(store.vertex_buffer()).len(), 24);
    }

    #[test]
    fn cube_upload_writes_both_buffers_once() {
        let device = RecordingDevice::new(800, 600);
        let mesh = cube();
        let store = GeometryStore::upload(&device, &mesh).unwrap();
        assert_eq!(store.draw_call(), DrawCall::Indexed(36));
        assert_eq!(store.index_bytes(), Some(144));

        let index = store.index_buffer().unwrap();
        assert_eq!(device.buffer_contents(index), mesh.index_bytes().unwrap());
        assert_eq!(device.buffer_usage(index), Some(BufferUsage::INDEX));

        let writes = device
            .events()
            .iter()
            .filter(|e| matches!(e, DeviceEvent::WriteBuffer { .. }))
            .count();
        assert_eq!(writes, 2);
    }

    #[test]
    fn repeated_uploads_have_identical_sizes() {
        let device = RecordingDevice::new(800, 600);
        let a = GeometryStore::upload(&device, &cube()).unwrap();
        let b = GeometryStore::upload(&device, &cube()).unwrap();
        assert_eq!(a.vertex_bytes(), b.vertex_bytes());
        assert_eq!(a.index_bytes(), b.index_bytes());
    }

    #[test]
    fn oversized_mesh_is_rejected() {
        let device = RecordingDevice::new(800, 600).with_max_buffer_size(16);
        let err = GeometryStore::upload(&device, &triangle())
            .err()
            .expect("upload should fail");
        assert_eq!(err.size, 24);
        assert!(err.reason.contains("max_buffer_size"));
        assert!(device.events().is_empty());
    }
}
