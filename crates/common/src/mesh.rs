use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of position components stored per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionComponents {
    Two,
    Three,
}

impl PositionComponents {
    pub fn count(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

/// A single mesh vertex. 2D meshes ignore `position[2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: Option<[f32; 2]>,
}

impl Vertex {
    pub fn flat(x: f32, y: f32) -> Self {
        Self {
            position: [x, y, 0.0],
            uv: None,
        }
    }

    pub fn textured(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            uv: Some(uv),
        }
    }
}

/// Component format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
}

impl VertexFormat {
    pub fn size(self) -> u64 {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub format: VertexFormat,
    pub offset: u64,
    pub shader_location: u32,
}

/// Interleaved vertex buffer layout: position at location 0, UV at location 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub array_stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn has_uv(&self) -> bool {
        self.attributes.iter().any(|a| a.shader_location == 1)
    }

    pub fn position_format(&self) -> Option<VertexFormat> {
        self.attributes
            .iter()
            .find(|a| a.shader_location == 0)
            .map(|a| a.format)
    }
}

/// Errors from mesh validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    Empty,
    #[error("vertex {index} disagrees with vertex 0 on texture coordinates")]
    MixedAttributes { index: usize },
    #[error("index {value} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        position: usize,
        value: u32,
        vertex_count: usize,
    },
    #[error("element count {0} is not a multiple of 3")]
    NotTriangles(usize),
    #[error("{found} texture coordinates for {expected} vertices")]
    UvCount { expected: usize, found: usize },
}

/// Vertex data plus optional `u32` indices for one triangle-list mesh.
///
/// Construction validates every invariant the GPU relies on, so an accepted
/// `Mesh` can be uploaded without further checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    name: String,
    components: PositionComponents,
    vertices: Vec<Vertex>,
    indices: Option<Vec<u32>>,
}

impl Mesh {
    pub fn new(
        name: impl Into<String>,
        components: PositionComponents,
        vertices: Vec<Vertex>,
        indices: Option<Vec<u32>>,
    ) -> Result<Self, MeshError> {
        let first = vertices.first().ok_or(MeshError::Empty)?;
        let textured = first.uv.is_some();
        if let Some(index) = vertices.iter().position(|v| v.uv.is_some() != textured) {
            return Err(MeshError::MixedAttributes { index });
        }

        let element_count = match &indices {
            Some(indices) => {
                for (position, &value) in indices.iter().enumerate() {
                    if value as usize >= vertices.len() {
                        return Err(MeshError::IndexOutOfRange {
                            position,
                            value,
                            vertex_count: vertices.len(),
                        });
                    }
                }
                indices.len()
            }
            None => vertices.len(),
        };
        if element_count == 0 || element_count % 3 != 0 {
            return Err(MeshError::NotTriangles(element_count));
        }

        Ok(Self {
            name: name.into(),
            components,
            vertices,
            indices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> PositionComponents {
        self.components
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> Option<u32> {
        self.indices.as_ref().map(|i| i.len() as u32)
    }

    /// Number of elements a single draw call must cover.
    pub fn draw_count(&self) -> u32 {
        self.index_count().unwrap_or_else(|| self.vertex_count())
    }

    pub fn triangle_count(&self) -> u32 {
        self.draw_count() / 3
    }

    pub fn is_textured(&self) -> bool {
        self.vertices[0].uv.is_some()
    }

    /// True when every directed edge is matched by exactly one opposite edge,
    /// i.e. the mesh is a consistently wound closed surface whose back faces
    /// are never visible.
    pub fn is_closed(&self) -> bool {
        let elements: Vec<u32> = match &self.indices {
            Some(indices) => indices.clone(),
            None => (0..self.vertex_count()).collect(),
        };
        let mut edges: HashMap<(u32, u32), i32> = HashMap::new();
        for tri in elements.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if a == b {
                    return false;
                }
                *edges.entry((a, b)).or_default() += 1;
            }
        }
        edges
            .iter()
            .all(|(&(a, b), &n)| n == 1 && edges.get(&(b, a)) == Some(&1))
    }

    pub fn vertex_layout(&self) -> VertexLayout {
        let position_format = match self.components {
            PositionComponents::Two => VertexFormat::Float32x2,
            PositionComponents::Three => VertexFormat::Float32x3,
        };
        let mut attributes = vec![VertexAttribute {
            format: position_format,
            offset: 0,
            shader_location: 0,
        }];
        let mut stride = position_format.size();
        if self.is_textured() {
            attributes.push(VertexAttribute {
                format: VertexFormat::Float32x2,
                offset: stride,
                shader_location: 1,
            });
            stride += VertexFormat::Float32x2.size();
        }
        VertexLayout {
            array_stride: stride,
            attributes,
        }
    }

    /// Interleaved vertex bytes matching [`Mesh::vertex_layout`].
    pub fn vertex_bytes(&self) -> Vec<u8> {
        let n = self.components.count();
        let mut floats = Vec::with_capacity(self.vertices.len() * (n + 2));
        for v in &self.vertices {
            floats.extend_from_slice(&v.position[..n]);
            if let Some(uv) = v.uv {
                floats.extend_from_slice(&uv);
            }
        }
        bytemuck::cast_slice(&floats).to_vec()
    }

    pub fn index_bytes(&self) -> Option<Vec<u8>> {
        self.indices
            .as_ref()
            .map(|i| bytemuck::cast_slice(i).to_vec())
    }
}

/// Mesh geometry as written in a scene config file.
///
/// 2D meshes ignore the third position component. `uvs`, when present, must
/// hold one coordinate pair per position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    #[serde(default = "MeshData::default_name")]
    pub name: String,
    pub components: PositionComponents,
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub uvs: Option<Vec<[f32; 2]>>,
    #[serde(default)]
    pub indices: Option<Vec<u32>>,
}

impl MeshData {
    fn default_name() -> String {
        "custom".to_string()
    }

    pub fn build(&self) -> Result<Mesh, MeshError> {
        let vertices = match &self.uvs {
            Some(uvs) => {
                if uvs.len() != self.positions.len() {
                    return Err(MeshError::UvCount {
                        expected: self.positions.len(),
                        found: uvs.len(),
                    });
                }
                self.positions
                    .iter()
                    .zip(uvs)
                    .map(|(&p, &uv)| Vertex::textured(p, uv))
                    .collect()
            }
            None => self
                .positions
                .iter()
                .map(|&position| Vertex { position, uv: None })
                .collect(),
        };
        Mesh::new(
            self.name.clone(),
            self.components,
            vertices,
            self.indices.clone(),
        )
    }
}

/// The flat red test triangle: three 2D vertices, unindexed.
pub fn triangle() -> Mesh {
    let vertices = vec![
        Vertex::flat(-1.0, -1.0),
        Vertex::flat(1.0, -1.0),
        Vertex::flat(0.0, 1.0),
    ];
    Mesh {
        name: "triangle".into(),
        components: PositionComponents::Two,
        vertices,
        indices: None,
    }
}

/// Unit cube centred on the origin: 8 shared corners, 36 indices, CCW faces.
pub fn cube() -> Mesh {
    let p = 0.5_f32;
    let corner = |x: f32, y: f32, z: f32| Vertex::textured([x, y, z], [x + p, y + p]);
    let vertices = vec![
        corner(-p, -p, -p),
        corner(p, -p, -p),
        corner(p, p, -p),
        corner(-p, p, -p),
        corner(-p, -p, p),
        corner(p, -p, p),
        corner(p, p, p),
        corner(-p, p, p),
    ];
    #[rustfmt::skip]
    let indices: Vec<u32> = vec![
        4,5,6, 6,7,4, // +Z
        1,0,3, 3,2,1, // -Z
        5,1,2, 2,6,5, // +X
        0,4,7, 7,3,0, // -X
        7,6,2, 2,3,7, // +Y
        0,1,5, 5,4,0, // -Y
    ];
    Mesh {
        name: "cube".into(),
        components: PositionComponents::Three,
        vertices,
        indices: Some(indices),
    }
}
