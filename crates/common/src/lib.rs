//! Shared types for orbitview: the mesh data model, the built-in test meshes
//! and the scene configuration that selects between them.

mod config;
mod mesh;

pub use config::{CameraParams, ConfigError, MeshKind, SceneConfig, ScenePreset};
pub use mesh::{
    Mesh, MeshData, MeshError, PositionComponents, Vertex, VertexAttribute, VertexFormat,
    VertexLayout, cube, triangle,
};
