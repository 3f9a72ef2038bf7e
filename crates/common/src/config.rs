use crate::mesh::{self, Mesh, MeshData, MeshError, PositionComponents};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which mesh the scene renders. `Custom` reads `custom_mesh` from the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeshKind {
    Triangle,
    Cube,
    Custom,
}

/// Orbit camera parameters. Angles are in the units noted per field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub orbit_radius: f32,
    pub eye_height: f32,
    /// Radians of orbit per unit of frame time (milliseconds).
    pub angular_speed: f64,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
            orbit_radius: 4.0,
            eye_height: 2.0,
            angular_speed: 0.004,
        }
    }
}

/// Named scene presets selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePreset {
    Triangle,
    Cube,
    CubeNoDepth,
}

impl ScenePreset {
    pub const ALL: [ScenePreset; 3] = [Self::Triangle, Self::Cube, Self::CubeNoDepth];

    pub fn name(self) -> &'static str {
        match self {
            Self::Triangle => "triangle",
            Self::Cube => "cube",
            Self::CubeNoDepth => "cube-no-depth",
        }
    }

    pub fn config(self) -> SceneConfig {
        match self {
            Self::Triangle => SceneConfig {
                mesh: MeshKind::Triangle,
                depth_test: false,
                camera: None,
                clear_color: SceneConfig::BLACK,
                custom_mesh: None,
            },
            Self::Cube => SceneConfig {
                mesh: MeshKind::Cube,
                depth_test: true,
                camera: Some(CameraParams::default()),
                clear_color: SceneConfig::BLACK,
                custom_mesh: None,
            },
            Self::CubeNoDepth => SceneConfig {
                depth_test: false,
                ..Self::Cube.config()
            },
        }
    }
}

impl std::str::FromStr for ScenePreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

/// Errors from loading or validating a scene configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config extension: {0:?}")]
    UnsupportedFormat(String),
    #[error("unknown scene preset: {0}")]
    UnknownPreset(String),
    #[error("invalid camera parameter {field}: {reason}")]
    InvalidCamera { field: &'static str, reason: String },
    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),
    #[error("{0} mesh is 3D and needs a camera")]
    MissingCamera(String),
    #[error("unsupported mesh {mesh}: {reason}")]
    UnsupportedMesh { mesh: String, reason: &'static str },
}

/// Everything needed to set up one test scene.
///
/// A single config covers the triangle, the depth-tested cube and the cube
/// without depth; the renderer picks its resources from these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub mesh: MeshKind,
    #[serde(default)]
    pub depth_test: bool,
    #[serde(default)]
    pub camera: Option<CameraParams>,
    #[serde(default = "SceneConfig::black")]
    pub clear_color: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_mesh: Option<MeshData>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        ScenePreset::Cube.config()
    }
}

impl SceneConfig {
    pub const BLACK: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

    fn black() -> [f64; 4] {
        Self::BLACK
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml` or `.json` file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let text = std::fs::read_to_string(path)?;
        match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text),
            "json" => Self::from_json_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(ext)),
        }
    }

    /// Build the mesh this config selects. Built-in meshes never fail.
    pub fn build_mesh(&self) -> Result<Mesh, MeshError> {
        match (self.mesh, &self.custom_mesh) {
            (MeshKind::Triangle, _) => Ok(mesh::triangle()),
            (MeshKind::Cube, _) => Ok(mesh::cube()),
            (MeshKind::Custom, Some(data)) => data.build(),
            (MeshKind::Custom, None) => Err(MeshError::Empty),
        }
    }

    /// Check the camera parameters and that the mesh/camera combination is
    /// one the renderer has shaders for: 2D meshes without texture
    /// coordinates, or 3D meshes viewed through a camera.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(cam) = &self.camera {
            validate_camera(cam)?;
        }

        let mesh = self.build_mesh()?;
        match mesh.components() {
            PositionComponents::Three if self.camera.is_none() => {
                Err(ConfigError::MissingCamera(mesh.name().to_string()))
            }
            PositionComponents::Two if mesh.is_textured() => Err(ConfigError::UnsupportedMesh {
                mesh: mesh.name().to_string(),
                reason: "texture coordinates need 3D positions",
            }),
            _ => Ok(()),
        }
    }
}

fn validate_camera(cam: &CameraParams) -> Result<(), ConfigError> {
    let invalid = |field, reason: &str| {
        Err(ConfigError::InvalidCamera {
            field,
            reason: reason.to_string(),
        })
    };
    if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
        return invalid("fov_degrees", "must be within (0, 180)");
    }
    if !cam.near.is_finite() || cam.near <= 0.0 {
        return invalid("near", "must be positive and finite");
    }
    if !cam.far.is_finite() || cam.far <= cam.near {
        return invalid("far", "must be finite and exceed near");
    }
    if !cam.orbit_radius.is_finite() || cam.orbit_radius <= 0.0 {
        return invalid("orbit_radius", "must be positive and finite");
    }
    if !cam.eye_height.is_finite() {
        return invalid("eye_height", "must be finite");
    }
    if !cam.angular_speed.is_finite() {
        return invalid("angular_speed", "must be finite");
    }
    Ok(())
}
