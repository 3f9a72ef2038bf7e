use orbitview_common::{VertexFormat, VertexLayout};
use orbitview_render::{PipelineCompilationError, ShaderSet, ShaderSource};

/// Flat 2D positions straight to clip space, no camera.
pub const PASSTHROUGH_2D_VERT: &str = r#"
@vertex
fn vs_main(@location(0) pos: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(pos, 0.0, 1.0);
}
"#;

/// 2D positions on the z = 0 plane, transformed by the orbit camera.
pub const ORBIT_2D_VERT: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

@vertex
fn vs_main(@location(0) pos: vec2<f32>) -> @builtin(position) vec4<f32> {
    return uniforms.view_proj * vec4<f32>(pos, 0.0, 1.0);
}
"#;

/// 3D positions transformed by the orbit camera.
pub const ORBIT_3D_VERT: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

@vertex
fn vs_main(@location(0) pos: vec3<f32>) -> @builtin(position) vec4<f32> {
    return uniforms.view_proj * vec4<f32>(pos, 1.0);
}
"#;

/// 3D positions plus texture coordinates passed through to the fragment.
pub const ORBIT_UV_VERT: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(vertex.position, 1.0);
    out.uv = vertex.uv;
    return out;
}
"#;

pub const RED_FRAG: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
"#;

/// Colors each fragment from its interpolated texture coordinate.
pub const UV_FRAG: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 1.0 - 0.5 * (uv.x + uv.y), 1.0);
}
"#;

const fn vertex(label: &'static str, code: &'static str) -> ShaderSource {
    ShaderSource {
        label,
        code,
        entry_point: "vs_main",
    }
}

const fn fragment(label: &'static str, code: &'static str) -> ShaderSource {
    ShaderSource {
        label,
        code,
        entry_point: "fs_main",
    }
}

/// Pick the shader pair matching a mesh layout and whether a camera is bound.
pub fn shaders_for(
    layout: &VertexLayout,
    camera: bool,
) -> Result<ShaderSet, PipelineCompilationError> {
    let red = fragment("red fragment", RED_FRAG);
    let set = match (layout.position_format(), layout.has_uv(), camera) {
        (Some(VertexFormat::Float32x2), false, false) => ShaderSet {
            vertex: vertex("passthrough 2d vertex", PASSTHROUGH_2D_VERT),
            fragment: red,
        },
        (Some(VertexFormat::Float32x2), false, true) => ShaderSet {
            vertex: vertex("orbit 2d vertex", ORBIT_2D_VERT),
            fragment: red,
        },
        (Some(VertexFormat::Float32x3), false, true) => ShaderSet {
            vertex: vertex("orbit 3d vertex", ORBIT_3D_VERT),
            fragment: red,
        },
        (Some(VertexFormat::Float32x3), true, true) => ShaderSet {
            vertex: vertex("orbit uv vertex", ORBIT_UV_VERT),
            fragment: fragment("uv fragment", UV_FRAG),
        },
        (position, uv, camera) => {
            return Err(PipelineCompilationError {
                label: "shader selection".into(),
                reason: format!(
                    "no shader for position={position:?} uv={uv} camera={camera}"
                ),
            });
        }
    };
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitview_common::{
        CameraParams, MeshData, MeshKind, PositionComponents, SceneConfig, ScenePreset, cube,
        triangle,
    };

    fn custom(components: PositionComponents, textured: bool) -> SceneConfig {
        SceneConfig {
            mesh: MeshKind::Custom,
            custom_mesh: Some(MeshData {
                name: "custom".into(),
                components,
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                uvs: textured.then(|| vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
                indices: None,
            }),
            ..ScenePreset::Triangle.config()
        }
    }

    #[test]
    fn triangle_without_camera_uses_passthrough() {
        let set = shaders_for(&triangle().vertex_layout(), false).unwrap();
        assert_eq!(set.vertex.code, PASSTHROUGH_2D_VERT);
        assert_eq!(set.fragment.code, RED_FRAG);
    }

    #[test]
    fn cube_with_camera_uses_uv_shaders() {
        let set = shaders_for(&cube().vertex_layout(), true).unwrap();
        assert_eq!(set.vertex.code, ORBIT_UV_VERT);
        assert_eq!(set.fragment.code, UV_FRAG);
    }

    #[test]
    fn cube_without_camera_is_rejected() {
        let err = shaders_for(&cube().vertex_layout(), false).unwrap_err();
        assert!(err.reason.contains("camera=false"));
    }

    #[test]
    fn camera_shaders_bind_group_zero() {
        for code in [ORBIT_2D_VERT, ORBIT_3D_VERT, ORBIT_UV_VERT] {
            assert!(code.contains("@group(0) @binding(0)"));
            assert!(code.contains("fn vs_main"));
        }
        assert!(!PASSTHROUGH_2D_VERT.contains("@group"));
    }

    #[test]
    fn validated_configs_always_have_shaders() {
        let mut configs: Vec<SceneConfig> =
            ScenePreset::ALL.into_iter().map(ScenePreset::config).collect();
        for components in [PositionComponents::Two, PositionComponents::Three] {
            configs.push(custom(components, false));
            configs.push(custom(components, true));
        }

        for base in configs {
            for camera in [None, Some(CameraParams::default())] {
                let config = SceneConfig {
                    camera,
                    ..base.clone()
                };
                let layout = config.build_mesh().unwrap().vertex_layout();
                let shaders = shaders_for(&layout, config.camera.is_some());
                assert_eq!(
                    config.validate().is_ok(),
                    shaders.is_ok(),
                    "mesh={:?} camera={}",
                    layout,
                    config.camera.is_some()
                );
            }
        }
    }
}
