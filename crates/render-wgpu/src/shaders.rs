/// WGSL shader for the heightmap terrain.
///
/// Colour is a grayscale ramp over the mesh's height range, lit by a single
/// directional light.
pub const TERRAIN_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    // x = min height, y = max height
    height_range: vec4<f32>,
    light_dir: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) height: f32,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let span = max(uniforms.height_range.y - uniforms.height_range.x, 1e-5);

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(vertex.position, 1.0);
    out.normal = vertex.normal;
    out.height = (vertex.position.y - uniforms.height_range.x) / span;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let light_dir = normalize(uniforms.light_dir.xyz);
    let ambient = 0.35;
    let diffuse = max(dot(normalize(in.normal), light_dir), 0.0);
    let lighting = ambient + diffuse * 0.65;
    let shade = mix(0.15, 1.0, clamp(in.height, 0.0, 1.0));
    return vec4<f32>(vec3<f32>(shade * lighting), 1.0);
}

@fragment
fn fs_wireframe(in: VertexOutput) -> @location(0) vec4<f32> {
    let shade = mix(0.3, 1.0, clamp(in.height, 0.0, 1.0));
    return vec4<f32>(0.2 * shade, 0.9 * shade, 0.4 * shade, 1.0);
}
"#;
