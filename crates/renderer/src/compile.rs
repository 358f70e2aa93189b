use std::borrow::Cow;
use std::fmt::Write as _;

use anyhow::{anyhow, Result};
use wgpu::naga::ShaderStage;

use crate::scene::FragmentVariant;
use crate::uniforms::{scalar_slot, UniformSet, MAX_SCALAR_UNIFORMS};

/// Bind group holding the packed scalar block.
pub(crate) const PARAMS_GROUP: u32 = 0;
/// Bind group holding the per-mesh transform.
pub(crate) const MESH_GROUP: u32 = 1;
/// Bind group holding one texture/sampler pair per texture uniform.
pub(crate) const TEXTURE_GROUP: u32 = 2;

/// Compiles the unit-plane vertex shader shared by every mesh.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    create_checked_module(
        device,
        "plane vertex",
        VERTEX_SHADER_GLSL.to_string(),
        ShaderStage::Vertex,
    )
}

/// Wraps the variant's fragment body with a header generated from `uniforms`
/// and compiles it as GLSL.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    variant: FragmentVariant,
    uniforms: &UniformSet,
) -> Result<wgpu::ShaderModule> {
    let wrapped = wrap_fragment(fragment_body(variant), uniforms);
    tracing::trace!(%variant, source = %wrapped, "wrapped fragment shader");
    create_checked_module(
        device,
        &format!("{variant} fragment"),
        wrapped,
        ShaderStage::Fragment,
    )
}

fn create_checked_module(
    device: &wgpu::Device,
    label: &str,
    source: String,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source),
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(anyhow!("failed to compile {label} shader: {err}"));
    }
    Ok(module)
}

/// Produces a self-contained GLSL fragment shader.
///
/// The header declares a std140 block of `vec4` slots and maps every scalar
/// uniform onto its slot with a `#define`, in registration order. Each texture
/// uniform gets a texture/sampler pair in the texture group and a `sampler2D`
/// macro under its own name, so bodies refer to uniforms exactly as registered.
pub(crate) fn wrap_fragment(body: &str, uniforms: &UniformSet) -> String {
    let mut header = String::new();
    let _ = writeln!(header, "#version 450");
    let _ = writeln!(header, "layout(location = 0) in vec2 vUv;");
    let _ = writeln!(header, "layout(location = 0) out vec4 outColor;");
    let _ = writeln!(header);
    let _ = writeln!(
        header,
        "layout(std140, set = {PARAMS_GROUP}, binding = 0) uniform WarpParams {{"
    );
    let _ = writeln!(header, "    vec4 slots[{}];", MAX_SCALAR_UNIFORMS / 4);
    let _ = writeln!(header, "}} params;");
    let _ = writeln!(header);

    for (index, (name, _)) in uniforms.scalars().enumerate() {
        let (slot, component) = scalar_slot(index);
        let swizzle = ['x', 'y', 'z', 'w'][component];
        let _ = writeln!(header, "#define {name} params.slots[{slot}].{swizzle}");
    }
    let _ = writeln!(header);

    for (index, (name, _)) in uniforms.textures().enumerate() {
        let binding = index * 2;
        let _ = writeln!(
            header,
            "layout(set = {TEXTURE_GROUP}, binding = {binding}) uniform texture2D {name}_texture;"
        );
        let _ = writeln!(
            header,
            "layout(set = {TEXTURE_GROUP}, binding = {}) uniform sampler {name}_sampler;",
            binding + 1
        );
        let _ = writeln!(
            header,
            "#define {name} sampler2D({name}_texture, {name}_sampler)"
        );
    }

    format!("{header}\n{SIMPLEX_NOISE}\n{body}")
}

fn fragment_body(variant: FragmentVariant) -> &'static str {
    match variant {
        FragmentVariant::Warp => WARP_BODY,
        FragmentVariant::Drift => DRIFT_BODY,
        FragmentVariant::Ripple => RIPPLE_BODY,
    }
}

/// 2D simplex noise (Ashima Arts / Ian McEwan, public domain).
const SIMPLEX_NOISE: &str = r"vec3 permute(vec3 x) { return mod(((x * 34.0) + 1.0) * x, 289.0); }

float snoise(vec2 v) {
    const vec4 C = vec4(0.211324865405187, 0.366025403784439,
                        -0.577350269189626, 0.024390243902439);
    vec2 i = floor(v + dot(v, C.yy));
    vec2 x0 = v - i + dot(i, C.xx);
    vec2 i1 = vec2(0.0, 1.0);
    if (x0.x > x0.y) {
        i1 = vec2(1.0, 0.0);
    }
    vec4 x12 = x0.xyxy + C.xxzz;
    x12.xy -= i1;
    i = mod(i, 289.0);
    vec3 p = permute(permute(i.y + vec3(0.0, i1.y, 1.0)) + i.x + vec3(0.0, i1.x, 1.0));
    vec3 m = max(0.5 - vec3(dot(x0, x0), dot(x12.xy, x12.xy), dot(x12.zw, x12.zw)), 0.0);
    m = m * m;
    m = m * m;
    vec3 x = 2.0 * fract(p * C.www) - 1.0;
    vec3 h = abs(x) - 0.5;
    vec3 ox = floor(x + 0.5);
    vec3 a0 = x - ox;
    m *= 1.79284291400159 - 0.85373472095314 * (a0 * a0 + h * h);
    vec3 g;
    g.x = a0.x * x0.x + h.x * x0.y;
    g.yz = a0.yz * x12.xz + h.yz * x12.yw;
    return 130.0 * dot(m, g);
}
";

const WARP_BODY: &str = r"void main() {
    float n = snoise(vUv * uFrequency + uTime * uSpeed);
    outColor = texture(uTexture, vUv + n * uStrength);
}
";

const DRIFT_BODY: &str = r"void main() {
    vec2 scroll = vec2(uTime * uSpeed * 0.1, 0.0);
    vec2 grain = texture(uNoise, vUv + scroll).rg - 0.5;
    float n = snoise(vUv * uFrequency + grain + uTime * uSpeed);
    outColor = texture(uTexture, vUv + (grain * 0.5 + n * 0.25) * uStrength);
}
";

const RIPPLE_BODY: &str = r"void main() {
    vec2 centered = vUv - 0.5;
    float radius = length(centered);
    float phase = radius * uFrequency * 6.2831853 - uTime * uSpeed * 4.0;
    float wobble = snoise(centered * uFrequency + uTime * uSpeed * 0.5);
    vec2 direction = centered / max(radius, 0.0001);
    vec2 offset = direction * sin(phase + wobble) * 0.05 * uStrength;
    outColor = texture(uTexture, vUv + offset);
}
";

/// Unit plane drawn as two triangles, transformed by the per-mesh MVP.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 vUv;

layout(std140, set = 1, binding = 0) uniform MeshParams {
    mat4 mvp;
} u_mesh;

const vec2 corners[6] = vec2[6](
    vec2(-0.5, -0.5),
    vec2(0.5, -0.5),
    vec2(0.5, 0.5),
    vec2(-0.5, -0.5),
    vec2(0.5, 0.5),
    vec2(-0.5, 0.5)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 corner = corners[vertex_index];
    vUv = corner + vec2(0.5, 0.5);
    gl_Position = u_mesh.mvp * vec4(corner, 0.0, 1.0);
}
";

/// Scalar uniforms every fragment body reads besides `uTime`, with defaults.
pub const REQUIRED_SCALARS: [(&str, f32); 3] =
    [("uSpeed", 0.5), ("uFrequency", 2.0), ("uStrength", 1.0)];

/// Texture uniforms every fragment body may sample.
pub const REQUIRED_TEXTURES: [&str; 2] = ["uTexture", "uNoise"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::TextureSlot;

    fn demo_uniforms() -> UniformSet {
        let mut set = UniformSet::new();
        for (name, value) in REQUIRED_SCALARS {
            set.register_scalar(name, value).unwrap();
        }
        for (index, name) in REQUIRED_TEXTURES.into_iter().enumerate() {
            set.register_texture(name, TextureSlot(index as u32)).unwrap();
        }
        set
    }

    #[test]
    fn header_maps_scalars_in_registration_order() {
        let wrapped = wrap_fragment(WARP_BODY, &demo_uniforms());
        assert!(wrapped.starts_with("#version 450"));
        assert!(wrapped.contains("#define uTime params.slots[0].x"));
        assert!(wrapped.contains("#define uSpeed params.slots[0].y"));
        assert!(wrapped.contains("#define uFrequency params.slots[0].z"));
        assert!(wrapped.contains("#define uStrength params.slots[0].w"));
        assert!(wrapped.contains("vec4 slots[4];"));
    }

    #[test]
    fn header_binds_texture_pairs() {
        let wrapped = wrap_fragment(WARP_BODY, &demo_uniforms());
        assert!(wrapped
            .contains("layout(set = 2, binding = 0) uniform texture2D uTexture_texture;"));
        assert!(wrapped.contains("layout(set = 2, binding = 1) uniform sampler uTexture_sampler;"));
        assert!(wrapped.contains("layout(set = 2, binding = 2) uniform texture2D uNoise_texture;"));
        assert!(wrapped.contains("#define uNoise sampler2D(uNoise_texture, uNoise_sampler)"));
    }

    #[test]
    fn every_variant_body_carries_noise_and_main() {
        for variant in FragmentVariant::ALL {
            let wrapped = wrap_fragment(fragment_body(variant), &demo_uniforms());
            assert!(wrapped.contains("float snoise(vec2 v)"));
            assert_eq!(wrapped.matches("void main()").count(), 1);
            assert!(wrapped.contains("uTime"));
        }
    }

    #[test]
    fn fifth_scalar_spills_into_second_slot() {
        let mut set = demo_uniforms();
        set.register_scalar("uExtra", 0.0).unwrap();
        let wrapped = wrap_fragment(WARP_BODY, &set);
        assert!(wrapped.contains("#define uExtra params.slots[1].x"));
    }
}
