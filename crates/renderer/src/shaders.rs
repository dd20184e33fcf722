//! GLSL sources for the three scene programs and the helpers that turn them
//! into shader modules.
//!
//! Every program shares one vertex layout (see [`crate::geometry::Vertex`]) and
//! one std140 uniform block, so a program that ignores `time` or the cell
//! indices still accepts them. Sources are validated through naga before they
//! reach the device; the same check runs in unit tests without a GPU.

use std::borrow::Cow;
use std::fmt;

use wgpu::naga::front::glsl::{Frontend, Options};
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::ShaderStage;

use crate::error::{scoped, RenderError, StageKind};
use crate::noise::{HASH_MULTIPLIER, NOISE_SPEED, NOISE_STRENGTH};

/// The three programs the scene is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Static textured quad for the wood frame.
    Frame,
    /// Textured plane used both to stamp the stencil and to draw the intact photo.
    StencilPlane,
    /// Noise-displaced plane drawn from the gapped mesh.
    TearingPlane,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 3] = [
        ProgramKind::Frame,
        ProgramKind::StencilPlane,
        ProgramKind::TearingPlane,
    ];

    /// Uniforms the program recognises.
    pub fn uniforms(self) -> &'static [UniformName] {
        match self {
            ProgramKind::Frame | ProgramKind::StencilPlane => &[
                UniformName::Projection,
                UniformName::View,
                UniformName::Model,
                UniformName::Img,
            ],
            ProgramKind::TearingPlane => &[
                UniformName::Projection,
                UniformName::View,
                UniformName::Model,
                UniformName::Img,
                UniformName::Time,
                UniformName::TranslateY,
            ],
        }
    }

    pub fn accepts(self, name: UniformName) -> bool {
        self.uniforms().contains(&name)
    }

    pub fn vertex_source(self) -> String {
        match self {
            ProgramKind::Frame | ProgramKind::StencilPlane => {
                format!("{VERTEX_PRELUDE}{SCENE_BLOCK}{PLANE_VERTEX_MAIN}")
            }
            ProgramKind::TearingPlane => format!(
                "{VERTEX_PRELUDE}{SCENE_BLOCK}{noise}{TEARING_VERTEX_MAIN}",
                noise = noise_prelude()
            ),
        }
    }

    pub fn fragment_source(self) -> String {
        format!("{FRAGMENT_PRELUDE}{SCENE_BLOCK}{TEXTURED_FRAGMENT_MAIN}")
    }

    pub fn source(self, stage: StageKind) -> String {
        match stage {
            StageKind::Vertex => self.vertex_source(),
            StageKind::Fragment => self.fragment_source(),
        }
    }
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramKind::Frame => f.write_str("frame"),
            ProgramKind::StencilPlane => f.write_str("stencil-plane"),
            ProgramKind::TearingPlane => f.write_str("tearing-plane"),
        }
    }
}

/// Uniform names a draw step may bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformName {
    Projection,
    View,
    Model,
    Img,
    Time,
    TranslateY,
}

impl UniformName {
    pub fn glsl_name(self) -> &'static str {
        match self {
            UniformName::Projection => "projection",
            UniformName::View => "view",
            UniformName::Model => "model",
            UniformName::Img => "img",
            UniformName::Time => "time",
            UniformName::TranslateY => "translateY",
        }
    }
}

impl fmt::Display for UniformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

/// Parses and validates one stage with naga, returning the diagnostic text on failure.
pub fn validate_glsl(source: &str, stage: StageKind) -> Result<(), String> {
    let naga_stage = naga_stage(stage);
    let module = Frontend::default()
        .parse(&Options::from(naga_stage), source)
        .map_err(|errors| errors.to_string())?;
    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|err| err.to_string())?;
    Ok(())
}

/// Compiles one stage of `program` into a shader module.
pub(crate) fn compile_stage(
    device: &wgpu::Device,
    program: ProgramKind,
    stage: StageKind,
) -> Result<wgpu::ShaderModule, RenderError> {
    let source = program.source(stage);
    validate_glsl(&source, stage).map_err(|log| RenderError::ShaderCompile {
        program,
        stage,
        log,
    })?;

    let label = format!("{program} {stage}");
    let (module, captured) = scoped(device, wgpu::ErrorFilter::Validation, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Owned(source),
                stage: naga_stage(stage),
                defines: &[],
            },
        })
    });
    match captured {
        Some(err) => Err(RenderError::ShaderCompile {
            program,
            stage,
            log: err.to_string(),
        }),
        None => Ok(module),
    }
}

fn naga_stage(stage: StageKind) -> ShaderStage {
    match stage {
        StageKind::Vertex => ShaderStage::Vertex,
        StageKind::Fragment => ShaderStage::Fragment,
    }
}

fn glsl_float(value: f32) -> String {
    // Debug formatting always keeps a decimal point or exponent.
    format!("{value:?}")
}

fn noise_prelude() -> String {
    format!(
        r"#define TEAR_HASH_MULTIPLIER {hash}
#define TEAR_NOISE_SPEED {speed}
#define TEAR_NOISE_STRENGTH {strength}

float tear_hash(float n) {{
    return fract(sin(n) * TEAR_HASH_MULTIPLIER);
}}

float tear_noise(float x) {{
    float i = floor(x);
    float f = fract(x);
    float u = f * f * (3.0 - 2.0 * f);
    return mix(tear_hash(i), tear_hash(i + 1.0), u);
}}

",
        hash = glsl_float(HASH_MULTIPLIER),
        speed = glsl_float(NOISE_SPEED),
        strength = glsl_float(NOISE_STRENGTH),
    )
}

const VERTEX_PRELUDE: &str = r"#version 450
layout(location = 0) in vec3 aPos;
layout(location = 1) in vec2 aTexCoord;
layout(location = 2) in float aRowIndex;
layout(location = 3) in float aColIndex;
layout(location = 0) out vec2 TexCoords;

";

const FRAGMENT_PRELUDE: &str = r"#version 450
layout(location = 0) in vec2 TexCoords;
layout(location = 0) out vec4 FragColor;

layout(set = 1, binding = 0) uniform texture2D img_texture;
layout(set = 1, binding = 1) uniform sampler img_sampler;

";

/// Must match `SceneUniforms` in `gpu::uniforms`.
const SCENE_BLOCK: &str = r"layout(std140, set = 0, binding = 0) uniform SceneParams {
    mat4 projection;
    mat4 view;
    mat4 model;
    float time;
    float translateY;
    vec2 _padding;
} scene;

";

const PLANE_VERTEX_MAIN: &str = r"void main() {
    TexCoords = aTexCoord;
    gl_Position = scene.projection * scene.view * scene.model * vec4(aPos, 1.0);
}
";

const TEARING_VERTEX_MAIN: &str = r"void main() {
    float n = tear_noise(aPos.y + scene.time * TEAR_NOISE_SPEED + aColIndex);
    vec3 displaced = aPos + vec3(n, 0.0, 0.0) * TEAR_NOISE_STRENGTH;
    TexCoords = aTexCoord;
    gl_Position = scene.projection * scene.view * scene.model * vec4(displaced, 1.0);
}
";

const TEXTURED_FRAGMENT_MAIN: &str = r"void main() {
    FragColor = texture(sampler2D(img_texture, img_sampler), TexCoords);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_program_validates() {
        for program in ProgramKind::ALL {
            for stage in [StageKind::Vertex, StageKind::Fragment] {
                let source = program.source(stage);
                if let Err(log) = validate_glsl(&source, stage) {
                    panic!("{program} {stage} failed to validate:\n{log}\n{source}");
                }
            }
        }
    }

    #[test]
    fn broken_source_reports_diagnostics() {
        let source = "#version 450\nvoid main() { undefined_symbol = 1.0; }\n";
        let log = validate_glsl(source, StageKind::Fragment).unwrap_err();
        assert!(!log.is_empty());
    }

    #[test]
    fn noise_constants_are_injected() {
        let source = ProgramKind::TearingPlane.vertex_source();
        assert!(source.contains("#define TEAR_HASH_MULTIPLIER 43758.5"));
        assert!(source.contains("#define TEAR_NOISE_SPEED 0.001"));
        assert!(source.contains("#define TEAR_NOISE_STRENGTH 0.04"));
        assert!(!ProgramKind::Frame.vertex_source().contains("tear_noise"));
    }

    #[test]
    fn glsl_floats_keep_a_decimal_point() {
        assert_eq!(glsl_float(1.0), "1.0");
        assert_eq!(glsl_float(0.04), "0.04");
    }

    #[test]
    fn uniform_contracts() {
        assert!(ProgramKind::TearingPlane.accepts(UniformName::Time));
        assert!(ProgramKind::TearingPlane.accepts(UniformName::TranslateY));
        for program in [ProgramKind::Frame, ProgramKind::StencilPlane] {
            assert!(program.accepts(UniformName::Img));
            assert!(!program.accepts(UniformName::Time));
            assert!(!program.accepts(UniformName::TranslateY));
        }
        assert_eq!(UniformName::TranslateY.to_string(), "translateY");
    }
}
