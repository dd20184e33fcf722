use std::fmt;

use thiserror::Error;

use crate::shaders::ProgramKind;

/// Shader stage named in compile diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failures surfaced while building or driving the tearing scene.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create {resource}: {reason}")]
    ResourceCreation {
        resource: &'static str,
        reason: String,
    },
    #[error("{program} {stage} shader failed to compile:\n{log}")]
    ShaderCompile {
        program: ProgramKind,
        stage: StageKind,
        log: String,
    },
    #[error("{program} program failed to link:\n{log}")]
    ShaderLink { program: ProgramKind, log: String },
    #[error("invalid mesh parameters: {0}")]
    InvalidMesh(String),
}

impl RenderError {
    pub(crate) fn resource(resource: &'static str, reason: impl Into<String>) -> Self {
        RenderError::ResourceCreation {
            resource,
            reason: reason.into(),
        }
    }
}

/// Runs `build` inside a device error scope and returns whatever error the
/// scope captured alongside the produced value.
pub(crate) fn scoped<T>(
    device: &wgpu::Device,
    filter: wgpu::ErrorFilter,
    build: impl FnOnce() -> T,
) -> (T, Option<wgpu::Error>) {
    device.push_error_scope(filter);
    let value = build();
    let captured = pollster::block_on(device.pop_error_scope());
    (value, captured)
}
