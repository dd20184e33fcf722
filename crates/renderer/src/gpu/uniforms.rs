use std::collections::HashSet;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::plan::{TextureKind, UniformValue};
use crate::shaders::{ProgramKind, UniformName};

/// CPU mirror of the `SceneParams` std140 block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct SceneUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub time: f32,
    pub translate_y: f32,
    pub _padding: [f32; 2],
}

impl SceneUniforms {
    pub fn new() -> Self {
        Self {
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            time: 0.0,
            translate_y: 0.0,
            _padding: [0.0; 2],
        }
    }
}

impl Default for SceneUniforms {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies named bindings for one program, checking them against its uniform set.
///
/// Unknown names are reported once per program and name, then ignored.
pub(crate) struct UniformScope<'a> {
    program: ProgramKind,
    uniforms: &'a mut SceneUniforms,
    texture: &'a mut Option<TextureKind>,
    warned: &'a mut HashSet<(ProgramKind, UniformName)>,
}

impl<'a> UniformScope<'a> {
    pub fn new(
        program: ProgramKind,
        uniforms: &'a mut SceneUniforms,
        texture: &'a mut Option<TextureKind>,
        warned: &'a mut HashSet<(ProgramKind, UniformName)>,
    ) -> Self {
        Self {
            program,
            uniforms,
            texture,
            warned,
        }
    }

    /// Returns whether the binding was applied.
    pub fn bind(&mut self, name: UniformName, value: UniformValue) -> bool {
        if !self.program.accepts(name) {
            if self.warned.insert((self.program, name)) {
                tracing::warn!(program = %self.program, uniform = %name, "program has no such uniform; ignoring binding");
            }
            return false;
        }

        match (name, value) {
            (UniformName::Projection, UniformValue::Matrix(m)) => {
                self.uniforms.projection = m.to_cols_array_2d()
            }
            (UniformName::View, UniformValue::Matrix(m)) => {
                self.uniforms.view = m.to_cols_array_2d()
            }
            (UniformName::Model, UniformValue::Matrix(m)) => {
                self.uniforms.model = m.to_cols_array_2d()
            }
            (UniformName::Time, UniformValue::Float(v)) => self.uniforms.time = v,
            (UniformName::TranslateY, UniformValue::Float(v)) => self.uniforms.translate_y = v,
            (UniformName::Img, UniformValue::Texture(kind)) => *self.texture = Some(kind),
            (name, value) => {
                if self.warned.insert((self.program, name)) {
                    tracing::warn!(program = %self.program, uniform = %name, ?value, "binding type does not match uniform; ignoring");
                }
                return false;
            }
        }
        true
    }

    pub fn bind_all(&mut self, bindings: impl IntoIterator<Item = (UniformName, UniformValue)>) {
        for (name, value) in bindings {
            self.bind(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use super::*;

    #[test]
    fn scene_uniforms_match_std140_layout() {
        assert_eq!(size_of::<SceneUniforms>(), 208);
        assert_eq!(offset_of!(SceneUniforms, projection), 0);
        assert_eq!(offset_of!(SceneUniforms, view), 64);
        assert_eq!(offset_of!(SceneUniforms, model), 128);
        assert_eq!(offset_of!(SceneUniforms, time), 192);
        assert_eq!(offset_of!(SceneUniforms, translate_y), 196);
    }

    #[test]
    fn scope_applies_known_bindings() {
        let mut uniforms = SceneUniforms::new();
        let mut texture = None;
        let mut warned = HashSet::new();
        let model = Mat4::from_translation(glam::Vec3::new(0.0, 0.2, -2.1));
        {
            let mut scope = UniformScope::new(
                ProgramKind::TearingPlane,
                &mut uniforms,
                &mut texture,
                &mut warned,
            );
            assert!(scope.bind(UniformName::Model, UniformValue::Matrix(model)));
            assert!(scope.bind(UniformName::Time, UniformValue::Float(1500.0)));
            assert!(scope.bind(UniformName::TranslateY, UniformValue::Float(0.3)));
            assert!(scope.bind(UniformName::Img, UniformValue::Texture(TextureKind::Photo)));
        }
        assert_eq!(uniforms.model, model.to_cols_array_2d());
        assert_eq!(uniforms.time, 1500.0);
        assert_eq!(uniforms.translate_y, 0.3);
        assert_eq!(texture, Some(TextureKind::Photo));
        assert!(warned.is_empty());
    }

    #[test]
    fn unknown_uniform_is_a_noop_reported_once() {
        let mut uniforms = SceneUniforms::new();
        let mut texture = None;
        let mut warned = HashSet::new();
        let mut scope = UniformScope::new(
            ProgramKind::Frame,
            &mut uniforms,
            &mut texture,
            &mut warned,
        );
        assert!(!scope.bind(UniformName::Time, UniformValue::Float(10.0)));
        assert!(!scope.bind(UniformName::Time, UniformValue::Float(20.0)));
        drop(scope);
        assert_eq!(uniforms.time, 0.0);
        assert_eq!(warned.len(), 1);
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let mut uniforms = SceneUniforms::new();
        let mut texture = None;
        let mut warned = HashSet::new();
        let mut scope = UniformScope::new(
            ProgramKind::StencilPlane,
            &mut uniforms,
            &mut texture,
            &mut warned,
        );
        assert!(!scope.bind(UniformName::Img, UniformValue::Float(1.0)));
        drop(scope);
        assert_eq!(texture, None);
    }
}
