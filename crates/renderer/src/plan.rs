//! The ordered draw steps that make up one frame.
//!
//! Each step carries its complete pass state instead of relying on whatever the
//! previous step left enabled, so the stencil/depth/colour transitions between
//! draws are readable in one place:
//!
//! ```text
//! step             program        mesh    colour  depth  stencil
//! stencil-write    StencilPlane   tight   off     off    always -> replace(1)
//! intact-photo     StencilPlane   tight   on      on     equal(1)
//! torn-photo       TearingPlane   gapped  on      on     disabled
//! frame            Frame          tight   on      on     disabled
//! ```

use glam::Mat4;

use crate::camera::{self, Camera};
use crate::runtime::FrameState;
use crate::shaders::{ProgramKind, UniformName};

/// Value written into the stencil buffer by the mask step and tested by the gated step.
pub const STENCIL_REFERENCE: u32 = 1;
/// Background colour cleared at the start of each frame (sRGB).
pub const CLEAR_COLOR: [f64; 4] = [0.961, 0.961, 0.961, 1.0];

/// Stencil behaviour of a draw step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilRule {
    /// Stencil test off; the buffer is neither read nor written.
    Disabled,
    /// Every fragment passes and stamps the reference value.
    WriteReference,
    /// Fragments pass only where the buffer holds the reference value.
    EqualReference,
}

impl StencilRule {
    pub fn face_state(self) -> wgpu::StencilFaceState {
        match self {
            StencilRule::Disabled => wgpu::StencilFaceState::IGNORE,
            StencilRule::WriteReference => wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::Always,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Replace,
            },
            StencilRule::EqualReference => wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::Equal,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Keep,
            },
        }
    }

    pub fn stencil_state(self) -> wgpu::StencilState {
        let face = self.face_state();
        let (read_mask, write_mask) = match self {
            StencilRule::Disabled => (0, 0),
            StencilRule::WriteReference | StencilRule::EqualReference => (0xff, 0xff),
        };
        wgpu::StencilState {
            front: face,
            back: face,
            read_mask,
            write_mask,
        }
    }

    /// CPU model of the rule for one fragment: whether it passes the stencil
    /// test and what the buffer holds afterwards.
    pub fn evaluate(self, stored: u32, reference: u32) -> (bool, u32) {
        match self {
            StencilRule::Disabled => (true, stored),
            StencilRule::WriteReference => (true, reference & 0xff),
            StencilRule::EqualReference => ((stored & 0xff) == (reference & 0xff), stored),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    /// Seamless grid.
    Tight,
    /// Grid with gaps between cells.
    Gapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Photo,
    Frame,
}

/// Where a step's model matrix comes from each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    StencilWindow,
    IntactPhoto,
    TornPhoto,
    Frame,
}

impl ModelSource {
    pub fn matrix(self, state: &FrameState) -> Mat4 {
        match self {
            ModelSource::StencilWindow => camera::stencil_model(),
            ModelSource::IntactPhoto => camera::intact_model(state),
            ModelSource::TornPhoto => camera::torn_model(state),
            ModelSource::Frame => camera::frame_model(),
        }
    }
}

/// A value bound to a named uniform before a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Matrix(Mat4),
    Float(f32),
    Texture(TextureKind),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStep {
    pub label: &'static str,
    pub program: ProgramKind,
    pub color_writes: bool,
    pub depth_writes: bool,
    pub stencil: StencilRule,
    pub mesh: MeshKind,
    pub texture: TextureKind,
    pub model: ModelSource,
    /// Whether `time` and `translateY` are bound for this step.
    pub animated: bool,
}

impl DrawStep {
    /// Named bindings applied before the step's draw call.
    pub fn bindings(&self, state: &FrameState, camera: &Camera) -> Vec<(UniformName, UniformValue)> {
        let mut bindings = vec![
            (UniformName::Projection, UniformValue::Matrix(camera.projection)),
            (UniformName::View, UniformValue::Matrix(camera.view)),
            (UniformName::Model, UniformValue::Matrix(self.model.matrix(state))),
            (UniformName::Img, UniformValue::Texture(self.texture)),
        ];
        if self.animated {
            bindings.push((UniformName::Time, UniformValue::Float(state.elapsed_ms)));
            bindings.push((UniformName::TranslateY, UniformValue::Float(state.translate_y())));
        }
        bindings
    }
}

pub const FRAME_PLAN: [DrawStep; 4] = [
    DrawStep {
        label: "stencil-write",
        program: ProgramKind::StencilPlane,
        color_writes: false,
        depth_writes: false,
        stencil: StencilRule::WriteReference,
        mesh: MeshKind::Tight,
        texture: TextureKind::Photo,
        model: ModelSource::StencilWindow,
        animated: false,
    },
    DrawStep {
        label: "intact-photo",
        program: ProgramKind::StencilPlane,
        color_writes: true,
        depth_writes: true,
        stencil: StencilRule::EqualReference,
        mesh: MeshKind::Tight,
        texture: TextureKind::Photo,
        model: ModelSource::IntactPhoto,
        animated: false,
    },
    DrawStep {
        label: "torn-photo",
        program: ProgramKind::TearingPlane,
        color_writes: true,
        depth_writes: true,
        stencil: StencilRule::Disabled,
        mesh: MeshKind::Gapped,
        texture: TextureKind::Photo,
        model: ModelSource::TornPhoto,
        animated: true,
    },
    DrawStep {
        label: "frame",
        program: ProgramKind::Frame,
        color_writes: true,
        depth_writes: true,
        stencil: StencilRule::Disabled,
        mesh: MeshKind::Tight,
        texture: TextureKind::Frame,
        model: ModelSource::Frame,
        animated: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_order_matches_compositing() {
        let labels: Vec<_> = FRAME_PLAN.iter().map(|step| step.label).collect();
        assert_eq!(
            labels,
            vec!["stencil-write", "intact-photo", "torn-photo", "frame"]
        );
        let last = FRAME_PLAN[FRAME_PLAN.len() - 1];
        assert_eq!(last.program, ProgramKind::Frame);
        assert_eq!(last.stencil, StencilRule::Disabled);
    }

    #[test]
    fn mask_step_writes_nothing_visible() {
        let mask = FRAME_PLAN[0];
        assert!(!mask.color_writes);
        assert!(!mask.depth_writes);
        assert_eq!(mask.stencil, StencilRule::WriteReference);
    }

    #[test]
    fn gated_step_only_draws_where_mask_stamped() {
        // Simulate a row of pixels: the mask covers the middle third.
        let width = 30;
        let mask_covers = |x: usize| (10..20).contains(&x);
        let mut stencil = vec![0u32; width];

        for (x, value) in stencil.iter_mut().enumerate() {
            if mask_covers(x) {
                let (_, next) = FRAME_PLAN[0].stencil.evaluate(*value, STENCIL_REFERENCE);
                *value = next;
            }
        }

        // The intact photo moves and may cover every pixel.
        for (x, value) in stencil.iter().enumerate() {
            let (passes, after) = FRAME_PLAN[1].stencil.evaluate(*value, STENCIL_REFERENCE);
            assert_eq!(passes, mask_covers(x), "pixel {x}");
            assert_eq!(after, *value);
        }
    }

    #[test]
    fn ungated_steps_ignore_the_buffer() {
        for step in &FRAME_PLAN[2..] {
            assert_eq!(step.stencil.evaluate(0, STENCIL_REFERENCE), (true, 0));
            assert_eq!(step.stencil.stencil_state().write_mask, 0);
        }
    }

    #[test]
    fn face_states_follow_rules() {
        let write = StencilRule::WriteReference.face_state();
        assert_eq!(write.compare, wgpu::CompareFunction::Always);
        assert_eq!(write.pass_op, wgpu::StencilOperation::Replace);
        assert_eq!(write.fail_op, wgpu::StencilOperation::Keep);
        let equal = StencilRule::EqualReference.face_state();
        assert_eq!(equal.compare, wgpu::CompareFunction::Equal);
        assert_eq!(equal.pass_op, wgpu::StencilOperation::Keep);
    }

    #[test]
    fn only_tearing_step_binds_animation_uniforms() {
        let camera = Camera::new(1280, 720);
        let state = FrameState::at(2500.0);
        for step in FRAME_PLAN {
            let bindings = step.bindings(&state, &camera);
            for (name, _) in &bindings {
                assert!(step.program.accepts(*name), "{} binds {name}", step.label);
            }
            let has_time = bindings.iter().any(|(name, _)| *name == UniformName::Time);
            assert_eq!(has_time, step.program == ProgramKind::TearingPlane);
        }

        let torn = FRAME_PLAN[2].bindings(&state, &camera);
        assert!(torn.contains(&(UniformName::Time, UniformValue::Float(2500.0))));
        assert!(torn.contains(&(
            UniformName::TranslateY,
            UniformValue::Float(state.translate_y())
        )));
    }

    #[test]
    fn torn_mesh_is_gapped_and_photos_share_texture() {
        assert_eq!(FRAME_PLAN[2].mesh, MeshKind::Gapped);
        for step in &FRAME_PLAN[..3] {
            assert_eq!(step.texture, TextureKind::Photo);
        }
        assert_eq!(FRAME_PLAN[3].texture, TextureKind::Frame);
    }
}
