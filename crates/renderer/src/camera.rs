use glam::{Mat4, Vec3};

use crate::runtime::FrameState;

pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;
pub const EYE: Vec3 = Vec3::new(0.0, 0.0, 5.0);

/// Non-uniform scale giving the photo its portrait aspect.
pub const PHOTO_SCALE: Vec3 = Vec3::new(1.0, 1.3, 1.0);
/// Resting vertical offset of the photo and the frame.
pub const REST_OFFSET_Y: f32 = 0.2;
/// Depth of the stencil window and the intact photo.
pub const INTACT_DEPTH: f32 = -2.0;
/// Depth of the torn photo, just behind the intact one.
pub const TORN_DEPTH: f32 = -2.1;
/// Vertical offset of the frame.
pub const FRAME_OFFSET_Y: f32 = 0.2;

/// Projection and view, fixed for the lifetime of the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub projection: Mat4,
    pub view: Mat4,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            projection: build_projection(width, height),
            view: build_view(),
        }
    }
}

/// Right-handed perspective mapping depth to wgpu's `0..1` range.
pub fn build_projection(width: u32, height: u32) -> Mat4 {
    let aspect = width.max(1) as f32 / height.max(1) as f32;
    Mat4::perspective_rh(FIELD_OF_VIEW_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR)
}

pub fn build_view() -> Mat4 {
    Mat4::look_at_rh(EYE, Vec3::ZERO, Vec3::Y)
}

/// Downward model-space displacement for a given progress value.
pub fn vertical_offset(progress: f32) -> f32 {
    progress * crate::runtime::OFFSET_PER_PROGRESS
}

fn photo_model(offset_y: f32, depth: f32) -> Mat4 {
    Mat4::from_scale(PHOTO_SCALE) * Mat4::from_translation(Vec3::new(0.0, offset_y, depth))
}

/// The opening of the frame; never moves.
pub fn stencil_model() -> Mat4 {
    photo_model(REST_OFFSET_Y, INTACT_DEPTH)
}

pub fn intact_model(state: &FrameState) -> Mat4 {
    photo_model(REST_OFFSET_Y - state.translate_y(), INTACT_DEPTH)
}

pub fn torn_model(state: &FrameState) -> Mat4 {
    photo_model(REST_OFFSET_Y - state.translate_y(), TORN_DEPTH)
}

pub fn frame_model() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, FRAME_OFFSET_Y, 0.0))
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    fn translation_y(model: Mat4) -> f32 {
        model.w_axis.y
    }

    #[test]
    fn projection_guards_zero_height() {
        let projection = build_projection(800, 0);
        assert!(projection.is_finite());
        assert_eq!(projection, build_projection(800, 1));
    }

    #[test]
    fn view_places_origin_in_front_of_camera() {
        let origin = build_view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(origin.z, -5.0);
    }

    #[test]
    fn projected_depth_uses_zero_to_one_range() {
        let camera = Camera::new(1280, 720);
        for z in [INTACT_DEPTH, TORN_DEPTH, 0.0] {
            let clip = camera.projection * camera.view * Vec4::new(0.0, 0.0, z, 1.0);
            let depth = clip.z / clip.w;
            assert!((0.0..=1.0).contains(&depth), "depth {depth} for z {z}");
        }
    }

    #[test]
    fn frame_is_nearest_to_camera() {
        let camera = Camera::new(1280, 720);
        let depth_of = |model: Mat4| {
            let clip = camera.projection * camera.view * model * Vec4::new(0.0, 0.0, 1.0, 1.0);
            clip.z / clip.w
        };
        let state = FrameState::at(2500.0);
        let frame = depth_of(frame_model());
        let intact = depth_of(intact_model(&state));
        let torn = depth_of(torn_model(&state));
        assert!(frame < intact);
        assert!(intact < torn);
    }

    #[test]
    fn models_scale_then_translate() {
        let model = stencil_model();
        let top = model * Vec4::new(0.0, 1.0, 1.0, 1.0);
        assert!((top.y - 1.3 * (1.0 + REST_OFFSET_Y)).abs() < 1e-6);
        assert!((top.z - (1.0 + INTACT_DEPTH)).abs() < 1e-6);
    }

    #[test]
    fn torn_offset_tracks_progress() {
        let start = FrameState::at(0.0);
        let half = FrameState::at(2500.0);
        let done = FrameState::at(9000.0);
        let rest = translation_y(stencil_model());

        assert_eq!(translation_y(torn_model(&start)), rest);
        let moved = rest - translation_y(torn_model(&half));
        assert!((moved - 1.3 * 0.5).abs() < 1e-5);
        let pinned = rest - translation_y(torn_model(&done));
        assert!((pinned - 1.3 * 1.0).abs() < 1e-5);
        assert!((vertical_offset(100.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn stencil_window_is_static() {
        assert_eq!(stencil_model(), stencil_model());
        assert_eq!(
            intact_model(&FrameState::at(0.0)),
            stencil_model(),
            "intact photo starts inside the window"
        );
    }
}
