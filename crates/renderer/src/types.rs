use std::fmt;

use image::RgbaImage;

use crate::runtime::RenderPolicy;

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Gamma-encoded swapchain; images are sampled as stored.
    #[default]
    Auto,
    /// Treat textures and outputs as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Decode textures to linear and let an sRGB swapchain re-encode them.
    Linear,
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Decoded images the scene is textured with.
#[derive(Clone)]
pub struct SceneImages {
    /// The wood frame, drawn last and on top.
    pub frame: RgbaImage,
    /// The photo that tears out of the frame.
    pub photo: RgbaImage,
}

impl fmt::Debug for SceneImages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneImages")
            .field("frame", &self.frame.dimensions())
            .field("photo", &self.photo.dimensions())
            .finish()
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the resolved CLI/config-file settings: the window
/// size, the decoded scene images, and how frames should be produced.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Window size in physical pixels. The window does not resize.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// Frame and photo textures.
    pub images: SceneImages,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Desired color handling for swapchain/textures.
    pub color_space: ColorSpaceMode,
    /// Animate continuously or render one still frame.
    pub policy: RenderPolicy,
}

impl RendererConfig {
    /// Builds a 1280x720 animated configuration around the given images.
    pub fn new(images: SceneImages) -> Self {
        Self {
            surface_size: (1280, 720),
            title: "tearframe".to_string(),
            images,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            policy: RenderPolicy::default(),
        }
    }
}
