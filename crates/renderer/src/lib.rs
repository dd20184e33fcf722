//! Renderer crate for tearframe.
//!
//! Draws a photo tearing out of a wood frame. The flow is:
//!
//! ```text
//!   tearframe CLI
//!          │ RendererConfig (size, decoded images, policy)
//!          ▼
//!   WindowRuntime::spawn ──▶ window thread ──▶ winit event loop ──▶ GpuState::render()
//!                                                     │
//!                 TimeSource ─▶ FrameState ─▶ FRAME_PLAN bindings ─▶ four draws, one pass
//! ```
//!
//! Every frame clears colour, depth and stencil, stamps the frame's opening
//! into the stencil buffer, draws the intact photo only inside that opening,
//! draws the noise-displaced torn photo slightly behind it, and finally draws
//! the frame on top. The photo slides down as `progress` grows from 0 to 100
//! over the first five seconds and then holds still while the tear keeps
//! rippling.
//!
//! The pure parts (mesh generation, noise, transforms, the draw plan and the
//! GLSL sources) are public so they can be tested without a GPU.

pub mod camera;
pub mod error;
pub mod geometry;
mod gpu;
pub mod noise;
pub mod plan;
pub mod runtime;
pub mod shaders;
mod types;
mod window;

pub use error::{RenderError, StageKind};
pub use runtime::{FrameState, RenderPolicy, TimeSample, TimeSource};
pub use types::{Antialiasing, ColorSpaceMode, RendererConfig, SceneImages};
pub use window::{StopHandle, WindowRuntime};
