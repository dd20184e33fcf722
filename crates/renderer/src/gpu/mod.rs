//! GPU side of the scene.
//!
//! - `context` owns wgpu instance/device/surface wiring and resolves the MSAA
//!   sample count against both the colour and depth/stencil formats.
//! - `resources` uploads the two meshes and the two images once.
//! - `pipeline` compiles the three programs and links one render pipeline per
//!   draw step, each with its own stencil/depth/colour state.
//! - `uniforms` mirrors the shared std140 block and applies named bindings.
//! - `state` records the draw plan into a single render pass every frame.

mod context;
mod pipeline;
mod resources;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
