//! wgpu backend for the animation driver.
//!
//! - `context` owns the instance, device and surface, and reconfigures the
//!   swapchain when the window resizes.
//! - `textures` decodes the images bound to texture uniforms.
//! - `pipeline` builds the shared bind group layouts and one render pipeline
//!   per fragment variant.
//! - `uniforms` holds the std140 images of the scalar block and the per-mesh
//!   transform.
//! - `state` glues everything together as a [`RenderBackend`](crate::driver::RenderBackend).

mod context;
mod pipeline;
mod state;
mod textures;
mod uniforms;

pub use state::RenderError;
pub(crate) use state::GpuState;
