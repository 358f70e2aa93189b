//! Animated simplex-noise image distortion on top of `wgpu`.
//!
//! The crate splits into a platform-free core and a windowed backend:
//!
//! ```text
//!   RendererConfig ──▶ Session { AnimationDriver, ParamPanel }
//!                               │            │
//!                               │ uTime      │ slider writes
//!                               ▼            ▼
//!   winit redraw ──▶ driver.tick ──▶ UniformSet ──▶ GpuState::render
//! ```
//!
//! `uniforms`, `driver`, `panel`, `scene` and `runtime` carry no GPU types and
//! are exercised directly by tests. `compile` wraps the fragment variants with
//! a header generated from the uniform set, `gpu` owns the device and
//! pipelines, and `window` hosts the frame loop.

pub mod compile;
pub mod driver;
mod gpu;
pub mod panel;
pub mod runtime;
pub mod scene;
pub mod session;
pub mod types;
pub mod uniforms;
mod window;

use anyhow::Result;

pub use driver::{AnimationDriver, FrameHost, FrameToken, RenderBackend, TickOutcome};
pub use gpu::RenderError;
pub use panel::{PanelCommand, PanelError, ParamPanel, ParamSpec};
pub use runtime::{Clock, FramePacer, ManualClock, RenderPolicy, SystemClock};
pub use scene::{FragmentVariant, Mesh, PerspectiveCamera, Scene};
pub use session::Session;
pub use types::{
    Antialiasing, ColorSpaceMode, RendererConfig, SceneLayout, TextureBinding, TextureSource,
    TextureWrap,
};
pub use uniforms::{UniformError, UniformSet, UniformValue};

/// Entry point that opens the preview window for a configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Runs until the window closes or a frame fails to render.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            layout = ?self.config.layout,
            width = self.config.surface_size.0,
            height = self.config.surface_size.1,
            "starting renderer"
        );
        window::run_window(self.config)
    }
}
