use std::path::PathBuf;

use crate::panel::ParamSpec;
use crate::runtime::RenderPolicy;
use crate::scene::{FragmentVariant, Scene};

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureWrap {
    /// Clamp to the edge texel.
    #[default]
    Clamp,
    /// Tile the texture.
    Repeat,
    /// Tile the texture, mirroring every other repetition.
    MirroredRepeat,
}

/// Image file feeding one texture uniform.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSource {
    /// Image on disk; `None` renders a placeholder checkerboard.
    pub path: Option<PathBuf>,
    pub wrap: TextureWrap,
}

/// Associates a texture uniform name with the image bound to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub uniform: String,
    pub source: TextureSource,
}

/// Which demo scene to assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneLayout {
    /// One plane shaded by the given variant.
    Single(FragmentVariant),
    /// Three planes, one per variant, sharing one uniform set.
    Triple,
}

impl SceneLayout {
    pub fn build(self) -> Scene {
        match self {
            SceneLayout::Single(variant) => Scene::single(variant),
            SceneLayout::Triple => Scene::triple(),
        }
    }
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self::Single(FragmentVariant::default())
    }
}

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Pick the gamma-encoded swapchain the source images expect.
    #[default]
    Auto,
    /// Treat textures and shader output as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and use sRGB swapchains/textures for conversion.
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

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags and the scene file: which images feed
/// which texture uniforms, how the scene is laid out, and which tunable
/// parameters the panel exposes.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// Scene assembled at start-up.
    pub layout: SceneLayout,
    /// Images bound to texture uniforms, in slot order.
    pub textures: Vec<TextureBinding>,
    /// Panel parameters. Names that are not already uniforms become new scalars.
    pub params: Vec<ParamSpec>,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Desired color handling for swapchain/textures.
    pub color_space: ColorSpaceMode,
    /// Animate continuously or freeze at one timestamp.
    pub policy: RenderPolicy,
    /// Read panel commands from stdin while the window is open.
    pub stdin_control: bool,
}

impl RendererConfig {
    /// The photo (mirrored) and noise (repeating) texture pair every variant samples.
    pub fn default_textures(image: Option<PathBuf>, noise: Option<PathBuf>) -> Vec<TextureBinding> {
        vec![
            TextureBinding {
                uniform: "uTexture".into(),
                source: TextureSource {
                    path: image,
                    wrap: TextureWrap::MirroredRepeat,
                },
            },
            TextureBinding {
                uniform: "uNoise".into(),
                source: TextureSource {
                    path: noise,
                    wrap: TextureWrap::Repeat,
                },
            },
        ]
    }
}

impl Default for RendererConfig {
    /// Provides a 1280x720 single-plane warp with placeholder textures.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "noisewarp".into(),
            layout: SceneLayout::default(),
            textures: Self::default_textures(None, None),
            params: Vec::new(),
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            policy: RenderPolicy::default(),
            stdin_control: false,
        }
    }
}
