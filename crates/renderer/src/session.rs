use anyhow::{bail, Context, Result};

use crate::compile::{REQUIRED_SCALARS, REQUIRED_TEXTURES};
use crate::driver::AnimationDriver;
use crate::panel::{ParamPanel, ParamSpec};
use crate::runtime::{clock_for_policy, BoxedClock, Clock};
use crate::scene::PerspectiveCamera;
use crate::types::RendererConfig;
use crate::uniforms::{TextureSlot, UniformSet};

/// Driver plus the panel bound to its uniform set, assembled from a config.
pub struct Session<C = BoxedClock> {
    pub driver: AnimationDriver<C>,
    pub panel: ParamPanel,
}

impl Session<BoxedClock> {
    /// Builds a session whose clock follows the configured render policy.
    pub fn from_config(config: &RendererConfig) -> Result<Self> {
        Self::with_clock(config, clock_for_policy(&config.policy))
    }
}

impl<C: Clock> Session<C> {
    pub fn with_clock(config: &RendererConfig, clock: C) -> Result<Self> {
        let mut uniforms = UniformSet::new();
        for (name, value) in REQUIRED_SCALARS {
            uniforms.register_scalar(name, value)?;
        }
        for (slot, binding) in config.textures.iter().enumerate() {
            uniforms
                .register_texture(&binding.uniform, TextureSlot(slot as u32))
                .with_context(|| format!("failed to register texture '{}'", binding.uniform))?;
        }
        for name in REQUIRED_TEXTURES {
            if uniforms.texture(name).is_none() {
                bail!("no image bound to required texture uniform '{name}'");
            }
        }

        let mut panel = ParamPanel::new();
        for spec in merge_params(&config.params) {
            if !uniforms.contains(&spec.name) {
                uniforms
                    .register_scalar(&spec.name, spec.value)
                    .with_context(|| format!("failed to register parameter '{}'", spec.name))?;
            }
            let uniform = spec.name.clone();
            panel
                .bind_uniform(spec, &uniform, &mut uniforms)
                .with_context(|| format!("failed to bind parameter '{uniform}'"))?;
        }

        let scene = config.layout.build();
        if scene.is_empty() {
            bail!("scene layout produced no meshes");
        }
        let (width, height) = config.surface_size;
        let camera = PerspectiveCamera::for_viewport(width, height);
        tracing::debug!(
            meshes = scene.meshes().len(),
            uniforms = uniforms.len(),
            params = panel.len(),
            "assembled render session"
        );

        Ok(Self {
            driver: AnimationDriver::new(uniforms, clock, scene, camera),
            panel,
        })
    }
}

/// Panel ranges for the built-in distortion controls.
pub fn default_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::new("uSpeed", 0.5, 0.0, 4.0).with_step(0.05),
        ParamSpec::new("uFrequency", 2.0, 0.0, 8.0).with_step(0.1),
        ParamSpec::new("uStrength", 1.0, 0.0, 2.0).with_step(0.01),
    ]
}

/// Built-in specs overridden by name, followed by any additional parameters.
fn merge_params(overrides: &[ParamSpec]) -> Vec<ParamSpec> {
    let mut merged = default_params();
    for spec in overrides {
        match merged.iter_mut().find(|existing| existing.name == spec.name) {
            Some(existing) => *existing = spec.clone(),
            None => merged.push(spec.clone()),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ManualClock;
    use crate::scene::FragmentVariant;
    use crate::types::SceneLayout;
    use crate::uniforms::TIME_UNIFORM;

    #[test]
    fn default_config_builds_single_warp_plane() {
        let session = Session::with_clock(&RendererConfig::default(), ManualClock::new()).unwrap();
        let driver = &session.driver;
        assert_eq!(driver.scene().meshes().len(), 1);
        assert_eq!(driver.scene().meshes()[0].variant, FragmentVariant::Warp);
        assert_eq!(driver.uniforms().scalar(TIME_UNIFORM), Some(0.0));
        assert_eq!(driver.uniforms().scalar("uSpeed"), Some(0.5));
        assert_eq!(driver.uniforms().texture("uTexture"), Some(TextureSlot(0)));
        assert_eq!(driver.uniforms().texture("uNoise"), Some(TextureSlot(1)));
        assert_eq!(session.panel.len(), 3);
        assert!((driver.camera().aspect - 1280.0 / 720.0).abs() < 1e-6);
    }

    #[test]
    fn overrides_replace_defaults_and_extras_become_uniforms() {
        let config = RendererConfig {
            layout: SceneLayout::Triple,
            params: vec![
                ParamSpec::new("uSpeed", 1.5, 0.0, 2.0),
                ParamSpec::new("uGlow", 0.25, 0.0, 1.0),
            ],
            ..RendererConfig::default()
        };
        let session = Session::with_clock(&config, ManualClock::new()).unwrap();
        let uniforms = session.driver.uniforms();
        assert_eq!(uniforms.scalar("uSpeed"), Some(1.5));
        assert_eq!(uniforms.scalar("uGlow"), Some(0.25));
        assert_eq!(session.panel.get("uSpeed").unwrap().max, 2.0);
        assert_eq!(session.driver.scene().meshes().len(), 3);
    }

    #[test]
    fn missing_required_texture_is_an_error() {
        let config = RendererConfig {
            textures: RendererConfig::default_textures(None, None)
                .into_iter()
                .filter(|binding| binding.uniform != "uNoise")
                .collect(),
            ..RendererConfig::default()
        };
        assert!(Session::with_clock(&config, ManualClock::new()).is_err());
    }

    #[test]
    fn parameter_named_like_a_texture_is_rejected() {
        let config = RendererConfig {
            params: vec![ParamSpec::new("uTexture", 0.0, 0.0, 1.0)],
            ..RendererConfig::default()
        };
        assert!(Session::with_clock(&config, ManualClock::new()).is_err());
    }
}
