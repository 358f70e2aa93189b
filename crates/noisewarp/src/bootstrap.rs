use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use sceneconfig::{LayoutSetting, ParamSetting, SceneConfig, SurfaceSize};
use tracing::debug;

use crate::cli::Args;

/// Loads the config file named on the command line, if any, and layers the
/// command-line overrides on top.
pub fn resolve_scene_config(args: &Args) -> Result<SceneConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            let mut config = SceneConfig::load(path)
                .with_context(|| format!("failed to load scene config {}", path.display()))?;
            anchor_paths(&mut config, path);
            debug!(path = %path.display(), "loaded scene config");
            config
        }
        None => SceneConfig::default(),
    };

    apply_overrides(&mut config, args)?;
    fill_default_params(&mut config);
    config.validate().context("resolved configuration is invalid")?;
    Ok(config)
}

/// Image paths in a config file are relative to the file itself.
fn anchor_paths(config: &mut SceneConfig, config_path: &Path) {
    let Some(base) = config_path.parent() else {
        return;
    };
    for path in [config.image.as_mut(), config.noise.as_mut()]
        .into_iter()
        .flatten()
    {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    }
}

fn apply_overrides(config: &mut SceneConfig, args: &Args) -> Result<()> {
    if let Some(image) = &args.image {
        config.image = Some(image.clone());
    }
    if let Some(noise) = &args.noise {
        config.noise = Some(noise.clone());
    }
    if let Some(layout) = args.layout {
        if layout == LayoutSetting::Triple && config.variant.take().is_some() {
            debug!("triple layout requested; dropping configured variant");
        }
        config.layout = layout;
    }
    if let Some(variant) = args.variant {
        if args.layout == Some(LayoutSetting::Triple) {
            bail!("--variant only applies to the single layout");
        }
        config.layout = LayoutSetting::Single;
        config.variant = Some(variant);
    }
    if let Some(size) = &args.size {
        let (width, height) = parse_surface_size(size)?;
        config.size = Some(SurfaceSize { width, height });
    }
    if let Some(fps) = args.fps {
        config.fps = Some(fps);
    }
    if let Some(seconds) = args.still {
        if !seconds.is_finite() || seconds < 0.0 {
            bail!("--still must be a non-negative number of seconds");
        }
        let still = Duration::try_from_secs_f32(seconds)
            .map_err(|_| anyhow!("--still {seconds} is too large"))?;
        config.still = Some(still);
    }
    if let Some(antialias) = args.antialias {
        config.antialias = Some(antialias);
    }
    if let Some(color_space) = args.color_space {
        config.color_space = Some(color_space);
    }
    Ok(())
}

/// Adds the built-in distortion controls the config did not mention.
fn fill_default_params(config: &mut SceneConfig) {
    for spec in renderer::session::default_params() {
        config
            .params
            .entry(spec.name.clone())
            .or_insert(ParamSetting {
                value: spec.value,
                min: spec.min,
                max: spec.max,
                step: Some(spec.step),
            });
    }
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    sceneconfig::parse_surface_size(spec).map_err(|err| anyhow!(err))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use sceneconfig::VariantSetting;

    #[test]
    fn defaults_without_config_file() {
        let config = resolve_scene_config(&Args::default()).unwrap();
        assert_eq!(config.layout, LayoutSetting::Single);
        assert_eq!(config.params["uSpeed"].value, 0.5);
        assert_eq!(config.params["uFrequency"].value, 2.0);
        assert_eq!(config.params["uStrength"].value, 1.0);
    }

    #[test]
    fn variant_flag_forces_single_layout() {
        let mut config = SceneConfig {
            layout: LayoutSetting::Triple,
            ..SceneConfig::default()
        };
        let args = Args {
            variant: Some(VariantSetting::Ripple),
            ..Args::default()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.layout, LayoutSetting::Single);
        assert_eq!(config.variant, Some(VariantSetting::Ripple));
    }

    #[test]
    fn conflicting_layout_and_variant_flags_fail() {
        let args = Args {
            layout: Some(LayoutSetting::Triple),
            variant: Some(VariantSetting::Warp),
            ..Args::default()
        };
        assert!(resolve_scene_config(&args).is_err());
    }

    #[test]
    fn negative_still_is_rejected() {
        let args = Args {
            still: Some(-1.0),
            ..Args::default()
        };
        assert!(resolve_scene_config(&args).is_err());
    }

    #[test]
    fn oversized_still_is_an_error_not_a_panic() {
        let args = Args {
            still: Some(1e30),
            ..Args::default()
        };
        let err = resolve_scene_config(&args).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn vanishing_fps_cap_fails_validation() {
        let args = Args {
            fps: Some(1e-30),
            ..Args::default()
        };
        assert!(resolve_scene_config(&args).is_err());
    }

    #[test]
    fn config_relative_paths_follow_the_file() {
        let mut config = SceneConfig {
            image: Some(PathBuf::from("img.png")),
            noise: Some(PathBuf::from("/abs/noise.png")),
            ..SceneConfig::default()
        };
        anchor_paths(&mut config, Path::new("/scenes/demo.toml"));
        assert_eq!(config.image, Some(PathBuf::from("/scenes/img.png")));
        assert_eq!(config.noise, Some(PathBuf::from("/abs/noise.png")));
    }

    #[test]
    fn explicit_params_are_not_overwritten() {
        let mut config = SceneConfig::default();
        config.params.insert(
            "uSpeed".into(),
            ParamSetting {
                value: 3.0,
                min: 0.0,
                max: 5.0,
                step: None,
            },
        );
        fill_default_params(&mut config);
        assert_eq!(config.params["uSpeed"].value, 3.0);
        assert_eq!(config.params.len(), 3);
    }
}
