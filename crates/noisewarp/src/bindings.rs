use renderer::{
    Antialiasing, ColorSpaceMode, FragmentVariant, ParamSpec, RenderPolicy, RendererConfig,
    SceneLayout,
};
use sceneconfig::{
    AntialiasSetting, ColorSpaceSetting, LayoutSetting, SceneConfig, VariantSetting,
};

pub fn renderer_config(config: &SceneConfig, stdin_control: bool) -> RendererConfig {
    let defaults = RendererConfig::default();
    for path in [&config.image, &config.noise].into_iter().flatten() {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "texture image not found on disk");
        }
    }

    RendererConfig {
        surface_size: config
            .size
            .map(|size| (size.width, size.height))
            .unwrap_or(defaults.surface_size),
        title: defaults.title,
        layout: map_layout(config.layout, config.variant),
        textures: RendererConfig::default_textures(config.image.clone(), config.noise.clone()),
        params: config
            .params
            .iter()
            .map(|(name, param)| {
                let spec = ParamSpec::new(name.clone(), param.value, param.min, param.max);
                match param.step {
                    Some(step) => spec.with_step(step),
                    None => spec,
                }
            })
            .collect(),
        antialiasing: config
            .antialias
            .map(map_antialias)
            .unwrap_or(defaults.antialiasing),
        color_space: config
            .color_space
            .map(map_color_space)
            .unwrap_or(defaults.color_space),
        policy: render_policy(config),
        stdin_control,
    }
}

pub fn map_layout(layout: LayoutSetting, variant: Option<VariantSetting>) -> SceneLayout {
    match layout {
        LayoutSetting::Triple => SceneLayout::Triple,
        LayoutSetting::Single => SceneLayout::Single(variant.map(map_variant).unwrap_or_default()),
    }
}

pub fn map_variant(variant: VariantSetting) -> FragmentVariant {
    match variant {
        VariantSetting::Warp => FragmentVariant::Warp,
        VariantSetting::Drift => FragmentVariant::Drift,
        VariantSetting::Ripple => FragmentVariant::Ripple,
    }
}

pub fn map_antialias(setting: AntialiasSetting) -> Antialiasing {
    match setting.samples() {
        None => Antialiasing::Auto,
        Some(1) => Antialiasing::Off,
        Some(samples) => Antialiasing::Samples(samples),
    }
}

pub fn map_color_space(setting: ColorSpaceSetting) -> ColorSpaceMode {
    match setting {
        ColorSpaceSetting::Auto => ColorSpaceMode::Auto,
        ColorSpaceSetting::Gamma => ColorSpaceMode::Gamma,
        ColorSpaceSetting::Linear => ColorSpaceMode::Linear,
    }
}

/// A still time freezes the clock; otherwise animate, with `fps = 0` meaning
/// uncapped.
pub fn render_policy(config: &SceneConfig) -> RenderPolicy {
    match config.still {
        Some(still) => RenderPolicy::Still {
            time: still.as_secs_f32(),
        },
        None => RenderPolicy::Animate {
            target_fps: config.fps.filter(|fps| *fps > 0.0),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use sceneconfig::{ParamSetting, SurfaceSize};

    #[test]
    fn maps_scene_settings_onto_renderer_types() {
        let mut config = SceneConfig {
            variant: Some(VariantSetting::Drift),
            image: Some(PathBuf::from("photo.png")),
            size: Some(SurfaceSize {
                width: 640,
                height: 480,
            }),
            antialias: Some(AntialiasSetting::Samples4),
            color_space: Some(ColorSpaceSetting::Linear),
            ..SceneConfig::default()
        };
        config.params.insert(
            "uGlow".into(),
            ParamSetting {
                value: 0.3,
                min: 0.0,
                max: 1.0,
                step: Some(0.1),
            },
        );

        let rendered = renderer_config(&config, true);
        assert_eq!(rendered.surface_size, (640, 480));
        assert_eq!(rendered.layout, SceneLayout::Single(FragmentVariant::Drift));
        assert_eq!(rendered.antialiasing, Antialiasing::Samples(4));
        assert_eq!(rendered.color_space, ColorSpaceMode::Linear);
        assert_eq!(
            rendered.textures[0].source.path.as_deref(),
            Some(std::path::Path::new("photo.png"))
        );
        assert_eq!(rendered.textures[1].source.path, None);
        assert_eq!(rendered.params.len(), 1);
        assert_eq!(rendered.params[0].step, 0.1);
        assert!(rendered.stdin_control);
    }

    #[test]
    fn zero_fps_is_uncapped_and_still_freezes_time() {
        let animated = SceneConfig {
            fps: Some(0.0),
            ..SceneConfig::default()
        };
        assert_eq!(
            render_policy(&animated),
            RenderPolicy::Animate { target_fps: None }
        );

        let still = SceneConfig {
            fps: Some(30.0),
            still: Some(Duration::from_millis(1500)),
            ..SceneConfig::default()
        };
        assert_eq!(render_policy(&still), RenderPolicy::Still { time: 1.5 });
    }

    #[test]
    fn triple_layout_ignores_variant() {
        assert_eq!(
            map_layout(LayoutSetting::Triple, Some(VariantSetting::Ripple)),
            SceneLayout::Triple
        );
        assert_eq!(
            map_layout(LayoutSetting::Single, None),
            SceneLayout::Single(FragmentVariant::Warp)
        );
    }

    #[test]
    fn antialias_samples_map_to_renderer_modes() {
        assert_eq!(map_antialias(AntialiasSetting::Auto), Antialiasing::Auto);
        assert_eq!(map_antialias(AntialiasSetting::Off), Antialiasing::Off);
        assert_eq!(
            map_antialias(AntialiasSetting::Samples16),
            Antialiasing::Samples(16)
        );
    }
}
