use std::path::PathBuf;

use clap::Parser;
use sceneconfig::{AntialiasSetting, ColorSpaceSetting, LayoutSetting, VariantSetting};

#[derive(Parser, Debug, Default)]
#[command(
    name = "noisewarp",
    author,
    version,
    about = "Animated simplex-noise image distortion",
    arg_required_else_help = false
)]
pub struct Args {
    /// Scene configuration file (TOML). Command-line flags override its values.
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Image distorted by the shader (bound to `uTexture`).
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Noise texture sampled by the drift variant (bound to `uNoise`).
    #[arg(long, value_name = "PATH")]
    pub noise: Option<PathBuf>,

    /// Scene layout: `single` or `triple` (one plane per variant).
    #[arg(long, value_name = "LAYOUT", value_parser = parse_layout)]
    pub layout: Option<LayoutSetting>,

    /// Fragment variant for the single layout: `warp`, `drift`, or `ripple`.
    #[arg(long, value_name = "VARIANT", value_parser = parse_variant)]
    pub variant: Option<VariantSetting>,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Frame rate cap (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Freeze the animation at this many seconds instead of animating.
    #[arg(long, value_name = "SECONDS")]
    pub still: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<AntialiasSetting>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space)]
    pub color_space: Option<ColorSpaceSetting>,

    /// Accept panel commands (`set`, `nudge`, `list`) on stdin while running.
    #[arg(long)]
    pub stdin_control: bool,

    /// Print the resolved configuration as JSON and exit without opening a window.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

pub fn parse_antialias(value: &str) -> Result<AntialiasSetting, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    sceneconfig::parse_antialias(trimmed).map_err(|_| {
        format!("invalid anti-alias mode '{trimmed}'; use auto/off or 2/4/8/16")
    })
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceSetting, String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceSetting::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceSetting::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceSetting::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_layout(value: &str) -> Result<LayoutSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "single" => Ok(LayoutSetting::Single),
        "triple" => Ok(LayoutSetting::Triple),
        other => Err(format!("unknown layout '{other}'; expected single or triple")),
    }
}

pub fn parse_variant(value: &str) -> Result<VariantSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "warp" => Ok(VariantSetting::Warp),
        "drift" => Ok(VariantSetting::Drift),
        "ripple" => Ok(VariantSetting::Ripple),
        other => Err(format!(
            "unknown variant '{other}'; expected warp, drift, or ripple"
        )),
    }
}
