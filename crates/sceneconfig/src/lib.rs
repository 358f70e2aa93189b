use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_VERSION: u32 = 1;

/// Smallest positive frame rate cap accepted; `fps = 0` still means uncapped.
pub const MIN_FPS: f32 = 0.01;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutSetting {
    #[default]
    Single,
    Triple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantSetting {
    Warp,
    Drift,
    Ripple,
}

/// Written as `auto`, `off`, or a bare sample count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }

    /// MSAA sample count, or `None` for automatic selection.
    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpaceSetting {
    Auto,
    Gamma,
    Linear,
}

/// Window size written as `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for SurfaceSize {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (width, height) = parse_surface_size(raw)?;
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for SurfaceSize {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SurfaceSize> for String {
    fn from(size: SurfaceSize) -> Self {
        size.to_string()
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One panel parameter. `step` defaults to a hundredth of the range.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParamSetting {
    pub value: f32,
    pub min: f32,
    pub max: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SceneConfig {
    pub version: u32,
    #[serde(default)]
    pub layout: LayoutSetting,
    #[serde(default)]
    pub variant: Option<VariantSetting>,
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    pub noise: Option<PathBuf>,
    #[serde(default)]
    pub fps: Option<f32>,
    #[serde(default)]
    pub size: Option<SurfaceSize>,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub still: Option<Duration>,
    #[serde(default)]
    pub antialias: Option<AntialiasSetting>,
    #[serde(default)]
    pub color_space: Option<ColorSpaceSetting>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamSetting>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            layout: LayoutSetting::default(),
            variant: None,
            image: None,
            noise: None,
            fps: None,
            size: None,
            still: None,
            antialias: None,
            color_space: None,
            params: BTreeMap::new(),
        }
    }
}

/// Parses `WIDTHxHEIGHT` (case-insensitive separator) into non-zero dimensions.
pub fn parse_surface_size(raw: &str) -> Result<(u32, u32), String> {
    let normalized = raw.trim().to_ascii_lowercase();
    let (width, height) = normalized
        .split_once('x')
        .ok_or_else(|| format!("invalid size '{raw}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size '{raw}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size '{raw}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size '{raw}' must be non-zero in both dimensions"));
    }
    Ok((width, height))
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

impl Serialize for AntialiasSetting {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Off => serializer.serialize_str("off"),
            other => serializer.serialize_u32(other.samples().unwrap_or(1)),
        }
    }
}

impl<'de> Deserialize<'de> for AntialiasSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Str(String),
            Num(i64),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Str(raw) => parse_antialias(&raw).map_err(de::Error::custom),
            Helper::Num(value) if value < 0 => {
                Err(de::Error::custom("antialias value must be non-negative"))
            }
            Helper::Num(value) => parse_antialias(&value.to_string()).map_err(de::Error::custom),
        }
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|_| E::custom(format!("duration of {v} seconds is out of range")))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration_opt<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(duration) => {
            serializer.serialize_str(&humantime::format_duration(*duration).to_string())
        }
        None => serializer.serialize_none(),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.layout == LayoutSetting::Triple && self.variant.is_some() {
            return Err(ConfigError::Invalid(
                "variant only applies to the single layout; the triple layout shows every variant"
                    .into(),
            ));
        }

        if let Some(fps) = self.fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid("fps must be >= 0".into()));
            }
            if fps > 0.0 && fps < MIN_FPS {
                return Err(ConfigError::Invalid(format!(
                    "fps {fps} is below the minimum cap of {MIN_FPS}; use 0 for uncapped"
                )));
            }
        }

        for (name, param) in &self.params {
            if !is_identifier(name) || name.starts_with("gl_") {
                return Err(ConfigError::Invalid(format!(
                    "parameter name '{name}' is not a valid shader identifier"
                )));
            }
            if name == "uTime" {
                return Err(ConfigError::Invalid(
                    "uTime is driven by the clock and cannot be a panel parameter".into(),
                ));
            }
            if ![param.value, param.min, param.max].iter().all(|v| v.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "parameter '{name}' must use finite numbers"
                )));
            }
            if param.min > param.max {
                return Err(ConfigError::Invalid(format!(
                    "parameter '{name}' min ({}) exceeds max ({})",
                    param.min, param.max
                )));
            }
            if let Some(step) = param.step {
                if !step.is_finite() || step <= 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "parameter '{name}' step must be greater than zero"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
version = 1
layout = "single"
variant = "ripple"
image = "images/img01.jpg"
noise = "images/noise1.jpg"
fps = 30
size = "800x600"
still = "1s 500ms"
antialias = 4
color_space = "linear"

[params.uSpeed]
value = 0.5
min = 0.0
max = 4.0
step = 0.05

[params.uGlow]
value = 0.2
min = 0.0
max = 1.0
"#;

    #[test]
    fn parses_sample_config() {
        let config = SceneConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.layout, LayoutSetting::Single);
        assert_eq!(config.variant, Some(VariantSetting::Ripple));
        assert_eq!(config.image.as_deref(), Some(Path::new("images/img01.jpg")));
        assert_eq!(config.fps, Some(30.0));
        assert_eq!(
            config.size,
            Some(SurfaceSize {
                width: 800,
                height: 600
            })
        );
        assert_eq!(config.still, Some(Duration::from_millis(1500)));
        assert_eq!(config.antialias, Some(AntialiasSetting::Samples4));
        assert_eq!(config.color_space, Some(ColorSpaceSetting::Linear));

        let speed = &config.params["uSpeed"];
        assert_eq!(speed.step, Some(0.05));
        assert_eq!(config.params["uGlow"].step, None);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = SceneConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn rejects_unknown_version() {
        let err = SceneConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_variant_with_triple_layout() {
        let err = SceneConfig::from_toml_str("version = 1\nlayout = \"triple\"\nvariant = \"warp\"")
            .unwrap_err();
        assert!(err.to_string().contains("single layout"));
    }

    #[test]
    fn rejects_inverted_param_range() {
        let input = "version = 1\n[params.uSpeed]\nvalue = 1.0\nmin = 2.0\nmax = 1.0\n";
        let err = SceneConfig::from_toml_str(input).unwrap_err();
        assert!(err.to_string().contains("uSpeed"));
    }

    #[test]
    fn rejects_time_and_invalid_param_names() {
        let time = "version = 1\n[params.uTime]\nvalue = 1.0\nmin = 0.0\nmax = 2.0\n";
        assert!(SceneConfig::from_toml_str(time).is_err());
        let bad = "version = 1\n[params.\"2fast\"]\nvalue = 1.0\nmin = 0.0\nmax = 2.0\n";
        assert!(SceneConfig::from_toml_str(bad).is_err());
    }

    #[test]
    fn rejects_negative_fps_and_bad_size() {
        assert!(SceneConfig::from_toml_str("version = 1\nfps = -1").is_err());
        assert!(matches!(
            SceneConfig::from_toml_str("version = 1\nsize = \"800by600\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn still_accepts_plain_seconds() {
        let config = SceneConfig::from_toml_str("version = 1\nstill = 2.5").unwrap();
        assert_eq!(config.still, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn surface_size_parsing() {
        assert_eq!(parse_surface_size("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_surface_size(" 640X480 "), Ok((640, 480)));
        assert!(parse_surface_size("0x480").is_err());
        assert!(parse_surface_size("640").is_err());
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "version = 1\nlayout = \"triple\"").unwrap();
        let config = SceneConfig::load(file.path()).unwrap();
        assert_eq!(config.layout, LayoutSetting::Triple);

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            SceneConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn serializes_back_to_toml() {
        let config = SceneConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = toml::to_string(&config).unwrap();
        assert!(rendered.contains("size = \"800x600\""));
        assert!(rendered.contains("still = \"1s 500ms\""));
        assert!(rendered.contains("antialias = 4"));

        let reparsed = SceneConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn antialias_keywords_survive_serialization() {
        for setting in [AntialiasSetting::Auto, AntialiasSetting::Off, AntialiasSetting::Samples16] {
            let config = SceneConfig {
                antialias: Some(setting),
                ..SceneConfig::default()
            };
            let rendered = toml::to_string(&config).unwrap();
            assert_eq!(SceneConfig::from_toml_str(&rendered).unwrap().antialias, Some(setting));
        }
        let json = serde_json::to_value(AntialiasSetting::Samples8).unwrap();
        assert_eq!(json, serde_json::json!(8));
    }

    #[test]
    fn rejects_vanishing_fps_cap() {
        let err = SceneConfig::from_toml_str("version = 1\nfps = 1e-30").unwrap_err();
        assert!(err.to_string().contains("minimum cap"));
        assert!(SceneConfig::from_toml_str("version = 1\nfps = 0").is_ok());
    }

    #[test]
    fn huge_still_seconds_are_rejected() {
        assert!(SceneConfig::from_toml_str("version = 1\nstill = 1e30").is_err());
    }
}
