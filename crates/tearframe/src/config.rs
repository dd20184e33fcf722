use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use renderer::{Antialiasing, ColorSpaceMode, RenderPolicy};
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::assets::ImageSource;
use crate::cli::{parse_antialias, parse_color_space, parse_surface_size, validate_still_time, Cli};

pub const DEFAULT_FRAME_SOURCE: &str =
    "https://res.cloudinary.com/dponedhzq/image/upload/v1727418038/wood_frame_em8uwy.png";
pub const DEFAULT_PHOTO_SOURCE: &str =
    "https://res.cloudinary.com/dponedhzq/image/upload/v1727461946/art_shr_col54c.webp";
pub const DEFAULT_SURFACE_SIZE: (u32, u32) = (1280, 720);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings accepted from the optional TOML file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub frame: Option<String>,
    pub photo: Option<String>,
    pub size: Option<String>,
    pub antialias: Option<String>,
    pub color_space: Option<String>,
    pub still_ms: Option<f32>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub run_for: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub fetch_timeout: Option<Duration>,
}

impl FileConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

/// Fully resolved settings: defaults, then the config file, then CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub frame: ImageSource,
    pub photo: ImageSource,
    pub surface_size: (u32, u32),
    pub antialiasing: Antialiasing,
    pub color_space: ColorSpaceMode,
    pub policy: RenderPolicy,
    pub run_for: Option<Duration>,
    pub fetch_timeout: Duration,
}

impl AppConfig {
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(file, cli)
    }

    pub fn merge(file: FileConfig, cli: &Cli) -> Result<Self, ConfigError> {
        let frame = pick_source(cli.frame.as_deref(), file.frame.as_deref(), DEFAULT_FRAME_SOURCE)?;
        let photo = pick_source(cli.photo.as_deref(), file.photo.as_deref(), DEFAULT_PHOTO_SOURCE)?;

        let surface_size = match (cli.size, file.size.as_deref()) {
            (Some(size), _) => size,
            (None, Some(value)) => parse_surface_size(value).map_err(invalid("size"))?,
            (None, None) => DEFAULT_SURFACE_SIZE,
        };
        let antialiasing = match (cli.antialias, file.antialias.as_deref()) {
            (Some(mode), _) => mode,
            (None, Some(value)) => parse_antialias(value).map_err(invalid("antialias"))?,
            (None, None) => Antialiasing::default(),
        };
        let color_space = match (cli.color_space, file.color_space.as_deref()) {
            (Some(mode), _) => mode,
            (None, Some(value)) => parse_color_space(value).map_err(invalid("color_space"))?,
            (None, None) => ColorSpaceMode::default(),
        };
        let still = match (cli.still, file.still_ms) {
            (Some(time), _) => Some(time),
            (None, Some(time)) => Some(validate_still_time(time).map_err(invalid("still_ms"))?),
            (None, None) => None,
        };
        let policy = match still {
            Some(time_ms) => RenderPolicy::Still { time_ms },
            None => RenderPolicy::Animate,
        };
        let fetch_timeout = cli
            .fetch_timeout
            .or(file.fetch_timeout)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT);
        if fetch_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "fetch_timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            frame,
            photo,
            surface_size,
            antialiasing,
            color_space,
            policy,
            run_for: cli.run_for.or(file.run_for),
            fetch_timeout,
        })
    }
}

fn pick_source(
    cli: Option<&str>,
    file: Option<&str>,
    default: &str,
) -> Result<ImageSource, ConfigError> {
    let value = cli.or(file).unwrap_or(default);
    ImageSource::parse(value).map_err(|err| ConfigError::Invalid(err.to_string()))
}

fn invalid(key: &'static str) -> impl Fn(String) -> ConfigError {
    move |reason| ConfigError::Invalid(format!("{key}: {reason}"))
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

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}
