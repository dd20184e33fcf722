use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use renderer::{Antialiasing, ColorSpaceMode};

#[derive(Parser, Debug, Default)]
#[command(
    name = "tearframe",
    author,
    version,
    about = "Renders a photo tearing out of a wood frame"
)]
pub struct Cli {
    /// TOML file with default settings; flags given here take precedence.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Frame image: a file path or an http(s) URL.
    #[arg(long, value_name = "SOURCE")]
    pub frame: Option<String>,

    /// Photo image: a file path or an http(s) URL.
    #[arg(long, value_name = "SOURCE")]
    pub photo: Option<String>,

    /// Window size in physical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space)]
    pub color_space: Option<ColorSpaceMode>,

    /// Render a single frame at this elapsed time instead of animating.
    #[arg(long, value_name = "MILLISECONDS", value_parser = parse_still_time)]
    pub still: Option<f32>,

    /// Close the window after this long (e.g. `30s`, `2m`).
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub run_for: Option<Duration>,

    /// Upper bound on how long remote images may take to download.
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub fetch_timeout: Option<Duration>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size '{trimmed}'"))?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            if samples == 1 {
                return Ok(Antialiasing::Off);
            }

            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }

            Ok(Antialiasing::Samples(samples))
        }
    }
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_still_time(value: &str) -> Result<f32, String> {
    let time: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid still time '{value}'; expected milliseconds"))?;
    validate_still_time(time)
}

pub fn validate_still_time(time: f32) -> Result<f32, String> {
    if !time.is_finite() || time < 0.0 {
        return Err("still time must be a non-negative number of milliseconds".to_string());
    }
    Ok(time)
}
