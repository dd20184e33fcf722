//! Image acquisition: local files or http(s) URLs, decoded to RGBA8.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use reqwest::blocking::Client;
use renderer::SceneImages;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid image source '{0}'")]
    InvalidSource(String),
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode image from {origin}")]
    Decode {
        origin: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image from {origin} has no pixels")]
    Empty { origin: String },
}

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Url(String),
}

impl ImageSource {
    pub fn parse(value: &str) -> Result<Self, AssetError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AssetError::InvalidSource(value.to_string()));
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(ImageSource::Url(trimmed.to_string()));
        }
        if lower.contains("://") {
            // Only http(s) is fetched; anything else with a scheme is a typo or unsupported.
            return Err(AssetError::InvalidSource(value.to_string()));
        }
        Ok(ImageSource::Path(PathBuf::from(trimmed)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ImageSource::Url(_))
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => write!(f, "{}", path.display()),
            ImageSource::Url(url) => f.write_str(url),
        }
    }
}

fn read_bytes(source: &ImageSource, client: Option<&Client>) -> Result<Vec<u8>, AssetError> {
    match source {
        ImageSource::Path(path) => std::fs::read(path).map_err(|source| AssetError::Read {
            path: path.clone(),
            source,
        }),
        ImageSource::Url(url) => {
            let client = client.ok_or_else(|| AssetError::InvalidSource(url.clone()))?;
            debug!(%url, "downloading image");
            let fetch_err = |source| AssetError::Fetch {
                url: url.clone(),
                source,
            };
            let response = client
                .get(url.as_str())
                .send()
                .and_then(|response| response.error_for_status())
                .map_err(fetch_err)?;
            let bytes = response.bytes().map_err(fetch_err)?;
            Ok(bytes.to_vec())
        }
    }
}

pub fn decode_image(bytes: &[u8], origin: &str) -> Result<RgbaImage, AssetError> {
    let image = image::load_from_memory(bytes)
        .map_err(|source| AssetError::Decode {
            origin: origin.to_string(),
            source,
        })?
        .to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(AssetError::Empty {
            origin: origin.to_string(),
        });
    }
    Ok(image)
}

pub fn load_image(source: &ImageSource, client: Option<&Client>) -> Result<RgbaImage, AssetError> {
    let bytes = read_bytes(source, client)?;
    let image = decode_image(&bytes, &source.to_string())?;
    debug!(%source, width = image.width(), height = image.height(), "decoded image");
    Ok(image)
}

/// Loads both scene images concurrently. Remote fetches are bounded by `timeout`.
pub fn load_scene_images(
    frame: &ImageSource,
    photo: &ImageSource,
    timeout: Duration,
) -> Result<SceneImages> {
    let client = if frame.is_remote() || photo.is_remote() {
        Some(
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(AssetError::Client)?,
        )
    } else {
        None
    };
    let client = client.as_ref();

    let (frame_image, photo_image) = std::thread::scope(|scope| {
        let frame_task = scope.spawn(|| load_image(frame, client));
        let photo_task = scope.spawn(|| load_image(photo, client));
        (frame_task.join(), photo_task.join())
    });

    let frame_image = frame_image
        .map_err(|_| anyhow!("frame loader panicked"))?
        .context("loading frame image")?;
    let photo_image = photo_image
        .map_err(|_| anyhow!("photo loader panicked"))?
        .context("loading photo image")?;

    info!(
        frame = ?frame_image.dimensions(),
        photo = ?photo_image.dimensions(),
        "scene images loaded"
    );
    Ok(SceneImages {
        frame: frame_image,
        photo: photo_image,
    })
}
