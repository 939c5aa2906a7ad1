// Media URL resolution

use crate::error::{PlayerError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// A media location an engine knows how to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaUrl {
    /// Local file, from a `file://` URL or a bare path
    File(PathBuf),
    /// `http://` or `https://` resource read with range requests
    Http(String),
}

impl MediaUrl {
    /// Resolve a user-supplied URL string
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PlayerError::InvalidUrl("empty URL".to_string()));
        }

        match Url::parse(trimmed) {
            Ok(url) => Self::from_url(&url),
            // No scheme at all: treat as a filesystem path
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(MediaUrl::File(PathBuf::from(trimmed))),
            Err(e) => Err(e.into()),
        }
    }

    fn from_url(url: &Url) -> Result<Self> {
        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(MediaUrl::File)
                .map_err(|_| PlayerError::InvalidUrl(format!("not a local file URL: {}", url))),
            "http" | "https" => Ok(MediaUrl::Http(url.to_string())),
            // Single-letter schemes are Windows drive letters (C:\music\a.mp3)
            s if s.len() == 1 => Ok(MediaUrl::File(PathBuf::from(url.as_str()))),
            other => Err(PlayerError::UnsupportedScheme(other.to_string())),
        }
    }

    /// File extension of the resource, used as a container hint
    pub fn extension(&self) -> Option<String> {
        let path = match self {
            MediaUrl::File(path) => path.clone(),
            MediaUrl::Http(url) => {
                let parsed = Url::parse(url).ok()?;
                PathBuf::from(parsed.path())
            }
        };
        Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, MediaUrl::Http(_))
    }
}

impl fmt::Display for MediaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaUrl::File(path) => write!(f, "file {}", path.display()),
            MediaUrl::Http(url) => write!(f, "http {}", url),
        }
    }
}
