//! Catalog movie record
//!
//! Only `servers` drives playback. Everything else is carried through for
//! display and is never interpreted here.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::MarqueeError;
use crate::playback::{FrameSpec, PlaybackError, PlaybackTarget, classify};

/// One playback option of a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub quality: String,
}

/// Movie as stored by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub backdrop_url: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Ordered playback options; the first one is selected by default
    #[serde(default)]
    pub servers: Vec<ServerDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer_url: Option<String>,
    #[serde(default)]
    pub is_kurdish: bool,
}

impl Movie {
    /// Parses a catalog record.
    ///
    /// # Errors
    /// - `MarqueeError::Json` - The record is not valid movie JSON
    pub fn from_json(json: &str) -> Result<Self, MarqueeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a catalog record from disk.
    ///
    /// # Errors
    /// - `MarqueeError::Io` - The file could not be read
    /// - `MarqueeError::Json` - The file is not valid movie JSON
    pub fn from_file(path: &Path) -> Result<Self, MarqueeError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn default_server(&self) -> Option<&ServerDescriptor> {
        self.servers.first()
    }

    /// Server at `index` in catalog order.
    ///
    /// # Errors
    /// - `PlaybackError::NoServers` - The movie has no servers at all
    /// - `PlaybackError::ServerNotFound` - `index` is out of range
    pub fn server(&self, index: usize) -> Result<&ServerDescriptor, PlaybackError> {
        if self.servers.is_empty() {
            return Err(PlaybackError::NoServers);
        }
        self.servers
            .get(index)
            .ok_or(PlaybackError::ServerNotFound { index })
    }

    /// Classifies every server in catalog order.
    pub fn playback_targets(&self) -> Vec<(&ServerDescriptor, PlaybackTarget)> {
        self.servers
            .iter()
            .map(|server| (server, classify(&server.url)))
            .collect()
    }

    /// Embedded trailer frame, when the movie has a trailer link.
    pub fn trailer_frame(&self) -> Option<FrameSpec> {
        self.trailer_url.as_deref().and_then(FrameSpec::for_trailer)
    }
}
