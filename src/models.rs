use bytes::Bytes;
use serde::{de, Deserialize, Deserializer};

use crate::error::ClipError;

pub const CLIP_FILE_NAME: &str = "short_clip.mp4";
pub const CLIP_MIME_TYPE: &str = "video/mp4";

/// Height ceiling for the downloaded source.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
}

impl Quality {
    pub fn height(self) -> u32 {
        match self {
            Quality::P720 => 720,
            Quality::P1080 => 1080,
            Quality::P1440 => 1440,
        }
    }
}

/// Raw fields of the clip form, as posted by the page.
#[derive(Deserialize, Debug)]
pub struct ClipForm {
    #[serde(default)]
    pub source_url: String,
    #[serde(default, deserialize_with = "blank_as_zero")]
    pub start_minute: u32,
    #[serde(default, deserialize_with = "blank_as_zero")]
    pub start_second: u32,
    #[serde(default, deserialize_with = "blank_as_zero")]
    pub end_minute: u32,
    #[serde(default, deserialize_with = "blank_as_zero")]
    pub end_second: u32,
    #[serde(default)]
    pub quality: Quality,
}

// A cleared number input is posted as an empty value.
fn blank_as_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRequest {
    pub source_url: String,
    pub start_seconds: u32,
    pub end_seconds: u32,
    pub quality: Quality,
}

impl ClipRequest {
    /// Builds a request, rejecting an empty URL or a range that is not strictly increasing.
    pub fn new(
        source_url: &str,
        start_seconds: u32,
        end_seconds: u32,
        quality: Quality,
    ) -> Result<Self, ClipError> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(ClipError::MissingUrl);
        }
        if end_seconds <= start_seconds {
            return Err(ClipError::InvalidDuration);
        }
        Ok(Self {
            source_url: source_url.to_string(),
            start_seconds,
            end_seconds,
            quality,
        })
    }

    pub fn duration_seconds(&self) -> u32 {
        self.end_seconds - self.start_seconds
    }
}

impl TryFrom<ClipForm> for ClipRequest {
    type Error = ClipError;

    fn try_from(form: ClipForm) -> Result<Self, Self::Error> {
        let start = form.start_minute.saturating_mul(60).saturating_add(form.start_second);
        let end = form.end_minute.saturating_mul(60).saturating_add(form.end_second);
        ClipRequest::new(&form.source_url, start, end, form.quality)
    }
}

/// The finished clip, ready to hand to the browser.
#[derive(Debug, Clone)]
pub struct ClipResult {
    pub bytes: Bytes,
    pub file_name: &'static str,
    pub mime_type: &'static str,
}

impl ClipResult {
    pub fn new(bytes: Bytes) -> Self {
        Self {
            bytes,
            file_name: CLIP_FILE_NAME,
            mime_type: CLIP_MIME_TYPE,
        }
    }
}
