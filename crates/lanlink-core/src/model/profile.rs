// Media profile descriptors advertised by a stream-capable device.
// The resolver selects one of these before a stream address exists.

use serde::{Deserialize, Serialize};

/// Video bounds advertised by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoBounds {
    pub width: u32,
    pub height: u32,
}

/// A device-advertised capability descriptor.
///
/// The `token` is what the device expects back when a stream address is
/// requested for the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaProfile {
    pub token: String,
    pub name: String,
    #[serde(default)]
    pub video: Option<VideoBounds>,
}

impl MediaProfile {
    pub fn new(token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
            video: None,
        }
    }

    pub fn with_video(mut self, width: u32, height: u32) -> Self {
        self.video = Some(VideoBounds { width, height });
        self
    }
}
