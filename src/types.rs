use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Number of analog channel slots on the supported scopes.
pub const CHANNEL_SLOTS: u8 = 4;

/// One analog input channel, indexed 1..=4 like the front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Channel(u8);

impl Channel {
    pub fn new(index: u8) -> Result<Self, CaptureError> {
        if (1..=CHANNEL_SLOTS).contains(&index) {
            Ok(Self(index))
        } else {
            Err(CaptureError::InvalidChannel(index))
        }
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    /// Every channel slot, in front-panel order. Used when auto-detecting
    /// which channels are displayed.
    pub fn all() -> impl Iterator<Item = Channel> {
        (1..=CHANNEL_SLOTS).map(Channel)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.0)
    }
}

impl TryFrom<u8> for Channel {
    type Error = CaptureError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Channel::new(index)
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> u8 {
        channel.0
    }
}
