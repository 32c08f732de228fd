use serde::{Deserialize, Serialize};
use std::fmt;

/// The three playback mutations a member may issue.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerAction {
    Play,
    Pause,
    Seek,
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerAction::Play => "play",
            PlayerAction::Pause => "pause",
            PlayerAction::Seek => "seek",
        };
        f.write_str(name)
    }
}

/// Last known room-wide playback position, in whole seconds.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, Eq, PartialEq)]
pub struct PlaybackState {
    pub playing: bool,
    pub time: u64,
}

impl PlaybackState {
    /// Applies one action. `seek` moves `time`, `play`/`pause` only flip `playing`.
    ///
    /// Returns `false` (leaving the state untouched) for a `seek` without a time.
    pub fn apply(&mut self, action: PlayerAction, time: Option<u64>) -> bool {
        match action {
            PlayerAction::Play => self.playing = true,
            PlayerAction::Pause => self.playing = false,
            PlayerAction::Seek => match time {
                Some(t) => self.time = t,
                None => return false,
            },
        }
        true
    }
}

/// Reference to the externally hosted video the room is watching.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    #[serde(alias = "type")]
    pub provider_type: String,
}

impl MediaRef {
    pub fn new(url: impl Into<String>, provider_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            provider_type: provider_type.into(),
        }
    }
}
