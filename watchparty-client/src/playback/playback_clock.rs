use watchparty_core::{MediaRef, PlaybackState, PlayerAction, format_time};

/// Local view of the room's playback.
///
/// Advances by itself once per tick while playing; only a `seek` or a stored-state
/// snapshot moves it to an absolute position. Drift against other members is expected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackClock {
    state: PlaybackState,
    media: Option<MediaRef>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `play` / `pause` / `seek`. Returns `false` for a seek without a time.
    pub fn apply(&mut self, action: PlayerAction, time: Option<u64>) -> bool {
        self.state.apply(action, time)
    }

    /// Replaces the local state with the room's stored one, without extrapolation.
    pub fn sync(&mut self, stored: PlaybackState) {
        self.state = stored;
    }

    /// One second elapsed. Returns the new position while playing.
    pub fn tick(&mut self) -> Option<u64> {
        if !self.state.playing {
            return None;
        }
        self.state.time = self.state.time.saturating_add(1);
        Some(self.state.time)
    }

    pub fn set_media(&mut self, media: MediaRef) {
        self.media = Some(media);
    }

    pub fn media(&self) -> Option<&MediaRef> {
        self.media.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position(&self) -> u64 {
        self.state.time
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    /// Position as `m:ss`.
    pub fn display(&self) -> String {
        format_time(self.state.time)
    }
}
