mod playback_clock;

pub use playback_clock::*;
