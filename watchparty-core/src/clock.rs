//! Human-facing `m:ss` rendering of playback positions. Internally time is always whole seconds.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("empty time")]
    Empty,
    #[error("invalid number in time: {0:?}")]
    InvalidNumber(String),
    #[error("seconds must be below 60, got {0}")]
    SecondsOutOfRange(u64),
    #[error("time too large: {0:?}")]
    TooLarge(String),
}

/// Renders seconds as `m:ss`, e.g. `215` -> `3:35`.
pub fn format_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Parses `m:ss` / `mm:ss` input, or a bare number of seconds.
pub fn parse_time(input: &str) -> Result<u64, TimeParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TimeParseError::Empty);
    }

    let Some((minutes, seconds)) = input.split_once(':') else {
        return parse_number(input);
    };

    let minutes = parse_number(minutes)?;
    let seconds = parse_number(seconds)?;
    if seconds >= 60 {
        return Err(TimeParseError::SecondsOutOfRange(seconds));
    }
    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(|| TimeParseError::TooLarge(input.to_owned()))
}

fn parse_number(part: &str) -> Result<u64, TimeParseError> {
    let part = part.trim();
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeParseError::InvalidNumber(part.to_owned()));
    }
    part.parse()
        .map_err(|_| TimeParseError::InvalidNumber(part.to_owned()))
}
