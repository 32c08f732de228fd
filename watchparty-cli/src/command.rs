use watchparty_core::{TimeParseError, parse_time};

/// One line typed into a headless `join` session.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Seek(u64),
    Url { url: String, provider: String },
    State,
    Links,
    Cam,
    Mic,
    Quit,
    Chat(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    MissingArgument(&'static str),
    BadTime(TimeParseError),
    Unknown(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Empty => f.write_str("nothing to send"),
            CommandError::MissingArgument(usage) => write!(f, "usage: {}", usage),
            CommandError::BadTime(e) => write!(f, "bad time: {}", e),
            CommandError::Unknown(cmd) => write!(f, "unknown command /{}", cmd),
        }
    }
}

const DEFAULT_PROVIDER: &str = "youtube";

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Chat(line.to_owned()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        match name {
            "play" => Ok(Command::Play),
            "pause" => Ok(Command::Pause),
            "seek" => {
                let time = parts
                    .next()
                    .ok_or(CommandError::MissingArgument("/seek mm:ss|secs"))?;
                parse_time(time).map(Command::Seek).map_err(CommandError::BadTime)
            }
            "url" => {
                let url = parts
                    .next()
                    .ok_or(CommandError::MissingArgument("/url URL [provider]"))?;
                let provider = parts.next().unwrap_or(DEFAULT_PROVIDER);
                Ok(Command::Url {
                    url: url.to_owned(),
                    provider: provider.to_owned(),
                })
            }
            "state" => Ok(Command::State),
            "links" => Ok(Command::Links),
            "cam" => Ok(Command::Cam),
            "mic" => Ok(Command::Mic),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_owned())),
        }
    }
}
