pub mod clock;
pub mod model;
pub mod protocol;

pub use clock::{TimeParseError, format_time, parse_time};
pub use model::*;
pub use protocol::{ClientMessage, ServerMessage};
