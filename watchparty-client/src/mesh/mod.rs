mod initiation;
mod mesh_command;
mod mesh_coordinator;

pub use initiation::*;
pub use mesh_command::*;
pub use mesh_coordinator::*;
