pub mod buffer;
pub mod note_session;
pub mod registry;
pub mod roster;

pub use buffer::*;
pub use note_session::*;
pub use registry::*;
pub use roster::*;
