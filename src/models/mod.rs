pub mod error;
pub mod events;
pub mod messages;
pub mod note;
pub mod presence;

pub use error::*;
pub use events::*;
pub use messages::*;
pub use note::*;
pub use presence::*;
