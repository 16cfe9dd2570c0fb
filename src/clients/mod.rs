pub mod object_client;
pub mod realtime;
pub mod rest_store;
pub mod task_client;

pub use object_client::*;
pub use realtime::*;
pub use rest_store::*;
pub use task_client::*;
