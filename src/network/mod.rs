pub mod connection;
pub mod server;
pub mod supervisor;

pub use connection::Connection;
pub use server::Server;
pub use supervisor::{SessionEntry, SupervisorHandle};
