pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod intake;
pub mod network;
pub mod pipeline;

pub use config::Settings;
pub use coordinator::{Session, SessionBuilder, SessionHandle};
pub use error::{AppError, FrameError};
