pub mod message;
pub mod reader;
pub mod writer;

pub use message::IntakeMessage;
pub use reader::{JsonLinesReader, MessageReader};
pub use writer::{JsonLinesWriter, PayloadWriter};
