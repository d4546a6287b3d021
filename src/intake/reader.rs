use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;

use crate::error::AppError;
use crate::intake::message::IntakeMessage;

#[async_trait]
pub trait MessageReader: Send {
    /// Next message, or `None` once the peer has closed the stream.
    /// A codec error, invalid UTF-8 included, consumes only the offending line.
    async fn read(&mut self) -> Result<Option<IntakeMessage>, AppError>;
}

pub struct JsonLinesReader<T>
where
    T: AsyncRead + Unpin + Send,
{
    lines: SplitStream<BufReader<T>>,
}

impl<T: AsyncRead + Unpin + Send> JsonLinesReader<T> {
    pub fn new(stream: T) -> Self {
        Self {
            lines: SplitStream::new(BufReader::new(stream).split(b'\n')),
        }
    }
}

#[async_trait]
impl<T: AsyncRead + Unpin + Send> MessageReader for JsonLinesReader<T> {
    async fn read(&mut self) -> Result<Option<IntakeMessage>, AppError> {
        while let Some(line) = self.lines.next().await {
            // raw bytes, so a line that is not UTF-8 fails in the codec
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(serde_json::from_slice(&line)?));
        }
        Ok(None)
    }
}
