use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::AppError;
use crate::pipeline::domain::RenderingPayload;

#[async_trait]
pub trait PayloadWriter: Send {
    async fn write(&mut self, payload: &RenderingPayload) -> Result<(), AppError>;
}

/// Writes one JSON payload per line, flushing after each so the renderer
/// never waits on a buffered frame.
pub struct JsonLinesWriter<T>
where
    T: AsyncWrite + Unpin + Send,
{
    writer: BufWriter<T>,
}

impl<T: AsyncWrite + Unpin + Send> JsonLinesWriter<T> {
    pub fn new(writer: T) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }
}

#[async_trait]
impl<T: AsyncWrite + Unpin + Send> PayloadWriter for JsonLinesWriter<T> {
    async fn write(&mut self, payload: &RenderingPayload) -> Result<(), AppError> {
        let mut line = serde_json::to_vec(payload)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
