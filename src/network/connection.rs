use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::common::keypoint::KeypointFrame;
use crate::coordinator::SessionHandle;
use crate::coordinator::service::{BoxSessionService, build_service, into_app_error};
use crate::error::AppError;
use crate::intake::{IntakeMessage, MessageReader, PayloadWriter};
use crate::pipeline::domain::RenderingPayload;

/// Drives one session from a message stream: frames in, one payload out per
/// frame.
pub struct Connection {
    reader: Box<dyn MessageReader>,
    writer: Box<dyn PayloadWriter>,
    handle: SessionHandle,
    service: BoxSessionService,
    last_payload: RenderingPayload,
    shutdown: CancellationToken,
}

impl Connection {
    pub fn new(
        reader: Box<dyn MessageReader>,
        writer: Box<dyn PayloadWriter>,
        handle: SessionHandle,
        frame_timeout: Option<Duration>,
    ) -> Self {
        Self {
            reader,
            writer,
            service: build_service(handle.clone(), frame_timeout),
            handle,
            last_payload: RenderingPayload::neutral(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn id(&self) -> Uuid {
        self.handle.id()
    }

    pub async fn run(&mut self) -> Result<(), AppError> {
        let id = self.id();
        info!("Running connection for session {}", id);
        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Connection for session {} received shutdown", id);
                    break;
                }
                result = self.handle_next_message() => {
                    if !result? {
                        break;
                    }
                }
            }
        }
        info!("Connection for session {} finished", id);
        Ok(())
    }

    /// Returns `false` once the peer is done.
    ///
    /// A frame that times out has usually been queued already, so the
    /// session still evaluates it later. The repeated payload can then lag
    /// the session state by that frame; the next answered frame catches up.
    async fn handle_next_message(&mut self) -> Result<bool, AppError> {
        let message = match self.reader.read().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!("Peer closed the stream for session {}", self.id());
                return Ok(false);
            }
            Err(AppError::Codec(e)) => {
                warn!("Skipping unreadable message for session {}: {}", self.id(), e);
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        match message {
            IntakeMessage::Frame {
                keypoints,
                captured_at,
            } => {
                let frame = KeypointFrame::from_wire(keypoints, captured_at);
                match self.evaluate(frame).await {
                    Ok(payload) => self.last_payload = payload,
                    Err(AppError::SessionTimeout(id)) => {
                        warn!("Session {} timed out on a frame, repeating last payload", id)
                    }
                    Err(e) => return Err(e),
                }
                self.writer.write(&self.last_payload).await?;
            }
            IntakeMessage::Select { exercise } => {
                self.handle.select(exercise);
            }
            IntakeMessage::Reset => {
                self.last_payload = self.handle.reset().await?;
                self.writer.write(&self.last_payload).await?;
            }
            IntakeMessage::Shutdown => {
                debug!("Peer requested shutdown of session {}", self.id());
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn evaluate(&mut self, frame: KeypointFrame) -> Result<RenderingPayload, AppError> {
        let id = self.id();
        let service = self
            .service
            .ready()
            .await
            .map_err(|e| into_app_error(id, e))?;
        service.call(frame).await.map_err(|e| into_app_error(id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::keypoint::{Joint, JointSet};
    use crate::config::CoachConfig;
    use crate::coordinator::SessionBuilder;
    use crate::intake::{JsonLinesReader, JsonLinesWriter};
    use crate::pipeline::domain::rules::tests::curl_pose;
    use crate::pipeline::domain::{AlertLevel, ExerciseKind, Stage};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn frame_line(joints: JointSet) -> String {
        let mut keypoints = vec![[0.0_f32, 0.0, 0.0]; 17];
        for joint in Joint::ALL {
            let keypoint = joints.get(joint);
            keypoints[joint.coco_index()] = [keypoint.x, keypoint.y, keypoint.confidence];
        }
        let message = IntakeMessage::frame(Some(keypoints));
        format!("{}\n", serde_json::to_string(&message).unwrap())
    }

    #[tokio::test]
    async fn test_session_over_json_lines() {
        let session = SessionBuilder::new(CoachConfig::default()).build().unwrap();
        let (mut input, input_server) = tokio::io::duplex(64 * 1024);
        let (output_server, output) = tokio::io::duplex(64 * 1024);

        let mut connection = Connection::new(
            Box::new(JsonLinesReader::new(input_server)),
            Box::new(JsonLinesWriter::new(output_server)),
            session.handle(),
            Some(Duration::from_secs(5)),
        );
        let task = tokio::spawn(async move { connection.run().await });

        let mut script = String::new();
        script.push_str(&frame_line(curl_pose(170.0, 0.0)));
        script.push_str(&frame_line(curl_pose(20.0, 0.0)));
        script.push_str("this is not json\n");
        script.push_str("{\"type\":\"frame\",\"keypoints\":null}\n");
        script.push_str("{\"type\":\"select\",\"exercise\":\"front_raise\"}\n");
        script.push_str("{\"type\":\"reset\"}\n");
        script.push_str("{\"type\":\"shutdown\"}\n");
        input.write_all(script.as_bytes()).await.unwrap();

        let mut lines = BufReader::new(output).lines();
        let mut payloads = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            payloads.push(serde_json::from_str::<RenderingPayload>(&line).unwrap());
        }
        task.await.unwrap().unwrap();

        assert_eq!(payloads.len(), 4);
        assert_eq!(payloads[0].stage, Stage::Down);
        assert_eq!(payloads[1].rep_count, 1);
        assert_eq!(payloads[1].alert, Some(AlertLevel::Ok));
        // nobody in frame: the previous payload again
        assert_eq!(payloads[2], payloads[1]);
        assert_eq!(payloads[3], RenderingPayload::neutral());

        let state = session.handle().snapshot().await.unwrap();
        assert_eq!(state.rep_count(), 0);
        assert_eq!(session.handle().selected(), ExerciseKind::FrontRaise);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let session = SessionBuilder::new(CoachConfig::default()).build().unwrap();
        let (mut input, input_server) = tokio::io::duplex(1024);
        let (output_server, output) = tokio::io::duplex(1024);

        let mut connection = Connection::new(
            Box::new(JsonLinesReader::new(input_server)),
            Box::new(JsonLinesWriter::new(output_server)),
            session.handle(),
            None,
        );
        let task = tokio::spawn(async move { connection.run().await });

        input.write_all(b"\xff\xfe garbage\n").await.unwrap();
        input.write_all(b"{\"type\":\"frame\",\"keypoints\":null}\n").await.unwrap();
        drop(input);

        let mut lines = BufReader::new(output).lines();
        let mut payloads = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            payloads.push(serde_json::from_str::<RenderingPayload>(&line).unwrap());
        }
        task.await.unwrap().unwrap();

        assert_eq!(payloads, vec![RenderingPayload::neutral()]);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_connection_stops_on_cancel() {
        let session = SessionBuilder::new(CoachConfig::default()).build().unwrap();
        let (_input, input_server) = tokio::io::duplex(1024);
        let (output_server, _output) = tokio::io::duplex(1024);
        let shutdown = CancellationToken::new();

        let mut connection = Connection::new(
            Box::new(JsonLinesReader::new(input_server)),
            Box::new(JsonLinesWriter::new(output_server)),
            session.handle(),
            None,
        )
        .with_shutdown(shutdown.clone());
        let task = tokio::spawn(async move { connection.run().await });

        shutdown.cancel();
        task.await.unwrap().unwrap();
        session.shutdown().await;
    }
}
