pub mod service;

use crate::{
    common::keypoint::KeypointFrame,
    config::{CoachConfig, SessionConfig},
    error::AppError,
    pipeline::{
        domain::{ExerciseKind, RenderingPayload, RepState},
        frame_coordinator::FrameCoordinator,
        smoothing::KeypointSmoother,
    },
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub enum SessionCommand {
    Frame {
        frame: KeypointFrame,
        responder: oneshot::Sender<RenderingPayload>,
    },
    Snapshot {
        responder: oneshot::Sender<RepState>,
    },
    Reset {
        responder: oneshot::Sender<RenderingPayload>,
    },
}

/// Owns the state of one session and evaluates its frames one at a time.
struct SessionWorker {
    id: Uuid,
    state: RepState,
    coordinator: FrameCoordinator,
    selector: watch::Receiver<ExerciseKind>,
}

impl SessionWorker {
    #[instrument(skip(self, command), fields(session = %self.id))]
    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Frame { frame, responder } => {
                // one consistent exercise per frame, whatever the selector does meanwhile
                let kind = *self.selector.borrow_and_update();
                let payload = self.coordinator.process(&mut self.state, frame, kind);
                let _ = responder.send(payload);
            }
            SessionCommand::Snapshot { responder } => {
                let _ = responder.send(self.state.clone());
            }
            SessionCommand::Reset { responder } => {
                info!("Resetting session counters");
                self.state.reset();
                self.coordinator.reset();
                let _ = responder.send(RenderingPayload::from(&self.state));
            }
        }
    }
}

/// A running session: a worker task plus the handle used to feed it.
pub struct Session {
    handle: SessionHandle,
    worker_task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl Session {
    fn new(
        coordinator: FrameCoordinator,
        frame_buffer_size: usize,
        initial_exercise: ExerciseKind,
    ) -> Self {
        let id = Uuid::new_v4();
        let cancel_token = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::channel(frame_buffer_size);
        let (selector_tx, selector_rx) = watch::channel(initial_exercise);

        let worker = SessionWorker {
            id,
            state: RepState::new(),
            coordinator,
            selector: selector_rx,
        };

        Self {
            handle: SessionHandle {
                id,
                command_tx,
                selector: Arc::new(selector_tx),
            },
            worker_task: Some(Self::start_worker(worker, command_rx, cancel_token.clone())),
            cancel_token,
        }
    }

    fn start_worker(
        mut worker: SessionWorker,
        mut command_rx: mpsc::Receiver<SessionCommand>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Session {} started", worker.id);
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    command = command_rx.recv() => match command {
                        Some(command) => worker.handle_command(command),
                        None => break,
                    },
                }
            }
            info!(
                "Session {} finished with {} sets and {} reps",
                worker.id,
                worker.state.set_count(),
                worker.state.rep_count()
            );
        })
    }

    pub fn id(&self) -> Uuid {
        self.handle.id
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn stop(&self) {
        debug!("Stopping session {}", self.handle.id);
        self.cancel_token.cancel();
    }

    /// Stops the worker and waits for it to drain.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        if let Some(worker_task) = self.worker_task.take() {
            if let Err(e) = worker_task.await {
                tracing::error!("Session worker failed: {}", e);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cheap, cloneable access to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    command_tx: mpsc::Sender<SessionCommand>,
    selector: Arc<watch::Sender<ExerciseKind>>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Changes the exercise for every frame evaluated from now on.
    pub fn select(&self, kind: ExerciseKind) -> ExerciseKind {
        let previous = self.selector.send_replace(kind);
        if previous != kind {
            info!("Session {} switched from {} to {}", self.id, previous, kind);
        }
        previous
    }

    pub fn selected(&self) -> ExerciseKind {
        *self.selector.borrow()
    }

    /// Queues a frame and waits for its payload. Once queued the frame is
    /// evaluated even if the caller stops waiting, e.g. on a timeout.
    pub async fn submit(&self, frame: KeypointFrame) -> Result<RenderingPayload, AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.send(SessionCommand::Frame { frame, responder }).await?;
        response_rx.await.map_err(|_| AppError::SessionClosed(self.id))
    }

    pub async fn snapshot(&self) -> Result<RepState, AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { responder }).await?;
        response_rx.await.map_err(|_| AppError::SessionClosed(self.id))
    }

    pub async fn reset(&self) -> Result<RenderingPayload, AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.send(SessionCommand::Reset { responder }).await?;
        response_rx.await.map_err(|_| AppError::SessionClosed(self.id))
    }

    async fn send(&self, command: SessionCommand) -> Result<(), AppError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| AppError::SessionClosed(self.id))
    }
}

pub struct SessionBuilder {
    coach: CoachConfig,
    session: SessionConfig,
    smoother: Option<Box<dyn KeypointSmoother>>,
}

impl SessionBuilder {
    pub fn new(coach: CoachConfig) -> Self {
        Self {
            coach,
            session: SessionConfig::default(),
            smoother: None,
        }
    }

    pub fn session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    // Adjusts the frame buffer size, this will override the session configuration.
    pub fn frame_buffer_size(mut self, frame_buffer_size: usize) -> Self {
        self.session.frame_buffer_size = frame_buffer_size;
        self
    }

    // Sets the exercise selected when the session starts.
    pub fn initial_exercise(mut self, kind: ExerciseKind) -> Self {
        self.session.initial_exercise = kind;
        self
    }

    pub fn reps_per_set(mut self, reps_per_set: u32) -> Self {
        self.coach.reps_per_set = reps_per_set;
        self
    }

    // Replaces the smoothing strategy picked from the configuration.
    pub fn smoother(mut self, smoother: Box<dyn KeypointSmoother>) -> Self {
        self.smoother = Some(smoother);
        self
    }

    /// Spawns the session worker; must be called inside a tokio runtime.
    pub fn build(self) -> Result<Session, AppError> {
        self.coach.validate().map_err(AppError::InvalidConfig)?;
        self.session.validate().map_err(AppError::InvalidConfig)?;

        let mut coordinator = FrameCoordinator::new(self.coach);
        if let Some(smoother) = self.smoother {
            coordinator = coordinator.with_smoother(smoother);
        }
        Ok(Session::new(
            coordinator,
            self.session.frame_buffer_size,
            self.session.initial_exercise,
        ))
    }
}
