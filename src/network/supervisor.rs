use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub id: Uuid,
    pub peer: Option<SocketAddr>,
    pub started_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn new(id: Uuid, peer: Option<SocketAddr>) -> Self {
        Self {
            id,
            peer,
            started_at: Utc::now(),
        }
    }
}

pub enum SupervisorCommand {
    Register {
        entry: SessionEntry,
        responder: oneshot::Sender<Uuid>,
    },
    Unregister {
        id: Uuid,
        responder: oneshot::Sender<Option<SessionEntry>>,
    },
    List {
        responder: oneshot::Sender<Vec<SessionEntry>>,
    },
}

/// Book-keeping of live sessions, in registration order.
struct SessionSupervisor {
    sessions: IndexMap<Uuid, SessionEntry>,
}

impl SessionSupervisor {
    fn new() -> Self {
        Self {
            sessions: IndexMap::new(),
        }
    }

    fn handle_command(&mut self, command: SupervisorCommand) {
        match command {
            SupervisorCommand::Register { entry, responder } => {
                let id = entry.id;
                self.sessions.insert(id, entry);
                debug!("Registered session {} ({} live)", id, self.sessions.len());
                let _ = responder.send(id);
            }
            SupervisorCommand::Unregister { id, responder } => {
                let removed = self.sessions.shift_remove(&id);
                debug!("Unregistered session {} ({} live)", id, self.sessions.len());
                let _ = responder.send(removed);
            }
            SupervisorCommand::List { responder } => {
                let _ = responder.send(self.sessions.values().cloned().collect());
            }
        }
    }
}

#[derive(Clone)]
pub struct SupervisorHandle {
    command_tx: mpsc::Sender<SupervisorCommand>,
}

impl SupervisorHandle {
    /// Starts the supervisor task. It stops once every handle is dropped.
    pub fn spawn(buffer: usize) -> (Self, JoinHandle<()>) {
        let (command_tx, mut command_rx) = mpsc::channel(buffer.max(1));
        let task = tokio::spawn(async move {
            let mut supervisor = SessionSupervisor::new();
            while let Some(command) = command_rx.recv().await {
                supervisor.handle_command(command);
            }
            debug!("Session supervisor stopped");
        });
        (Self { command_tx }, task)
    }

    pub async fn register(&self, entry: SessionEntry) -> Result<Uuid, AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.send(SupervisorCommand::Register { entry, responder }).await?;
        response_rx.await.map_err(|_| Self::stopped())
    }

    pub async fn unregister(&self, id: Uuid) -> Result<Option<SessionEntry>, AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.send(SupervisorCommand::Unregister { id, responder }).await?;
        response_rx.await.map_err(|_| Self::stopped())
    }

    pub async fn list(&self) -> Result<Vec<SessionEntry>, AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.send(SupervisorCommand::List { responder }).await?;
        response_rx.await.map_err(|_| Self::stopped())
    }

    async fn send(&self, command: SupervisorCommand) -> Result<(), AppError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| Self::stopped())
    }

    fn stopped() -> AppError {
        AppError::Session("session supervisor is not running".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_list_unregister() {
        let (supervisor, task) = SupervisorHandle::spawn(8);
        let first = SessionEntry::new(Uuid::new_v4(), None);
        let second = SessionEntry::new(Uuid::new_v4(), Some("127.0.0.1:9000".parse().unwrap()));

        assert_eq!(supervisor.register(first.clone()).await.unwrap(), first.id);
        supervisor.register(second.clone()).await.unwrap();
        assert_eq!(supervisor.list().await.unwrap(), vec![first.clone(), second.clone()]);

        assert_eq!(supervisor.unregister(first.id).await.unwrap(), Some(first.clone()));
        assert_eq!(supervisor.unregister(first.id).await.unwrap(), None);
        assert_eq!(supervisor.list().await.unwrap(), vec![second]);

        drop(supervisor);
        task.await.unwrap();
    }
}
