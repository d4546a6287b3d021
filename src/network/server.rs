use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{CoachConfig, SessionConfig, Settings};
use crate::coordinator::SessionBuilder;
use crate::error::AppError;
use crate::intake::{JsonLinesReader, JsonLinesWriter};
use crate::network::connection::Connection;
use crate::network::supervisor::{SessionEntry, SupervisorHandle};

/// Accepts TCP clients and gives each one its own session.
pub struct Server {
    bind_address: String,
    port: u16,
    coach: CoachConfig,
    session: SessionConfig,
    supervisor: SupervisorHandle,
    shutdown: CancellationToken,
}

impl Server {
    pub fn new(settings: &Settings, port: u16, supervisor: SupervisorHandle) -> Self {
        Self {
            bind_address: settings.server.bind_address.clone(),
            port,
            coach: settings.coach.clone(),
            session: settings.session.clone(),
            supervisor,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops the accept loop and every open connection.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn start(&self) -> Result<(), AppError> {
        info!("Starting server on {}:{}", self.bind_address, self.port);
        let listener = TcpListener::bind((self.bind_address.as_str(), self.port))
            .await
            .map_err(|e| AppError::Bind(e, self.port))?;
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Server shutting down");
                    break;
                }
                result = listener.accept() => match result {
                    Ok((stream, peer)) => {
                        debug!("New client attempting to connect: {}", peer);
                        match self.handle_client(stream, peer).await {
                            Ok(id) => debug!("Client {} connected as session {}", peer, id),
                            Err(e) => error!("Failed to start session for {}: {}", peer, e),
                        }
                    }
                    Err(e) => error!("{}", AppError::Accept(e)),
                },
            }
        }
        Ok(())
    }

    async fn handle_client(&self, stream: TcpStream, peer: SocketAddr) -> Result<Uuid, AppError> {
        let session = SessionBuilder::new(self.coach.clone())
            .session_config(self.session.clone())
            .build()?;
        let id = session.id();
        let (stream_rx, stream_tx) = stream.into_split();
        let mut connection = Connection::new(
            Box::new(JsonLinesReader::new(stream_rx)),
            Box::new(JsonLinesWriter::new(stream_tx)),
            session.handle(),
            self.session.frame_timeout(),
        )
        .with_shutdown(self.shutdown.child_token());

        self.supervisor.register(SessionEntry::new(id, Some(peer))).await?;
        let supervisor = self.supervisor.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.run().await {
                error!("Connection for session {} failed: {}", id, e);
            }
            session.shutdown().await;
            if let Err(e) = supervisor.unregister(id).await {
                warn!("Could not unregister session {}: {}", id, e);
            }
        });
        Ok(id)
    }
}
