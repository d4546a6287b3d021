use rep_coach::config::Settings;
use rep_coach::coordinator::SessionBuilder;
use rep_coach::error::AppError;
use rep_coach::intake::{JsonLinesReader, JsonLinesWriter};
use rep_coach::network::{Connection, Server, SupervisorHandle};
use rep_coach::pipeline::domain::ExerciseKind;
use tracing::{Level, info};

// stdout carries payloads in stdin/stdout mode, so logs go to stderr.
fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config_path = std::env::args().nth(1);
    let settings = Settings::load(config_path.as_deref())?;
    init_logging(settings.log_level());
    info!(
        "Exercises available: {}",
        ExerciseKind::catalog()
            .values()
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    );

    match settings.server.port {
        Some(port) => run_server(&settings, port).await,
        None => run_stdio(&settings).await,
    }
}

async fn run_server(settings: &Settings, port: u16) -> Result<(), AppError> {
    let (supervisor, _supervisor_task) = SupervisorHandle::spawn(64);
    let server = Server::new(settings, port, supervisor);
    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, stopping");
            shutdown.cancel();
        }
    });
    server.start().await
}

async fn run_stdio(settings: &Settings) -> Result<(), AppError> {
    let session = SessionBuilder::new(settings.coach.clone())
        .session_config(settings.session.clone())
        .build()?;
    info!(
        "Reading frames from stdin, starting with {}",
        settings.session.initial_exercise
    );
    let mut connection = Connection::new(
        Box::new(JsonLinesReader::new(tokio::io::stdin())),
        Box::new(JsonLinesWriter::new(tokio::io::stdout())),
        session.handle(),
        settings.session.frame_timeout(),
    );
    let result = connection.run().await;
    session.shutdown().await;
    result
}
