use std::pin::Pin;
use std::time::Duration;

use futures::Future;
use futures::task::{Context, Poll};
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::util::BoxService;
use tower::{BoxError, Service, ServiceBuilder};
use uuid::Uuid;

use crate::common::keypoint::KeypointFrame;
use crate::coordinator::SessionHandle;
use crate::error::AppError;
use crate::pipeline::domain::RenderingPayload;

pub type BoxSessionService = BoxService<KeypointFrame, RenderingPayload, BoxError>;

/// Exposes a session as a `tower::Service` so transports can stack layers on it.
/// Errors are boxed [`AppError`]s; see [`into_app_error`].
#[derive(Clone)]
pub struct SessionService {
    handle: SessionHandle,
}

impl SessionService {
    pub fn new(handle: SessionHandle) -> Self {
        Self { handle }
    }
}

impl Service<KeypointFrame> for SessionService {
    type Response = RenderingPayload;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.handle.is_closed() {
            return Poll::Ready(Err(AppError::SessionClosed(self.handle.id()).into()));
        }
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, frame: KeypointFrame) -> Self::Future {
        let handle = self.handle.clone();
        Box::pin(async move { handle.submit(frame).await.map_err(BoxError::from) })
    }
}

pub fn build_service(handle: SessionHandle, frame_timeout: Option<Duration>) -> BoxSessionService {
    let service = ServiceBuilder::new()
        .option_layer(frame_timeout.map(TimeoutLayer::new))
        .service(SessionService::new(handle));
    BoxService::new(service)
}

/// Recovers the application error behind a boxed service error.
pub fn into_app_error(session: Uuid, error: BoxError) -> AppError {
    if error.is::<Elapsed>() {
        return AppError::SessionTimeout(session);
    }
    match error.downcast::<AppError>() {
        Ok(error) => *error,
        Err(other) => AppError::Session(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoachConfig;
    use crate::coordinator::SessionBuilder;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_session_service() {
        let session = SessionBuilder::new(CoachConfig::default()).build().unwrap();
        let mut service = SessionService::new(session.handle());
        let payload = service
            .ready()
            .await
            .unwrap()
            .call(KeypointFrame::empty())
            .await
            .unwrap();
        assert_eq!(payload, RenderingPayload::neutral());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_service_with_timeout() {
        let session = SessionBuilder::new(CoachConfig::default()).build().unwrap();
        let service = build_service(session.handle(), Some(Duration::from_secs(5)));
        let payload = service.oneshot(KeypointFrame::empty()).await.unwrap();
        assert_eq!(payload.feedback, "READY?");
        session.shutdown().await;
    }

    #[test]
    fn test_unknown_errors_are_wrapped() {
        let id = Uuid::new_v4();
        let error: BoxError = "worker panicked".into();
        assert!(matches!(
            into_app_error(id, error),
            AppError::Session(message) if message == "worker panicked"
        ));
    }

    #[tokio::test]
    async fn test_closed_session_is_not_ready() {
        let session = SessionBuilder::new(CoachConfig::default()).build().unwrap();
        let handle = session.handle();
        let id = session.id();
        session.shutdown().await;

        let service = build_service(handle, None);
        let error = service.oneshot(KeypointFrame::empty()).await.unwrap_err();
        assert!(matches!(
            into_app_error(id, error),
            AppError::SessionClosed(closed) if closed == id
        ));
    }
}
