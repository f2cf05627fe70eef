use crate::errors::Result;
use crate::types::{Request, Response};
use async_trait::async_trait;

/// The HTTP side of a session.
///
/// A transport issues exactly the request it is given: it honours the
/// redirect, error-status and content-type toggles on [`Request`] and never
/// adds state of its own. Cookie storage, referrer tracking and pacing live
/// in [`crate::BrowserSession`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request and return the final response.
    async fn execute(&self, request: Request) -> Result<Response>;

    /// Release held resources. Called once from `BrowserSession::shutdown`.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request).await
    }

    async fn shutdown(&self) -> Result<()> {
        (**self).shutdown().await
    }
}
