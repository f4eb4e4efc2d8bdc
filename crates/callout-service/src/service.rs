//! Subscription lifecycle: connect, start, stop.
//!
//! `start` subscribes to the authorization subject and spawns a dispatch
//! loop that hands every message to the [`CalloutHandler`] on its own
//! task. `stop` drains the subscription, lets queued and in-flight
//! requests finish, and only then returns.

use std::future::Future;
use std::sync::Arc;

use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tokio::sync::{Mutex, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::CalloutError;
use crate::handler::{CalloutHandler, CalloutMessage, Replier};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A live subscription delivering authorization requests.
pub trait RequestSource: Send + 'static {
    /// Next request, or `None` once the subscription has ended.
    fn next_request(&mut self) -> impl Future<Output = Option<CalloutMessage>> + Send;

    /// Stop accepting new requests; already-queued ones are still
    /// delivered by [`next_request`](Self::next_request).
    fn drain(&mut self) -> impl Future<Output = Result<(), CalloutError>> + Send;
}

/// Connection the service subscribes and replies through.
pub trait Transport: Replier + Clone + 'static {
    /// Subscription type returned by [`subscribe`](Self::subscribe).
    type Source: RequestSource;

    /// Subscribe to `subject`.
    fn subscribe(
        &self,
        subject: String,
    ) -> impl Future<Output = Result<Self::Source, CalloutError>> + Send;

    /// Wait until every published reply has left the client.
    fn flush(&self) -> impl Future<Output = Result<(), CalloutError>> + Send;
}

impl RequestSource for Subscriber {
    fn next_request(&mut self) -> impl Future<Output = Option<CalloutMessage>> + Send {
        async move { StreamExt::next(self).await.map(CalloutMessage::from) }
    }

    fn drain(&mut self) -> impl Future<Output = Result<(), CalloutError>> + Send {
        async move {
            Subscriber::drain(self)
                .await
                .map_err(|e| CalloutError::Transport(format!("drain failed: {e}")))
        }
    }
}

impl Transport for Client {
    type Source = Subscriber;

    fn subscribe(
        &self,
        subject: String,
    ) -> impl Future<Output = Result<Subscriber, CalloutError>> + Send {
        async move { Ok(Client::subscribe(self, subject).await?) }
    }

    fn flush(&self) -> impl Future<Output = Result<(), CalloutError>> + Send {
        async move {
            Client::flush(self)
                .await
                .map_err(|e| CalloutError::Transport(e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

struct Running {
    shutdown: oneshot::Sender<()>,
    dispatch: JoinHandle<Result<(), CalloutError>>,
}

/// Authorization callout service bound to one connection.
pub struct CalloutService<T = Client> {
    transport: T,
    handler: Arc<CalloutHandler>,
    subject: String,
    running: Mutex<Option<Running>>,
}

impl CalloutService<Client> {
    /// Connect to the configured NATS server.
    pub async fn connect(
        config: &AppConfig,
        handler: Arc<CalloutHandler>,
    ) -> Result<Self, CalloutError> {
        let client = async_nats::connect(config.url.as_str()).await?;
        info!(subject = %config.subject, "connected to NATS");
        Ok(Self::new(client, handler, config.subject.clone()))
    }
}

impl<T: Transport> CalloutService<T> {
    /// Wrap an existing connection.
    pub fn new(transport: T, handler: Arc<CalloutHandler>, subject: impl Into<String>) -> Self {
        Self {
            transport,
            handler,
            subject: subject.into(),
            running: Mutex::new(None),
        }
    }

    /// Subscribe and begin handling requests. Calling it again while
    /// running does nothing.
    pub async fn start(&self) -> Result<(), CalloutError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!(subject = %self.subject, "callout service already started");
            return Ok(());
        }

        let source = self.transport.subscribe(self.subject.clone()).await?;
        let (shutdown, shutdown_rx) = oneshot::channel();
        let dispatch = tokio::spawn(dispatch(
            source,
            self.transport.clone(),
            Arc::clone(&self.handler),
            shutdown_rx,
        ));

        *running = Some(Running { shutdown, dispatch });
        info!(
            subject = %self.subject,
            issuer = %self.handler.public_key(),
            users = self.handler.credentials().len(),
            "authorization callout listening"
        );
        Ok(())
    }

    /// Drain the subscription and wait for every accepted request to be
    /// answered. Does nothing if the service is not running.
    pub async fn stop(&self) -> Result<(), CalloutError> {
        let Some(running) = self.running.lock().await.take() else {
            debug!("callout service not running");
            return Ok(());
        };

        // The receiver is gone only if the loop already ended.
        let _ = running.shutdown.send(());
        let result = running
            .dispatch
            .await
            .map_err(|e| CalloutError::Transport(format!("dispatch task failed: {e}")))?;

        self.transport.flush().await?;
        info!(subject = %self.subject, "authorization callout stopped");
        result
    }
}

/// Receive loop. Runs until the subscription ends, either because it was
/// drained on shutdown or because the connection closed.
async fn dispatch<T: Transport>(
    mut source: T::Source,
    transport: T,
    handler: Arc<CalloutHandler>,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), CalloutError> {
    let mut in_flight = JoinSet::new();
    let mut draining = false;
    let mut result = Ok(());

    loop {
        tokio::select! {
            _ = &mut shutdown, if !draining => {
                draining = true;
                info!("draining authorization subscription");
                if let Err(e) = source.drain().await {
                    error!(error = %e, "failed to drain subscription");
                    result = Err(e);
                    break;
                }
            }
            message = source.next_request() => {
                let Some(message) = message else {
                    if !draining {
                        warn!("authorization subscription closed");
                    }
                    break;
                };
                let handler = Arc::clone(&handler);
                let transport = transport.clone();
                in_flight.spawn(async move {
                    handler.handle(&transport, message).await;
                });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "request task panicked");
                }
            }
        }
    }

    debug!(pending = in_flight.len(), "waiting for in-flight requests");
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "request task panicked");
        }
    }

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
