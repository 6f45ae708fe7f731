//! Client constructors.
//!
//! A connector turns a [`ServiceDescriptor`] into a connected
//! [`ClientHandle`]. The manager owns retry, timeout, and breaker handling;
//! a connector makes exactly one attempt and classifies its failure.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::sync::Arc;

use crate::client::handle::ClientHandle;
use crate::config::ServiceDescriptor;
use crate::error::ClientResult;
use crate::resilience::Timeouts;

/// Everything a connector needs for one construction attempt.
#[derive(Debug, Clone)]
pub struct ConnectContext {
    pub descriptor: Arc<ServiceDescriptor>,
    /// Effective region (descriptor override or global default).
    pub region: String,
    pub timeouts: Timeouts,
}

/// Builds and validates a client for one service.
pub trait ServiceConnector: Send + Sync {
    fn connect(&self, ctx: ConnectContext) -> BoxFuture<'static, ClientResult<ClientHandle>>;
}

/// Adapts an async closure into a [`ServiceConnector`].
pub struct FnConnector<F> {
    f: F,
}

impl<F, Fut> FnConnector<F>
where
    F: Fn(ConnectContext) -> Fut + Send + Sync,
    Fut: Future<Output = ClientResult<ClientHandle>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> ServiceConnector for FnConnector<F>
where
    F: Fn(ConnectContext) -> Fut + Send + Sync,
    Fut: Future<Output = ClientResult<ClientHandle>> + Send + 'static,
{
    fn connect(&self, ctx: ConnectContext) -> BoxFuture<'static, ClientResult<ClientHandle>> {
        (self.f)(ctx).boxed()
    }
}

/// Wrap an async closure as a shareable connector.
pub fn connector_fn<F, Fut>(f: F) -> Arc<dyn ServiceConnector>
where
    F: Fn(ConnectContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ClientResult<ClientHandle>> + Send + 'static,
{
    Arc::new(FnConnector::new(f))
}
