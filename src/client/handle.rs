//! Opaque, cached client handles.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A connected client for one service.
///
/// The concrete client type is service-specific; callers recover it with
/// [`downcast`](Self::downcast). Cloning is cheap and shares the same
/// underlying client. The manager owns the cached copy and decides when it
/// is evicted.
#[derive(Clone)]
pub struct ClientHandle {
    service: Arc<str>,
    created_at: DateTime<Utc>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ClientHandle {
    pub fn new<T>(service: &str, client: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::from_arc(service, Arc::new(client))
    }

    pub fn from_arc<T>(service: &str, client: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            service: Arc::from(service),
            created_at: Utc::now(),
            inner: client,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Borrow the concrete client if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Shared pointer to the concrete client if it is a `T`.
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.inner.clone().downcast::<T>().ok()
    }

    /// Whether two handles share the same underlying client.
    pub fn same_client(&self, other: &ClientHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("service", &self.service)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
